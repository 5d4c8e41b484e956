#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Deterministic synthetic host world for the monument survey engine.
//!
//! The world answers every collaborator query the survey systems issue
//! without a game server: biomes come from a hashed lattice, monument starts
//! follow the reference placement rules, and layouts are rolled from a
//! per-instance seed. Generation is lazy and tracked per chunk so tests can
//! assert how deep a caller forced the world to go.

mod biomes;
mod monument;

use std::collections::{HashMap, HashSet};

use monument_survey_core::{
    Biome, BiomeSampler, BlockId, BlockPos, ChunkCoord, ChunkStatus, StructureKind,
    StructureStart, WorldAccess,
};
use monument_survey_system_environment::{is_core_biome, DEFAULT_SEA_LEVEL};
use monument_survey_system_placement::PlacementPredictor;
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::{biomes::BiomeLattice, monument::Monument};

const MONUMENT_STREAM: &str = "monument";

/// Lazily generated world keyed by a single 64-bit seed.
#[derive(Debug)]
pub struct SyntheticWorld {
    seed: i64,
    predictor: PlacementPredictor,
    biomes: BiomeLattice,
    realized: HashMap<ChunkCoord, ChunkStatus>,
    monuments: HashMap<ChunkCoord, Option<Monument>>,
    markers: HashSet<BlockPos>,
    block_reads: u64,
}

impl SyntheticWorld {
    /// Creates an empty world; nothing is generated until requested.
    #[must_use]
    pub fn new(seed: i64) -> Self {
        Self {
            seed,
            predictor: PlacementPredictor::ocean_monument(),
            biomes: BiomeLattice::new(seed),
            realized: HashMap::new(),
            monuments: HashMap::new(),
            markers: HashSet::new(),
            block_reads: 0,
        }
    }

    /// Seed the world was created with.
    #[must_use]
    pub const fn seed(&self) -> i64 {
        self.seed
    }

    /// Deepest status the chunk has been realized to, if any.
    #[must_use]
    pub fn realized_status(&self, chunk: ChunkCoord) -> Option<ChunkStatus> {
        self.realized.get(&chunk).copied()
    }

    /// Number of chunks realized so far.
    #[must_use]
    pub fn realized_chunks(&self) -> usize {
        self.realized.len()
    }

    /// Number of block lookups served so far.
    #[must_use]
    pub const fn block_reads(&self) -> u64 {
        self.block_reads
    }

    /// Special room count of the monument anchored at `chunk`, or `None` when
    /// no monument exists there.
    pub fn expected_rooms(&mut self, chunk: ChunkCoord) -> Option<u32> {
        self.monument_at(chunk).map(|monument| monument.special_rooms)
    }

    fn monument_at(&mut self, chunk: ChunkCoord) -> Option<&Monument> {
        if !self.monuments.contains_key(&chunk) {
            let generated = self.roll_monument(chunk);
            if let Some(monument) = &generated {
                self.markers.extend(monument.markers.iter().copied());
                debug!(
                    chunk_x = chunk.x(),
                    chunk_z = chunk.z(),
                    special_rooms = monument.special_rooms,
                    "generated monument"
                );
            }
            let _ = self.monuments.insert(chunk, generated);
        }
        self.monuments.get(&chunk).and_then(Option::as_ref)
    }

    fn roll_monument(&self, chunk: ChunkCoord) -> Option<Monument> {
        let (region_x, region_z) = self.predictor.region_of(chunk);
        if self.predictor.start_in_region(self.seed, region_x, region_z) != chunk {
            return None;
        }
        let biome = self.biome_at_block(chunk.middle_block_x(), chunk.middle_block_z());
        if !is_core_biome(biome) {
            return None;
        }
        let instance_seed =
            derive_cell_seed(self.seed as u64, MONUMENT_STREAM, chunk.x(), chunk.z());
        monument::generate(chunk, instance_seed)
    }

    fn biome_at_block(&self, block_x: i32, block_z: i32) -> Biome {
        self.biomes.biome_at(block_x >> 2, block_z >> 2)
    }
}

impl WorldAccess for SyntheticWorld {
    fn realize(&mut self, chunk: ChunkCoord, minimum: ChunkStatus) {
        let status = self.realized.entry(chunk).or_insert(ChunkStatus::Empty);
        if *status < minimum {
            *status = minimum;
        }
        if minimum >= ChunkStatus::StructureStarts {
            let _ = self.monument_at(chunk);
        }
    }

    fn query_instances(&mut self, chunk: ChunkCoord, kind: StructureKind) -> Vec<StructureStart> {
        let ready = self
            .realized_status(chunk)
            .is_some_and(|status| status >= ChunkStatus::StructureStarts);
        if !ready || kind != StructureKind::OceanMonument {
            return Vec::new();
        }
        self.monument_at(chunk)
            .map(|monument| vec![monument.start.clone()])
            .unwrap_or_default()
    }

    fn block_at(&mut self, pos: BlockPos) -> BlockId {
        self.block_reads += 1;
        if self.markers.contains(&pos) {
            BlockId::WET_SPONGE
        } else if pos.y() < DEFAULT_SEA_LEVEL {
            BlockId::WATER
        } else {
            BlockId::AIR
        }
    }
}

impl BiomeSampler for SyntheticWorld {
    fn sample(&self, quart_x: i32, _quart_y: i32, quart_z: i32) -> Biome {
        self.biomes.biome_at(quart_x, quart_z)
    }
}

pub(crate) fn derive_labeled_seed(base: u64, label: &str) -> u64 {
    let mut hasher = Sha256::new();
    hasher.update(base.to_le_bytes());
    hasher.update(label.as_bytes());
    finalize_seed(hasher)
}

pub(crate) fn derive_cell_seed(base: u64, label: &str, x: i32, z: i32) -> u64 {
    let mut hasher = Sha256::new();
    hasher.update(base.to_le_bytes());
    hasher.update(label.as_bytes());
    hasher.update(x.to_le_bytes());
    hasher.update(z.to_le_bytes());
    finalize_seed(hasher)
}

fn finalize_seed(hasher: Sha256) -> u64 {
    let digest = hasher.finalize();
    let mut bytes = [0_u8; 8];
    bytes.copy_from_slice(&digest[..8]);
    u64::from_le_bytes(bytes)
}
