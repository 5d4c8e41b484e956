#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Biome pre-filter that rejects candidate chunks without loading terrain.
//!
//! Every check samples the host's biome source at a fixed representative
//! height, so results are reproducible for a fixed chunk and sampler.

use monument_survey_core::{quart_from_block, Biome, BiomeSampler, ChunkCoord};
use tracing::debug;

/// Height sampled when the host reports no usable sea level.
pub const DEFAULT_SEA_LEVEL: i32 = 63;

/// Half extent, in blocks, of the structure footprint around its centre.
pub const FOOTPRINT_RADIUS: i32 = 14;

const FOOTPRINT_OFFSETS: [i32; 5] = [
    -FOOTPRINT_RADIUS,
    -FOOTPRINT_RADIUS / 2,
    0,
    FOOTPRINT_RADIUS / 2,
    FOOTPRINT_RADIUS,
];

/// Reports whether the biome may host the centre of the structure.
#[must_use]
pub const fn is_core_biome(biome: Biome) -> bool {
    matches!(
        biome,
        Biome::DeepOcean | Biome::DeepLukewarmOcean | Biome::DeepColdOcean | Biome::DeepFrozenOcean
    )
}

/// Reports whether the biome may appear anywhere under the structure footprint.
#[must_use]
pub const fn is_footprint_biome(biome: Biome) -> bool {
    is_core_biome(biome)
        || matches!(
            biome,
            Biome::Ocean
                | Biome::ColdOcean
                | Biome::LukewarmOcean
                | Biome::WarmOcean
                | Biome::FrozenOcean
                | Biome::River
                | Biome::FrozenRiver
        )
}

/// Tuning for the environment filter.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FilterConfig {
    /// Block height sampled for every check; non-positive values fall back to
    /// [`DEFAULT_SEA_LEVEL`].
    pub sea_level: i32,
    /// Ring radius, in chunks, searched around a rejected candidate. Zero
    /// disables refinement.
    pub refine_radius: u32,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            sea_level: DEFAULT_SEA_LEVEL,
            refine_radius: 0,
        }
    }
}

/// Heuristic pass/fail filter over a biome sampler.
#[derive(Debug)]
pub struct EnvironmentFilter<'a, S> {
    sampler: &'a S,
    config: FilterConfig,
}

impl<'a, S> EnvironmentFilter<'a, S>
where
    S: BiomeSampler,
{
    /// Creates a filter borrowing the host's sampler.
    #[must_use]
    pub fn new(sampler: &'a S, config: FilterConfig) -> Self {
        Self { sampler, config }
    }

    /// Block height used for every sample.
    #[must_use]
    pub fn sample_height(&self) -> i32 {
        if self.config.sea_level <= 0 {
            DEFAULT_SEA_LEVEL
        } else {
            self.config.sea_level
        }
    }

    /// Reports whether the candidate passes both the core and footprint checks.
    #[must_use]
    pub fn passes(&self, chunk: ChunkCoord) -> bool {
        let passed = self.core_check(chunk) && self.footprint_check(chunk);
        if !passed {
            debug!(chunk_x = chunk.x(), chunk_z = chunk.z(), "biome filter rejected candidate");
        }
        passed
    }

    /// Single sample at the chunk's middle block must be a deep ocean variant.
    #[must_use]
    pub fn core_check(&self, chunk: ChunkCoord) -> bool {
        is_core_biome(self.biome_at(chunk.middle_block_x(), chunk.middle_block_z()))
    }

    /// Every sample on the footprint grid must be ocean-like or river-like.
    #[must_use]
    pub fn footprint_check(&self, chunk: ChunkCoord) -> bool {
        let center_x = chunk.middle_block_x();
        let center_z = chunk.middle_block_z();
        FOOTPRINT_OFFSETS.iter().all(|&dx| {
            FOOTPRINT_OFFSETS.iter().all(|&dz| {
                is_footprint_biome(
                    self.biome_at(center_x.wrapping_add(dx), center_z.wrapping_add(dz)),
                )
            })
        })
    }

    /// Returns the candidate itself when it passes, otherwise the first passing
    /// chunk on the nearest ring within the refine radius.
    #[must_use]
    pub fn refine(&self, chunk: ChunkCoord) -> Option<ChunkCoord> {
        if self.passes(chunk) {
            return Some(chunk);
        }

        let radius = i32::try_from(self.config.refine_radius).unwrap_or(i32::MAX);
        for ring in 1..=radius {
            for dx in -ring..=ring {
                for dz in -ring..=ring {
                    if dx.abs() != ring && dz.abs() != ring {
                        continue;
                    }
                    let neighbour = chunk.offset(dx, dz);
                    if self.passes(neighbour) {
                        debug!(
                            from_x = chunk.x(),
                            from_z = chunk.z(),
                            to_x = neighbour.x(),
                            to_z = neighbour.z(),
                            "refined candidate to neighbouring chunk"
                        );
                        return Some(neighbour);
                    }
                }
            }
        }
        None
    }

    fn biome_at(&self, block_x: i32, block_z: i32) -> Biome {
        self.sampler.sample(
            quart_from_block(block_x),
            quart_from_block(self.sample_height()),
            quart_from_block(block_z),
        )
    }
}
