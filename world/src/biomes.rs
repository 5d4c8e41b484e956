//! Coarse hashed biome lattice.

use monument_survey_core::Biome;

use crate::{derive_cell_seed, derive_labeled_seed};

/// log2 of the lattice cell size measured in quarts.
const CELL_SHIFT: u32 = 6;

const BIOME_STREAM: &str = "biome";

/// Cumulative weights (out of 100) for each biome drawn on the lattice.
const BIOME_TABLE: [(u64, Biome); 11] = [
    (34, Biome::DeepOcean),
    (42, Biome::DeepColdOcean),
    (47, Biome::DeepLukewarmOcean),
    (49, Biome::DeepFrozenOcean),
    (63, Biome::Ocean),
    (68, Biome::ColdOcean),
    (71, Biome::WarmOcean),
    (74, Biome::River),
    (86, Biome::Plains),
    (94, Biome::Forest),
    (100, Biome::Desert),
];

/// Assigns one biome to every 64×64 quart cell of the world.
#[derive(Clone, Copy, Debug)]
pub(crate) struct BiomeLattice {
    seed: u64,
}

impl BiomeLattice {
    pub(crate) fn new(world_seed: i64) -> Self {
        Self {
            seed: derive_labeled_seed(world_seed as u64, BIOME_STREAM),
        }
    }

    pub(crate) fn biome_at(&self, quart_x: i32, quart_z: i32) -> Biome {
        let cell_x = quart_x >> CELL_SHIFT;
        let cell_z = quart_z >> CELL_SHIFT;
        let roll = derive_cell_seed(self.seed, BIOME_STREAM, cell_x, cell_z) % 100;

        BIOME_TABLE
            .iter()
            .find(|(threshold, _)| roll < *threshold)
            .map_or(Biome::Plains, |(_, biome)| *biome)
    }
}
