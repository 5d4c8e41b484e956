#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Deterministic random-spread placement predictor.
//!
//! The world generator partitions the chunk lattice into square regions of
//! `spacing` chunks and places at most one structure start per region at an
//! offset drawn from a region-seeded [`LegacyRandom`]. This crate replays that
//! math without touching the world so candidate start chunks can be listed
//! for arbitrarily large areas.

mod random;

use std::collections::BTreeSet;

use monument_survey_core::ChunkCoord;
use thiserror::Error;

pub use random::LegacyRandom;

/// Region size, in chunks, used by ocean monument placement.
pub const MONUMENT_SPACING: i32 = 32;
/// Minimum chunk gap between monument starts in neighbouring regions.
pub const MONUMENT_SEPARATION: i32 = 5;
/// Salt identifying ocean monuments in the region seed.
pub const MONUMENT_SALT: i32 = 10_387_313;

const REGION_MULTIPLIER_X: i64 = 341_873_128_712;
const REGION_MULTIPLIER_Z: i64 = 132_897_987_541;

/// Errors raised while validating placement parameters.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum PlacementError {
    /// The spread leaves no room for an offset inside a region.
    #[error("spacing {spacing} must be greater than separation {separation}")]
    InvalidSpread {
        /// Configured region size in chunks.
        spacing: i32,
        /// Configured minimum separation in chunks.
        separation: i32,
    },
    /// Regions must span at least one chunk.
    #[error("spacing {spacing} must be positive")]
    NonPositiveSpacing {
        /// Configured region size in chunks.
        spacing: i32,
    },
    /// Separation cannot push offsets past the region edge.
    #[error("separation {separation} must not be negative")]
    NegativeSeparation {
        /// Configured minimum separation in chunks.
        separation: i32,
    },
}

/// How negative chunk coordinates are mapped onto region indices.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum RegionRounding {
    /// Shifts negative coordinates by `spacing - 1` so truncating division floors.
    #[default]
    Floor,
    /// Shifts negative coordinates by `spacing + 1`, reproducing a historical
    /// placement defect.
    Historical,
}

impl RegionRounding {
    /// Region index containing the provided chunk coordinate.
    #[must_use]
    pub const fn region_of(self, chunk: i32, spacing: i32) -> i32 {
        let adjusted = if chunk < 0 {
            match self {
                Self::Floor => chunk.wrapping_sub(spacing.wrapping_sub(1)),
                Self::Historical => chunk.wrapping_sub(spacing.wrapping_add(1)),
            }
        } else {
            chunk
        };
        adjusted / spacing
    }
}

/// Random-spread parameters of a structure type.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PlacementParams {
    /// Region side length in chunks.
    pub spacing: i32,
    /// Minimum distance from the far region edges in chunks.
    pub separation: i32,
    /// Structure-type salt mixed into the region seed.
    pub salt: i32,
    /// Averages two draws per axis to centre offsets within the region.
    pub triangular: bool,
    /// Region index rounding for negative coordinates.
    pub rounding: RegionRounding,
}

impl Default for PlacementParams {
    fn default() -> Self {
        Self::ocean_monument()
    }
}

impl PlacementParams {
    /// Parameters used by the host generator for ocean monuments.
    #[must_use]
    pub const fn ocean_monument() -> Self {
        Self {
            spacing: MONUMENT_SPACING,
            separation: MONUMENT_SEPARATION,
            salt: MONUMENT_SALT,
            triangular: true,
            rounding: RegionRounding::Floor,
        }
    }

    /// Exclusive upper bound of per-axis offsets within a region.
    pub fn offset_bound(&self) -> Result<i32, PlacementError> {
        if self.spacing <= 0 {
            return Err(PlacementError::NonPositiveSpacing {
                spacing: self.spacing,
            });
        }
        if self.separation < 0 {
            return Err(PlacementError::NegativeSeparation {
                separation: self.separation,
            });
        }
        let bound = self.spacing.checked_sub(self.separation).unwrap_or(0);
        if bound <= 0 {
            return Err(PlacementError::InvalidSpread {
                spacing: self.spacing,
                separation: self.separation,
            });
        }
        Ok(bound)
    }
}

/// Square search window centred on a chunk.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SearchArea {
    center: ChunkCoord,
    radius: u32,
}

impl SearchArea {
    /// Creates a search window extending `radius` chunks from `center` on each axis.
    #[must_use]
    pub const fn new(center: ChunkCoord, radius: u32) -> Self {
        Self { center, radius }
    }

    /// Chunk at the centre of the window.
    #[must_use]
    pub const fn center(&self) -> ChunkCoord {
        self.center
    }

    /// Half side length of the window in chunks.
    #[must_use]
    pub const fn radius(&self) -> u32 {
        self.radius
    }

    /// Reports whether the chunk lies within the square window.
    #[must_use]
    pub fn contains(&self, chunk: ChunkCoord) -> bool {
        self.center.chebyshev_distance(chunk) <= self.radius
    }

    fn bounds(&self, axis: i32) -> (i32, i32) {
        let radius = i64::from(self.radius);
        let axis = i64::from(axis);
        (clamp_to_i32(axis - radius), clamp_to_i32(axis + radius))
    }
}

fn clamp_to_i32(value: i64) -> i32 {
    i32::try_from(value).unwrap_or(if value < 0 { i32::MIN } else { i32::MAX })
}

/// Seed of the region's placement generator.
#[must_use]
pub const fn region_seed(world_seed: i64, salt: i32, region_x: i32, region_z: i32) -> i64 {
    (region_x as i64)
        .wrapping_mul(REGION_MULTIPLIER_X)
        .wrapping_add((region_z as i64).wrapping_mul(REGION_MULTIPLIER_Z))
        .wrapping_add(world_seed)
        .wrapping_add(salt as i64)
}

/// Pure predictor of structure start chunks for one structure type.
#[derive(Clone, Copy, Debug)]
pub struct PlacementPredictor {
    params: PlacementParams,
    bound: i32,
}

impl PlacementPredictor {
    /// Validates the parameters and builds a predictor.
    pub fn new(params: PlacementParams) -> Result<Self, PlacementError> {
        let bound = params.offset_bound()?;
        Ok(Self { params, bound })
    }

    /// Predictor for ocean monuments, whose constants are known to be valid.
    #[must_use]
    pub const fn ocean_monument() -> Self {
        Self {
            params: PlacementParams::ocean_monument(),
            bound: MONUMENT_SPACING - MONUMENT_SEPARATION,
        }
    }

    /// Parameters the predictor was built with.
    #[must_use]
    pub const fn params(&self) -> &PlacementParams {
        &self.params
    }

    /// Region index pair containing the chunk.
    #[must_use]
    pub const fn region_of(&self, chunk: ChunkCoord) -> (i32, i32) {
        let spacing = self.params.spacing;
        (
            self.params.rounding.region_of(chunk.x(), spacing),
            self.params.rounding.region_of(chunk.z(), spacing),
        )
    }

    /// Predicted start chunk of the provided region.
    #[must_use]
    pub fn start_in_region(&self, world_seed: i64, region_x: i32, region_z: i32) -> ChunkCoord {
        let seed = region_seed(world_seed, self.params.salt, region_x, region_z);
        let mut random = LegacyRandom::new(seed);
        let offset_x = self.draw_offset(&mut random);
        let offset_z = self.draw_offset(&mut random);
        let spacing = self.params.spacing;
        ChunkCoord::new(
            region_x.wrapping_mul(spacing).wrapping_add(offset_x),
            region_z.wrapping_mul(spacing).wrapping_add(offset_z),
        )
    }

    fn draw_offset(&self, random: &mut LegacyRandom) -> i32 {
        if self.params.triangular {
            (random.next_int(self.bound) + random.next_int(self.bound)) / 2
        } else {
            random.next_int(self.bound)
        }
    }

    /// Lists predicted start chunks inside the area, nearest to the centre first.
    ///
    /// A `max_results` of zero disables the cap.
    #[must_use]
    pub fn predict(&self, world_seed: i64, area: SearchArea, max_results: usize) -> Vec<ChunkCoord> {
        self.predict_refined(world_seed, area, max_results, Some)
    }

    /// Lists predicted start chunks after passing each through `refine`.
    ///
    /// `refine` may replace a prediction with a nearby chunk or drop it by
    /// returning `None`. The radius check and de-duplication apply to the
    /// refined chunk.
    pub fn predict_refined<F>(
        &self,
        world_seed: i64,
        area: SearchArea,
        max_results: usize,
        mut refine: F,
    ) -> Vec<ChunkCoord>
    where
        F: FnMut(ChunkCoord) -> Option<ChunkCoord>,
    {
        let spacing = self.params.spacing;
        let rounding = self.params.rounding;
        let (min_x, max_x) = area.bounds(area.center().x());
        let (min_z, max_z) = area.bounds(area.center().z());
        let regions_x = rounding.region_of(min_x, spacing)..=rounding.region_of(max_x, spacing);
        let regions_z = rounding.region_of(min_z, spacing)..=rounding.region_of(max_z, spacing);

        let mut seen = BTreeSet::new();
        let mut out = Vec::new();
        for region_x in regions_x {
            for region_z in regions_z.clone() {
                let start = self.start_in_region(world_seed, region_x, region_z);
                let Some(candidate) = refine(start) else {
                    continue;
                };
                if !area.contains(candidate) || !seen.insert(candidate) {
                    continue;
                }
                out.push(candidate);
            }
        }

        let center = area.center();
        out.sort_by_key(|chunk| (chunk.distance_squared(center), chunk.x(), chunk.z()));
        if max_results > 0 {
            out.truncate(max_results);
        }
        out
    }
}
