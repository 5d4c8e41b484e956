//! Whole-footprint marker survey.
//!
//! Older tooling estimated special rooms by fully generating the area around
//! an instance and dividing the marker total by the markers one room holds.
//! It needs fully generated chunks, so the batch pipeline relies on
//! [`crate::LayoutIntrospector`] instead.

use monument_survey_core::{BlockId, BlockPos, ChunkCoord, ChunkStatus, WorldAccess};

/// Half extent, in blocks, of the surveyed square around the centre.
pub const SURVEY_HALF_EXTENT: i32 = 29;

/// Marker blocks a single special room holds.
pub const MARKERS_PER_ROOM: u64 = 30;

const SURVEY_MIN_Y: i32 = 40;
const SURVEY_MAX_Y: i32 = 55;

/// Counts marker blocks across a fully generated square around a centre column.
#[derive(Clone, Copy, Debug)]
pub struct AreaSurvey {
    marker: BlockId,
}

impl Default for AreaSurvey {
    fn default() -> Self {
        Self::new(BlockId::WET_SPONGE)
    }
}

impl AreaSurvey {
    /// Creates a survey counting the provided marker content.
    #[must_use]
    pub const fn new(marker: BlockId) -> Self {
        Self { marker }
    }

    /// Realizes every chunk under the square fully and counts markers in
    /// `x, z ∈ [centre - 29, centre + 28]`, `y ∈ [40, 55]`.
    pub fn count_markers<W>(&self, world: &mut W, center_x: i32, center_z: i32) -> u64
    where
        W: WorldAccess,
    {
        let min = ChunkCoord::containing_block(
            center_x.wrapping_sub(SURVEY_HALF_EXTENT),
            center_z.wrapping_sub(SURVEY_HALF_EXTENT),
        );
        let max = ChunkCoord::containing_block(
            center_x.wrapping_add(SURVEY_HALF_EXTENT),
            center_z.wrapping_add(SURVEY_HALF_EXTENT),
        );
        for chunk_x in min.x()..=max.x() {
            for chunk_z in min.z()..=max.z() {
                world.realize(ChunkCoord::new(chunk_x, chunk_z), ChunkStatus::Full);
            }
        }

        let mut markers = 0;
        for dx in -SURVEY_HALF_EXTENT..SURVEY_HALF_EXTENT {
            for dz in -SURVEY_HALF_EXTENT..SURVEY_HALF_EXTENT {
                for y in SURVEY_MIN_Y..=SURVEY_MAX_Y {
                    let pos =
                        BlockPos::new(center_x.wrapping_add(dx), y, center_z.wrapping_add(dz));
                    if world.block_at(pos) == self.marker {
                        markers += 1;
                    }
                }
            }
        }
        markers
    }

    /// Surveys the area and converts the marker total into a room estimate.
    pub fn estimate_rooms<W>(&self, world: &mut W, center_x: i32, center_z: i32) -> u32
    where
        W: WorldAccess,
    {
        infer_rooms_from_markers(self.count_markers(world, center_x, center_z))
    }
}

/// Rounds `markers / 30` to the nearest room, halves rounding up.
#[must_use]
pub fn infer_rooms_from_markers(markers: u64) -> u32 {
    let rooms = (markers + MARKERS_PER_ROOM / 2) / MARKERS_PER_ROOM;
    u32::try_from(rooms).unwrap_or(u32::MAX)
}
