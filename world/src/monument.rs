//! Procedural monument layouts.

use monument_survey_core::{BlockBox, BlockPos, ChunkCoord, Piece, StructureKind, StructureStart};
use rand::{seq::index, Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Simple rooms laid out around the core on a 5×5 grid.
pub(crate) const ROOM_COUNT: usize = 24;
/// Upper bound on special rooms per monument.
pub(crate) const MAX_SPECIAL_ROOMS: u32 = 8;

const GRID_SIDE: i32 = 5;
const CORE_SLOT: (i32, i32) = (2, 2);
const CELL_PITCH: i32 = 10;
const ROOM_EXTENT: u16 = 7;
const GRID_ORIGIN: i32 = -25;
const FLOOR_Y: i32 = 40;
const MARKER_Y: i32 = FLOOR_Y + 1;
const HALF_FOOTPRINT: i32 = 29;

const GENERATION_FAILURE_CHANCE: f64 = 0.1;
const SPECIAL_ROOM_CHANCE: f64 = 0.25;
const MISSING_METADATA_CHANCE: f64 = 0.05;

/// Generated monument with the marker blocks its special rooms hold.
#[derive(Clone, Debug)]
pub(crate) struct Monument {
    pub(crate) start: StructureStart,
    pub(crate) markers: Vec<BlockPos>,
    pub(crate) special_rooms: u32,
}

/// Rolls the monument anchored at `chunk`. Returns `None` when terrain
/// generation rejects the placement.
pub(crate) fn generate(chunk: ChunkCoord, seed: u64) -> Option<Monument> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    if rng.gen_bool(GENERATION_FAILURE_CHANCE) {
        return None;
    }

    let special_rooms = (0..MAX_SPECIAL_ROOMS)
        .filter(|_| rng.gen_bool(SPECIAL_ROOM_CHANCE))
        .count();
    let mut special_slots = [false; ROOM_COUNT];
    for slot in index::sample(&mut rng, ROOM_COUNT, special_rooms) {
        special_slots[slot] = true;
    }

    let center_x = chunk.middle_block_x();
    let center_z = chunk.middle_block_z();
    let mut children = Vec::with_capacity(ROOM_COUNT + 1);
    let mut markers = Vec::new();
    let mut slot = 0;

    for column in 0..GRID_SIDE {
        for row in 0..GRID_SIDE {
            let room_box = cell_box(center_x, center_z, column, row);
            if (column, row) == CORE_SLOT {
                children.push(Piece::Other {
                    bounding_box: Some(room_box),
                });
                continue;
            }

            let is_special = special_slots[slot];
            if is_special {
                markers.extend(marker_positions(&room_box));
            }
            let bounding_box = (!rng.gen_bool(MISSING_METADATA_CHANCE)).then_some(room_box);
            children.push(Piece::Room {
                bounding_box,
                room_index: u32::try_from(slot).ok(),
                is_special,
            });
            slot += 1;
        }
    }

    let entrance = BlockBox::from_corners(
        BlockPos::new(center_x - HALF_FOOTPRINT, FLOOR_Y - 1, center_z + 23),
        BlockPos::new(center_x + HALF_FOOTPRINT - 1, FLOOR_Y + 18, center_z + HALF_FOOTPRINT - 1),
    );
    let pieces = vec![
        Piece::Other {
            bounding_box: entrance,
        },
        Piece::Container { children },
    ];

    Some(Monument {
        start: StructureStart::new(StructureKind::OceanMonument, chunk, pieces),
        markers,
        special_rooms: u32::try_from(special_rooms).unwrap_or(MAX_SPECIAL_ROOMS),
    })
}

fn cell_box(center_x: i32, center_z: i32, column: i32, row: i32) -> BlockBox {
    let min = BlockPos::new(
        center_x + GRID_ORIGIN + column * CELL_PITCH,
        FLOOR_Y,
        center_z + GRID_ORIGIN + row * CELL_PITCH,
    );
    BlockBox::from_min_and_extent(min, ROOM_EXTENT, ROOM_EXTENT, ROOM_EXTENT)
}

/// Thirty marker blocks on the floor above each special room's base: a 6×5 patch.
fn marker_positions(room: &BlockBox) -> impl Iterator<Item = BlockPos> {
    let min = room.min();
    (1..=6).flat_map(move |dx| {
        (1..=5).map(move |dz| BlockPos::new(min.x() + dx, MARKER_Y, min.z() + dz))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn special_rooms_hold_thirty_markers_each() {
        for seed in 0..64 {
            let Some(monument) = generate(ChunkCoord::new(3, -7), seed) else {
                continue;
            };
            assert!(monument.special_rooms <= MAX_SPECIAL_ROOMS);
            assert_eq!(monument.markers.len(), monument.special_rooms as usize * 30);
        }
    }

    #[test]
    fn generation_is_deterministic() {
        let first = generate(ChunkCoord::new(12, 18), 99).map(|m| m.start);
        let second = generate(ChunkCoord::new(12, 18), 99).map(|m| m.start);
        assert_eq!(first, second);
    }

    #[test]
    fn rooms_sit_inside_the_footprint() {
        let chunk = ChunkCoord::new(0, 0);
        let monument = (0..32)
            .find_map(|seed| generate(chunk, seed))
            .expect("some seed generates a monument");
        let container = monument.start.pieces()[1]
            .children()
            .expect("second top-level piece is the container");
        assert_eq!(container.len(), ROOM_COUNT + 1);
        for piece in container {
            if let Some(bb) = piece.bounding_box() {
                assert!(bb.min().x() >= chunk.middle_block_x() - HALF_FOOTPRINT);
                assert!(bb.max().z() < chunk.middle_block_z() + HALF_FOOTPRINT);
            }
        }
    }
}
