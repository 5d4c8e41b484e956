use monument_survey_core::{
    BiomeSampler, ChunkCoord, ChunkStatus, Piece, StructureKind, WorldAccess,
};
use monument_survey_system_environment::is_core_biome;
use monument_survey_system_placement::PlacementPredictor;
use monument_survey_world::SyntheticWorld;

fn region_starts(seed: i64) -> Vec<ChunkCoord> {
    let predictor = PlacementPredictor::ocean_monument();
    (-5..5)
        .flat_map(|rx| (-5..5).map(move |rz| (rx, rz)))
        .map(|(rx, rz)| predictor.start_in_region(seed, rx, rz))
        .collect()
}

#[test]
fn independent_sessions_agree_on_every_instance() {
    let starts = region_starts(-4_172_144_997_902_289_642);
    let mut first = SyntheticWorld::new(-4_172_144_997_902_289_642);
    let mut second = SyntheticWorld::new(-4_172_144_997_902_289_642);

    let forward: Vec<Option<u32>> = starts.iter().map(|c| first.expected_rooms(*c)).collect();
    let backward: Vec<Option<u32>> = starts
        .iter()
        .rev()
        .map(|c| second.expected_rooms(*c))
        .collect::<Vec<_>>()
        .into_iter()
        .rev()
        .collect();

    assert_eq!(forward, backward);
    assert!(forward.iter().any(Option::is_some));
}

#[test]
fn monuments_only_stand_in_deep_ocean() {
    let mut world = SyntheticWorld::new(15);
    for chunk in region_starts(15) {
        if world.expected_rooms(chunk).is_some() {
            let biome = world.sample(
                chunk.middle_block_x() >> 2,
                63 >> 2,
                chunk.middle_block_z() >> 2,
            );
            assert!(is_core_biome(biome), "{chunk:?} stands in {biome:?}");
        }
    }
}

#[test]
fn realized_starts_report_their_room_count() {
    let mut world = SyntheticWorld::new(15);
    for chunk in region_starts(15) {
        let Some(rooms) = world.expected_rooms(chunk) else {
            continue;
        };
        world.realize(chunk, ChunkStatus::StructureStarts);
        let starts = world.query_instances(chunk, StructureKind::OceanMonument);
        let declared = starts[0]
            .pieces()
            .iter()
            .filter_map(|piece| piece.children())
            .flatten()
            .filter(|piece| {
                matches!(
                    piece,
                    Piece::Room {
                        is_special: true,
                        ..
                    }
                )
            })
            .count();
        assert_eq!(declared, rooms as usize);
    }
}
