use monument_survey_core::{
    BlockBox, BlockId, BlockPos, ChunkCoord, ChunkStatus, Piece, RoomClassification,
    StructureKind, StructureStart, WorldAccess,
};
use monument_survey_system_layout::{
    AreaSurvey, ClassificationPolicy, IntrospectorConfig, LayoutIntrospector,
};
use monument_survey_system_placement::PlacementPredictor;
use monument_survey_world::SyntheticWorld;

const SEED: i64 = 15;

fn introspector(policy: ClassificationPolicy) -> LayoutIntrospector {
    LayoutIntrospector::new(IntrospectorConfig {
        policy,
        ..IntrospectorConfig::default()
    })
}

fn monument_chunks(world: &mut SyntheticWorld) -> Vec<ChunkCoord> {
    let predictor = PlacementPredictor::ocean_monument();
    let seed = world.seed();
    (-6..6)
        .flat_map(|rx| (-6..6).map(move |rz| (rx, rz)))
        .map(|(rx, rz)| predictor.start_in_region(seed, rx, rz))
        .filter(|chunk| world.expected_rooms(*chunk).is_some())
        .collect()
}

#[test]
fn both_policies_agree_with_generated_layouts() {
    let mut truth = SyntheticWorld::new(SEED);
    let chunks = monument_chunks(&mut truth);
    assert!(!chunks.is_empty());

    for policy in [
        ClassificationPolicy::TypeIdentity,
        ClassificationPolicy::Volumetric,
    ] {
        let mut world = SyntheticWorld::new(SEED);
        let introspector = introspector(policy);
        for chunk in &chunks {
            let expected = truth.expected_rooms(*chunk).expect("monument chunk");
            assert_eq!(
                introspector.classify(&mut world, *chunk),
                RoomClassification::Rooms(expected),
                "{policy:?} disagreed at {chunk:?}"
            );
        }
    }
}

#[test]
fn classification_realizes_only_structure_starts() {
    let mut world = SyntheticWorld::new(SEED);
    let chunk = monument_chunks(&mut world)[0];

    let _ = introspector(ClassificationPolicy::Volumetric).classify(&mut world, chunk);

    assert_eq!(world.realized_status(chunk), Some(ChunkStatus::StructureStarts));
    assert_eq!(world.realized_chunks(), 1);
}

#[test]
fn empty_chunks_are_absent() {
    let mut world = SyntheticWorld::new(SEED);
    let start = PlacementPredictor::ocean_monument().start_in_region(SEED, 0, 0);
    let classification = introspector(ClassificationPolicy::Volumetric)
        .classify(&mut world, start.offset(1, 1));

    assert_eq!(classification, RoomClassification::Absent);
    assert_eq!(classification.sentinel(), -1);
}

#[test]
fn identity_policy_reads_no_blocks() {
    let mut world = SyntheticWorld::new(SEED);
    let chunks = monument_chunks(&mut world);
    let introspector = introspector(ClassificationPolicy::TypeIdentity);
    for chunk in chunks {
        let _ = introspector.classify(&mut world, chunk);
    }
    assert_eq!(world.block_reads(), 0);
}

#[test]
fn area_survey_matches_introspection() {
    let mut world = SyntheticWorld::new(SEED);
    let chunk = monument_chunks(&mut world)[0];
    let expected = world.expected_rooms(chunk).expect("monument chunk");

    let estimate = AreaSurvey::default().estimate_rooms(
        &mut world,
        chunk.middle_block_x(),
        chunk.middle_block_z(),
    );

    assert_eq!(estimate, expected);
    assert_eq!(world.realized_status(chunk), Some(ChunkStatus::Full));
}

/// Host whose only instance mixes declared types with disagreeing content.
struct Scripted {
    start: StructureStart,
    sponge: BlockPos,
}

impl Scripted {
    fn new() -> Self {
        let chunk = ChunkCoord::new(0, 0);
        let unit = |x: i32| {
            BlockBox::from_corners(BlockPos::new(x, 40, 0), BlockPos::new(x + 3, 43, 3))
        };
        let rooms = vec![
            // Declared special but empty.
            Piece::Room {
                bounding_box: unit(0),
                room_index: Some(0),
                is_special: true,
            },
            // Declared simple but holds a marker.
            Piece::Room {
                bounding_box: unit(10),
                room_index: Some(1),
                is_special: false,
            },
            // Metadata missing: falls back to the declared type.
            Piece::Room {
                bounding_box: None,
                room_index: Some(2),
                is_special: true,
            },
        ];
        Self {
            start: StructureStart::new(
                StructureKind::OceanMonument,
                chunk,
                vec![Piece::Container { children: rooms }],
            ),
            sponge: BlockPos::new(11, 41, 1),
        }
    }
}

impl WorldAccess for Scripted {
    fn realize(&mut self, _chunk: ChunkCoord, _minimum: ChunkStatus) {}

    fn query_instances(&mut self, chunk: ChunkCoord, _kind: StructureKind) -> Vec<StructureStart> {
        if chunk == self.start.chunk() {
            vec![self.start.clone()]
        } else {
            Vec::new()
        }
    }

    fn block_at(&mut self, pos: BlockPos) -> BlockId {
        if pos == self.sponge {
            BlockId::WET_SPONGE
        } else {
            BlockId::WATER
        }
    }
}

#[test]
fn volumetric_policy_trusts_content_over_declared_type() {
    let mut world = Scripted::new();
    let report = introspector(ClassificationPolicy::Volumetric)
        .inspect(&mut world, ChunkCoord::new(0, 0))
        .expect("instance present");

    let slots: Vec<Option<u32>> = report.special_rooms.iter().map(|r| r.room_index).collect();
    assert_eq!(slots, vec![Some(1), Some(2)]);
    assert_eq!(report.special_rooms[0].markers, Some(1));
    assert_eq!(report.special_rooms[1].markers, None);
    assert_eq!(report.pieces_inspected, 3);
}

#[test]
fn identity_policy_trusts_declared_type() {
    let mut world = Scripted::new();
    let report = introspector(ClassificationPolicy::TypeIdentity)
        .inspect(&mut world, ChunkCoord::new(0, 0))
        .expect("instance present");

    let slots: Vec<Option<u32>> = report.special_rooms.iter().map(|r| r.room_index).collect();
    assert_eq!(slots, vec![Some(0), Some(2)]);
}
