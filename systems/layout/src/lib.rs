#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Layout introspection for confirmed structure instances.
//!
//! The introspector realizes a candidate chunk only as far as structure start
//! metadata, locates the instance's room pieces in the [`Piece`] tree, and
//! counts the special rooms according to a [`ClassificationPolicy`]. All world
//! interaction is read-only.

mod area;

use monument_survey_core::{
    BlockBox, BlockId, ChunkCoord, ChunkStatus, Piece, RoomClassification, StructureKind,
    WorldAccess,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

pub use area::{infer_rooms_from_markers, AreaSurvey, MARKERS_PER_ROOM, SURVEY_HALF_EXTENT};

/// Largest bounding volume, in unit cells, the volumetric policy will scan.
pub const MAX_SCAN_VOLUME: u64 = 2_000_000;

/// Rule deciding whether a room piece counts as special.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassificationPolicy {
    /// Trusts the host-declared room type.
    TypeIdentity,
    /// Scans the piece's bounding volume for marker content. Pieces without a
    /// bounding volume fall back to the host-declared room type.
    #[default]
    Volumetric,
}

/// Configuration of the layout introspector.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct IntrospectorConfig {
    /// Structure type queried from the host index.
    pub kind: StructureKind,
    /// Classification rule applied to every room piece.
    pub policy: ClassificationPolicy,
    /// Block content whose presence marks a special room.
    pub marker: BlockId,
}

impl Default for IntrospectorConfig {
    fn default() -> Self {
        Self {
            kind: StructureKind::OceanMonument,
            policy: ClassificationPolicy::default(),
            marker: BlockId::WET_SPONGE,
        }
    }
}

/// Observation emitted for every room classified as special.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SpecialRoom {
    /// Position of the piece within the room-piece list.
    pub index: usize,
    /// Discriminator of the piece variant.
    pub piece: &'static str,
    /// Marker blocks found inside the volume, when it was scanned.
    pub markers: Option<u64>,
    /// Host-assigned layout slot, when known.
    pub room_index: Option<u32>,
    /// Bounding volume of the piece, when known.
    pub bounding_box: Option<BlockBox>,
}

/// Classification of a single confirmed instance.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LayoutReport {
    /// Chunk the instance originates from.
    pub chunk: ChunkCoord,
    /// Number of pieces considered as rooms.
    pub pieces_inspected: usize,
    /// Special rooms in piece order.
    pub special_rooms: Vec<SpecialRoom>,
}

impl LayoutReport {
    /// Number of special rooms detected.
    #[must_use]
    pub fn room_count(&self) -> u32 {
        u32::try_from(self.special_rooms.len()).unwrap_or(u32::MAX)
    }
}

/// Discovers and classifies the piece tree of confirmed instances.
#[derive(Clone, Copy, Debug, Default)]
pub struct LayoutIntrospector {
    config: IntrospectorConfig,
}

impl LayoutIntrospector {
    /// Creates an introspector with the provided configuration.
    #[must_use]
    pub const fn new(config: IntrospectorConfig) -> Self {
        Self { config }
    }

    /// Configuration the introspector was built with.
    #[must_use]
    pub const fn config(&self) -> &IntrospectorConfig {
        &self.config
    }

    /// Counts the special rooms of the instance at `chunk`.
    ///
    /// Returns [`RoomClassification::Absent`] when the host index holds no
    /// instance of the configured kind at that chunk.
    pub fn classify<W>(&self, world: &mut W, chunk: ChunkCoord) -> RoomClassification
    where
        W: WorldAccess,
    {
        match self.inspect(world, chunk) {
            Some(report) => RoomClassification::Rooms(report.room_count()),
            None => RoomClassification::Absent,
        }
    }

    /// Inspects the instance at `chunk` and reports every special room.
    pub fn inspect<W>(&self, world: &mut W, chunk: ChunkCoord) -> Option<LayoutReport>
    where
        W: WorldAccess,
    {
        world.realize(chunk, ChunkStatus::StructureStarts);
        let starts = world.query_instances(chunk, self.config.kind);
        let Some(start) = starts.first() else {
            debug!(chunk_x = chunk.x(), chunk_z = chunk.z(), "no structure start at chunk");
            return None;
        };

        let rooms = room_pieces(start.pieces());
        let mut special_rooms = Vec::new();
        for (index, piece) in rooms.iter().enumerate() {
            let Some(room) = self.classify_piece(world, index, piece) else {
                continue;
            };
            info!(
                chunk_x = chunk.x(),
                chunk_z = chunk.z(),
                idx = room.index,
                piece = room.piece,
                markers = ?room.markers,
                room_index = ?room.room_index,
                bb = ?room.bounding_box,
                "special room detected"
            );
            special_rooms.push(room);
        }

        if !special_rooms.is_empty() {
            info!(
                chunk_x = chunk.x(),
                chunk_z = chunk.z(),
                rooms = special_rooms.len(),
                "special rooms detected"
            );
        }

        Some(LayoutReport {
            chunk,
            pieces_inspected: rooms.len(),
            special_rooms,
        })
    }

    fn classify_piece<W>(&self, world: &mut W, index: usize, piece: &Piece) -> Option<SpecialRoom>
    where
        W: WorldAccess,
    {
        let (bounding_box, room_index, declared_special) = match piece {
            Piece::Container { .. } => return None,
            Piece::Room {
                bounding_box,
                room_index,
                is_special,
            } => (*bounding_box, *room_index, *is_special),
            Piece::Other { bounding_box } => (*bounding_box, None, false),
        };

        let (special, markers) = match (self.config.policy, bounding_box) {
            (ClassificationPolicy::Volumetric, Some(bb)) => {
                let markers = count_markers(world, &bb, self.config.marker);
                (markers.is_some_and(|count| count > 0), markers)
            }
            _ => (declared_special, None),
        };

        special.then_some(SpecialRoom {
            index,
            piece: piece.kind_name(),
            markers,
            room_index,
            bounding_box,
        })
    }
}

/// Selects the list of pieces that represent rooms.
///
/// Hosts commonly wrap the rooms in a single container at the top level; the
/// first container found is descended into. Without one the top-level list is
/// the room list.
#[must_use]
pub fn room_pieces(top_level: &[Piece]) -> &[Piece] {
    top_level
        .iter()
        .find_map(Piece::children)
        .unwrap_or(top_level)
}

/// Counts marker blocks inside the volume.
///
/// Returns `None` without reading any block when the volume exceeds
/// [`MAX_SCAN_VOLUME`].
pub fn count_markers<W>(world: &mut W, bounding_box: &BlockBox, marker: BlockId) -> Option<u64>
where
    W: WorldAccess,
{
    let volume = bounding_box.volume();
    if volume > MAX_SCAN_VOLUME {
        debug!(volume, "skipping oversized bounding volume");
        return None;
    }

    let mut count = 0;
    for pos in bounding_box.positions() {
        if world.block_at(pos) == marker {
            count += 1;
        }
    }
    Some(count)
}
