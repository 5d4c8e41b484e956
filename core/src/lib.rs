#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the monument survey engine.
//!
//! This crate defines the vocabulary that connects the host adapters, the
//! pure prediction systems, and the batch pipeline. Hosts implement the
//! collaborator traits ([`WorldAccess`], [`BiomeSampler`], [`ProcessControl`]),
//! prediction systems operate purely on [`ChunkCoord`] values, and the layout
//! introspector consumes the explicit [`Piece`] tagged union instead of
//! probing host types by name.

use std::{cmp::Ordering, ops::Range};

use serde::{Deserialize, Serialize};

/// Width of a chunk measured in blocks.
pub const CHUNK_WIDTH: i32 = 16;

/// Sentinel reported for candidates that turned out not to host an instance.
pub const NO_INSTANCE_SENTINEL: i32 = -1;

/// Location of a single chunk on the infinite world lattice.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ChunkCoord {
    x: i32,
    z: i32,
}

impl ChunkCoord {
    /// Creates a new chunk coordinate.
    #[must_use]
    pub const fn new(x: i32, z: i32) -> Self {
        Self { x, z }
    }

    /// Chunk index along the x axis.
    #[must_use]
    pub const fn x(&self) -> i32 {
        self.x
    }

    /// Chunk index along the z axis.
    #[must_use]
    pub const fn z(&self) -> i32 {
        self.z
    }

    /// Returns a coordinate shifted by the provided chunk deltas.
    #[must_use]
    pub const fn offset(self, dx: i32, dz: i32) -> Self {
        Self::new(self.x.wrapping_add(dx), self.z.wrapping_add(dz))
    }

    /// Block x coordinate of the chunk's middle column.
    #[must_use]
    pub const fn middle_block_x(&self) -> i32 {
        self.x.wrapping_mul(CHUNK_WIDTH).wrapping_add(CHUNK_WIDTH / 2)
    }

    /// Block z coordinate of the chunk's middle column.
    #[must_use]
    pub const fn middle_block_z(&self) -> i32 {
        self.z.wrapping_mul(CHUNK_WIDTH).wrapping_add(CHUNK_WIDTH / 2)
    }

    /// Chebyshev distance between two chunks, used for square-radius checks.
    #[must_use]
    pub fn chebyshev_distance(self, other: ChunkCoord) -> u32 {
        self.x.abs_diff(other.x).max(self.z.abs_diff(other.z))
    }

    /// Squared euclidean distance between two chunks.
    #[must_use]
    pub fn distance_squared(self, other: ChunkCoord) -> i64 {
        let dx = i64::from(self.x) - i64::from(other.x);
        let dz = i64::from(self.z) - i64::from(other.z);
        dx * dx + dz * dz
    }

    /// Chunk containing the provided block column.
    #[must_use]
    pub const fn containing_block(x: i32, z: i32) -> Self {
        Self::new(x >> 4, z >> 4)
    }
}

/// Converts a block coordinate into a quart (biome) coordinate.
#[must_use]
pub const fn quart_from_block(block: i32) -> i32 {
    block >> 2
}

/// Position of a single block in world space.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BlockPos {
    x: i32,
    y: i32,
    z: i32,
}

impl BlockPos {
    /// Creates a new block position.
    #[must_use]
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    /// Block x coordinate.
    #[must_use]
    pub const fn x(&self) -> i32 {
        self.x
    }

    /// Block y coordinate.
    #[must_use]
    pub const fn y(&self) -> i32 {
        self.y
    }

    /// Block z coordinate.
    #[must_use]
    pub const fn z(&self) -> i32 {
        self.z
    }
}

/// Inclusive axis-aligned bounding volume expressed in block coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BlockBox {
    min: BlockPos,
    max: BlockPos,
}

impl BlockBox {
    /// Builds a box from two inclusive corners.
    ///
    /// Returns `None` when any minimum component exceeds its maximum, which is
    /// how malformed host metadata is surfaced to callers.
    #[must_use]
    pub fn from_corners(min: BlockPos, max: BlockPos) -> Option<Self> {
        if min.x > max.x || min.y > max.y || min.z > max.z {
            return None;
        }
        Some(Self { min, max })
    }

    /// Builds a box from its minimum corner and the extent along each axis.
    ///
    /// An extent of zero yields a box one cell thick on that axis.
    #[must_use]
    pub fn from_min_and_extent(min: BlockPos, dx: u16, dy: u16, dz: u16) -> Self {
        let max = BlockPos::new(
            min.x.saturating_add(i32::from(dx)),
            min.y.saturating_add(i32::from(dy)),
            min.z.saturating_add(i32::from(dz)),
        );
        Self { min, max }
    }

    /// Inclusive minimum corner.
    #[must_use]
    pub const fn min(&self) -> BlockPos {
        self.min
    }

    /// Inclusive maximum corner.
    #[must_use]
    pub const fn max(&self) -> BlockPos {
        self.max
    }

    /// Number of unit cells enclosed by the box, saturating at `u64::MAX`.
    #[must_use]
    pub fn volume(&self) -> u64 {
        let span = |lo: i32, hi: i32| u64::from(hi.abs_diff(lo)) + 1;
        span(self.min.x, self.max.x)
            .saturating_mul(span(self.min.y, self.max.y))
            .saturating_mul(span(self.min.z, self.max.z))
    }

    /// Reports whether the box encloses the provided position.
    #[must_use]
    pub fn contains(&self, pos: BlockPos) -> bool {
        (self.min.x..=self.max.x).contains(&pos.x)
            && (self.min.y..=self.max.y).contains(&pos.y)
            && (self.min.z..=self.max.z).contains(&pos.z)
    }

    /// Iterates every enclosed position, layer by layer (y, then x, then z).
    pub fn positions(&self) -> impl Iterator<Item = BlockPos> + '_ {
        (self.min.y..=self.max.y).flat_map(move |y| {
            (self.min.x..=self.max.x).flat_map(move |x| {
                (self.min.z..=self.max.z).map(move |z| BlockPos::new(x, y, z))
            })
        })
    }
}

/// Biome classification reported by a [`BiomeSampler`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Biome {
    /// Deep temperate ocean.
    DeepOcean,
    /// Deep lukewarm ocean.
    DeepLukewarmOcean,
    /// Deep cold ocean.
    DeepColdOcean,
    /// Deep frozen ocean.
    DeepFrozenOcean,
    /// Shallow temperate ocean.
    Ocean,
    /// Shallow cold ocean.
    ColdOcean,
    /// Shallow lukewarm ocean.
    LukewarmOcean,
    /// Shallow warm ocean.
    WarmOcean,
    /// Shallow frozen ocean.
    FrozenOcean,
    /// Temperate river.
    River,
    /// Frozen river.
    FrozenRiver,
    /// Sandy shoreline.
    Beach,
    /// Grassland.
    Plains,
    /// Woodland.
    Forest,
    /// Arid sand.
    Desert,
    /// The host could not resolve a registry key for the sampled biome.
    Unresolved,
}

impl Biome {
    /// Registry path of the biome, or `None` when unresolved.
    #[must_use]
    pub const fn key(&self) -> Option<&'static str> {
        match self {
            Self::DeepOcean => Some("deep_ocean"),
            Self::DeepLukewarmOcean => Some("deep_lukewarm_ocean"),
            Self::DeepColdOcean => Some("deep_cold_ocean"),
            Self::DeepFrozenOcean => Some("deep_frozen_ocean"),
            Self::Ocean => Some("ocean"),
            Self::ColdOcean => Some("cold_ocean"),
            Self::LukewarmOcean => Some("lukewarm_ocean"),
            Self::WarmOcean => Some("warm_ocean"),
            Self::FrozenOcean => Some("frozen_ocean"),
            Self::River => Some("river"),
            Self::FrozenRiver => Some("frozen_river"),
            Self::Beach => Some("beach"),
            Self::Plains => Some("plains"),
            Self::Forest => Some("forest"),
            Self::Desert => Some("desert"),
            Self::Unresolved => None,
        }
    }
}

/// Identifier of the content stored in a single block.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BlockId(u32);

impl BlockId {
    /// Empty space.
    pub const AIR: Self = Self(0);
    /// Water source block.
    pub const WATER: Self = Self(1);
    /// Structural brick used for monument walls.
    pub const PRISMARINE_BRICKS: Self = Self(2);
    /// Marker content counted by the volumetric classification policy.
    pub const WET_SPONGE: Self = Self(3);

    /// Creates an identifier from its numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Generation readiness phases a host can realize a chunk to, in order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ChunkStatus {
    /// Nothing generated yet.
    Empty,
    /// Structure start metadata is available; no terrain exists.
    StructureStarts,
    /// Structure references from neighbouring chunks are resolved.
    StructureReferences,
    /// Biomes are populated.
    Biomes,
    /// Base terrain noise is populated.
    Noise,
    /// Surface rules have been applied.
    Surface,
    /// Features and structure blocks have been placed.
    Features,
    /// Fully generated chunk.
    Full,
}

/// Feature types the host can index structure starts by.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StructureKind {
    /// Large underwater temple with sponge rooms.
    OceanMonument,
}

/// One element of an instance's internal layout.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Piece {
    /// Grouping piece whose children hold the actual rooms.
    Container {
        /// Nested pieces owned by the container.
        children: Vec<Piece>,
    },
    /// Simple room piece.
    Room {
        /// Bounding volume, absent when the host could not provide it.
        bounding_box: Option<BlockBox>,
        /// Layout slot index assigned by the host generator, when known.
        room_index: Option<u32>,
        /// Host-declared flag marking the room type as a special room.
        is_special: bool,
    },
    /// Any other structural piece (entrance, wings, core, ...).
    Other {
        /// Bounding volume, absent when the host could not provide it.
        bounding_box: Option<BlockBox>,
    },
}

impl Piece {
    /// Bounding volume of the piece, when known.
    #[must_use]
    pub fn bounding_box(&self) -> Option<&BlockBox> {
        match self {
            Self::Container { .. } => None,
            Self::Room { bounding_box, .. } | Self::Other { bounding_box } => {
                bounding_box.as_ref()
            }
        }
    }

    /// Nested pieces when the piece is a container.
    #[must_use]
    pub fn children(&self) -> Option<&[Piece]> {
        match self {
            Self::Container { children } => Some(children),
            _ => None,
        }
    }

    /// Short discriminator name used in log records.
    #[must_use]
    pub const fn kind_name(&self) -> &'static str {
        match self {
            Self::Container { .. } => "container",
            Self::Room { .. } => "room",
            Self::Other { .. } => "other",
        }
    }
}

/// Confirmed structure instance returned by the host's structure index.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructureStart {
    kind: StructureKind,
    chunk: ChunkCoord,
    pieces: Vec<Piece>,
}

impl StructureStart {
    /// Creates a structure start with its top-level piece list.
    #[must_use]
    pub fn new(kind: StructureKind, chunk: ChunkCoord, pieces: Vec<Piece>) -> Self {
        Self {
            kind,
            chunk,
            pieces,
        }
    }

    /// Feature type of the instance.
    #[must_use]
    pub const fn kind(&self) -> StructureKind {
        self.kind
    }

    /// Chunk the instance originates from.
    #[must_use]
    pub const fn chunk(&self) -> ChunkCoord {
        self.chunk
    }

    /// Top-level piece list.
    #[must_use]
    pub fn pieces(&self) -> &[Piece] {
        &self.pieces
    }
}

/// Outcome of classifying a candidate chunk.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RoomClassification {
    /// No instance exists at the candidate chunk.
    Absent,
    /// An instance exists and contains the given number of special rooms.
    Rooms(u32),
}

impl RoomClassification {
    /// Room count when an instance was found.
    #[must_use]
    pub const fn room_count(&self) -> Option<u32> {
        match self {
            Self::Absent => None,
            Self::Rooms(count) => Some(*count),
        }
    }

    /// Integer encoding where [`NO_INSTANCE_SENTINEL`] marks a missing instance.
    #[must_use]
    pub fn sentinel(&self) -> i32 {
        match self {
            Self::Absent => NO_INSTANCE_SENTINEL,
            Self::Rooms(count) => i32::try_from(*count).unwrap_or(i32::MAX),
        }
    }
}

/// Confirmed instance with its special room count, as persisted in result files.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MonumentResult {
    x: i32,
    z: i32,
    rooms: u32,
}

impl MonumentResult {
    /// Creates a result row from block coordinates and a room count.
    #[must_use]
    pub const fn new(x: i32, z: i32, rooms: u32) -> Self {
        Self { x, z, rooms }
    }

    /// Creates a result anchored at the middle block of the provided chunk.
    #[must_use]
    pub const fn at_chunk(chunk: ChunkCoord, rooms: u32) -> Self {
        Self::new(chunk.middle_block_x(), chunk.middle_block_z(), rooms)
    }

    /// Block x coordinate.
    #[must_use]
    pub const fn x(&self) -> i32 {
        self.x
    }

    /// Block z coordinate.
    #[must_use]
    pub const fn z(&self) -> i32 {
        self.z
    }

    /// Number of special rooms detected.
    #[must_use]
    pub const fn rooms(&self) -> u32 {
        self.rooms
    }

    /// Squared distance from the world origin.
    #[must_use]
    pub fn distance_squared_from_origin(&self) -> i64 {
        let x = i64::from(self.x);
        let z = i64::from(self.z);
        x * x + z * z
    }

    /// Canonical ordering: most rooms first, then nearest to the origin.
    ///
    /// Remaining ties fall back to the coordinates so identical input sets always
    /// sort identically.
    #[must_use]
    pub fn canonical_cmp(&self, other: &Self) -> Ordering {
        other
            .rooms
            .cmp(&self.rooms)
            .then_with(|| {
                self.distance_squared_from_origin()
                    .cmp(&other.distance_squared_from_origin())
            })
            .then_with(|| (self.x, self.z).cmp(&(other.x, other.z)))
    }
}

/// Half-open index window into the candidate list.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BatchRange {
    start: usize,
    size: usize,
}

impl BatchRange {
    /// Creates a new batch window.
    #[must_use]
    pub const fn new(start: usize, size: usize) -> Self {
        Self { start, size }
    }

    /// First candidate index covered by the batch.
    #[must_use]
    pub const fn start(&self) -> usize {
        self.start
    }

    /// Requested number of candidates.
    #[must_use]
    pub const fn size(&self) -> usize {
        self.size
    }

    /// Resolves the window against a list of `len` candidates.
    ///
    /// Returns `None` when the start lies outside the list.
    #[must_use]
    pub fn resolve(&self, len: usize) -> Option<Range<usize>> {
        if self.start >= len {
            return None;
        }
        let end = self.start.saturating_add(self.size).min(len);
        Some(self.start..end)
    }
}

/// Read-only access to a host world's structure index and block storage.
///
/// Methods take `&mut self` because hosts generate lazily; the core never
/// shares a session across threads.
pub trait WorldAccess {
    /// Forces the chunk to be generated at least up to `minimum`.
    fn realize(&mut self, chunk: ChunkCoord, minimum: ChunkStatus);

    /// Structure starts of the requested kind originating in the chunk.
    fn query_instances(&mut self, chunk: ChunkCoord, kind: StructureKind) -> Vec<StructureStart>;

    /// Content of the block at the provided position.
    fn block_at(&mut self, pos: BlockPos) -> BlockId;
}

/// Noise-based biome source that answers without loading terrain.
pub trait BiomeSampler {
    /// Biome at the provided quart coordinates.
    fn sample(&self, quart_x: i32, quart_y: i32, quart_z: i32) -> Biome;
}

impl<F> BiomeSampler for F
where
    F: Fn(i32, i32, i32) -> Biome,
{
    fn sample(&self, quart_x: i32, quart_y: i32, quart_z: i32) -> Biome {
        self(quart_x, quart_y, quart_z)
    }
}

/// Control over the hosting process lifetime.
pub trait ProcessControl {
    /// Asks the host to shut down normally once the current work completes.
    fn request_graceful_stop(&mut self);

    /// Terminates the host immediately with the provided exit code.
    fn force_halt(&mut self, exit_code: i32);
}

#[cfg(test)]
mod tests {
    use super::{
        BatchRange, Biome, BlockBox, BlockPos, ChunkCoord, MonumentResult, Piece,
        RoomClassification, NO_INSTANCE_SENTINEL,
    };
    use serde::{de::DeserializeOwned, Serialize};

    fn assert_round_trip<T>(value: &T)
    where
        T: Serialize + DeserializeOwned + PartialEq + std::fmt::Debug,
    {
        let bytes = bincode::serialize(value).expect("serialize");
        let restored: T = bincode::deserialize(&bytes).expect("deserialize");
        assert_eq!(&restored, value);
    }

    #[test]
    fn chunk_middle_block_handles_negative_chunks() {
        let chunk = ChunkCoord::new(-1, 2);
        assert_eq!(chunk.middle_block_x(), -8);
        assert_eq!(chunk.middle_block_z(), 40);
        assert_eq!(ChunkCoord::containing_block(-8, 40), chunk);
    }

    #[test]
    fn chebyshev_distance_uses_larger_axis() {
        let a = ChunkCoord::new(-3, 4);
        let b = ChunkCoord::new(2, 2);
        assert_eq!(a.chebyshev_distance(b), 5);
        assert_eq!(a.distance_squared(b), 29);
    }

    #[test]
    fn malformed_box_is_rejected() {
        let inverted = BlockBox::from_corners(BlockPos::new(5, 0, 0), BlockPos::new(4, 1, 1));
        assert!(inverted.is_none());
    }

    #[test]
    fn box_volume_and_positions_agree() {
        let bb = BlockBox::from_corners(BlockPos::new(-1, 40, 3), BlockPos::new(1, 41, 4))
            .expect("valid box");
        assert_eq!(bb.volume(), 12);
        assert_eq!(bb.positions().count(), 12);
        assert!(bb.positions().all(|pos| bb.contains(pos)));
        assert!(!bb.contains(BlockPos::new(2, 40, 3)));
    }

    #[test]
    fn batch_range_clamps_to_candidate_count() {
        assert_eq!(BatchRange::new(0, 5).resolve(3), Some(0..3));
        assert_eq!(BatchRange::new(2, 5).resolve(10), Some(2..7));
        assert_eq!(BatchRange::new(3, 5).resolve(3), None);
        assert_eq!(BatchRange::new(1, usize::MAX).resolve(4), Some(1..4));
    }

    #[test]
    fn classification_sentinel_marks_absent_instances() {
        assert_eq!(RoomClassification::Absent.sentinel(), NO_INSTANCE_SENTINEL);
        assert_eq!(RoomClassification::Rooms(3).sentinel(), 3);
        assert_eq!(RoomClassification::Absent.room_count(), None);
    }

    #[test]
    fn canonical_order_prefers_rooms_then_proximity() {
        let mut rows = vec![
            MonumentResult::new(500, 0, 2),
            MonumentResult::new(10, 10, 1),
            MonumentResult::new(100, 0, 2),
            MonumentResult::new(-100, 0, 2),
        ];
        rows.sort_by(MonumentResult::canonical_cmp);
        assert_eq!(
            rows,
            vec![
                MonumentResult::new(-100, 0, 2),
                MonumentResult::new(100, 0, 2),
                MonumentResult::new(500, 0, 2),
                MonumentResult::new(10, 10, 1),
            ]
        );
    }

    #[test]
    fn unresolved_biome_has_no_key() {
        assert_eq!(Biome::Unresolved.key(), None);
        assert_eq!(Biome::DeepColdOcean.key(), Some("deep_cold_ocean"));
    }

    #[test]
    fn piece_tree_round_trips_through_bincode() {
        let room_box = BlockBox::from_corners(BlockPos::new(0, 40, 0), BlockPos::new(7, 47, 7));
        let tree = Piece::Container {
            children: vec![
                Piece::Other { bounding_box: None },
                Piece::Room {
                    bounding_box: room_box,
                    room_index: Some(4),
                    is_special: true,
                },
            ],
        };
        assert_round_trip(&tree);
    }

    #[test]
    fn monument_result_round_trips_through_bincode() {
        assert_round_trip(&MonumentResult::at_chunk(ChunkCoord::new(3, -2), 4));
    }

    #[test]
    fn extent_boxes_include_both_corners() {
        let bb = BlockBox::from_min_and_extent(BlockPos::new(-4, 40, 10), 7, 7, 7);
        assert_eq!(bb.max(), BlockPos::new(3, 47, 17));
        assert_eq!(bb.volume(), 512);
        assert_eq!(BlockBox::from_min_and_extent(BlockPos::new(0, 0, 0), 0, 0, 0).volume(), 1);
    }

    #[test]
    fn full_range_box_volume_saturates() {
        let bb = BlockBox::from_corners(
            BlockPos::new(i32::MIN, i32::MIN, i32::MIN),
            BlockPos::new(i32::MAX, i32::MAX, i32::MAX),
        )
        .expect("valid box");
        assert_eq!(bb.volume(), u64::MAX);

        let flat = BlockBox::from_corners(
            BlockPos::new(i32::MIN, 0, i32::MIN),
            BlockPos::new(i32::MAX, 0, i32::MAX),
        )
        .expect("valid box");
        assert_eq!(flat.volume(), u64::MAX);

        let wide = BlockBox::from_corners(
            BlockPos::new(i32::MIN, 0, 0),
            BlockPos::new(i32::MAX, 0, 1),
        )
        .expect("valid box");
        assert_eq!(wide.volume(), 1_u64 << 33);
    }
}
