//! # Chunk Index
//!
//! World space is divided into 16x16 chunks (the unit of exploration) and
//! chunks are grouped 2x2 into map tiles (the unit the planner schedules).
//!
//! ## Key Format
//!
//! A chunk coordinate pair is packed into one ordered 64-bit key:
//!
//! ```text
//! 63                 32 31                  0
//! ┌─────────────────────┬─────────────────────┐
//! │   x (i32, as-is)    │   z (u32 bit copy)  │
//! └─────────────────────┴─────────────────────┘
//! ```
//!
//! The low half is the raw bit pattern of `z`, so negative coordinates
//! survive the round trip exactly.
//!
//! ## Limits
//!
//! Area queries allocate `(2r + 1)^2` candidates. Callers pick radii small
//! enough for that to fit in memory; nothing here checks it at runtime.

use std::collections::HashSet;
use std::fmt;

/// Chunk width/depth in world units.
pub const CHUNK_SIZE: i32 = 16;

/// `log2(CHUNK_SIZE)`.
pub const CHUNK_SHIFT: u32 = 4;

/// Chunks per map tile along each axis.
pub const TILE_CHUNKS: i32 = 2;

/// `log2(TILE_CHUNKS)`.
pub const TILE_SHIFT: u32 = 1;

/// Packed chunk (or map tile) coordinate.
///
/// Ordering is the natural `i64` ordering of the packed value, which the
/// planner uses to break distance ties.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ChunkKey(pub i64);

impl ChunkKey {
    /// Packs an `(x, z)` pair.
    #[inline]
    #[must_use]
    pub const fn pack(x: i32, z: i32) -> Self {
        Self(((x as i64) << 32) | (z as u32 as i64))
    }

    /// Extracts the X coordinate.
    #[inline]
    #[must_use]
    pub const fn x(self) -> i32 {
        (self.0 >> 32) as i32
    }

    /// Extracts the Z coordinate.
    #[inline]
    #[must_use]
    pub const fn z(self) -> i32 {
        self.0 as i32
    }

    /// Unpacks into a coordinate pair.
    #[inline]
    #[must_use]
    pub const fn coord(self) -> ChunkCoord {
        ChunkCoord::new(self.x(), self.z())
    }

    /// Raw packed value, as stored by persistence backends.
    #[inline]
    #[must_use]
    pub const fn raw(self) -> i64 {
        self.0
    }
}

impl From<i64> for ChunkKey {
    fn from(raw: i64) -> Self {
        Self(raw)
    }
}

impl From<ChunkCoord> for ChunkKey {
    fn from(coord: ChunkCoord) -> Self {
        coord.key()
    }
}

impl fmt::Display for ChunkKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x(), self.z())
    }
}

/// Packs an `(x, z)` pair into a key.
#[inline]
#[must_use]
pub const fn pack(x: i32, z: i32) -> ChunkKey {
    ChunkKey::pack(x, z)
}

/// X half of a packed key.
#[inline]
#[must_use]
pub const fn unpack_x(key: ChunkKey) -> i32 {
    key.x()
}

/// Z half of a packed key.
#[inline]
#[must_use]
pub const fn unpack_z(key: ChunkKey) -> i32 {
    key.z()
}

/// Chunk coordinate (identifies a chunk in the world grid).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct ChunkCoord {
    /// X coordinate (in chunks, not world units).
    pub x: i32,
    /// Z coordinate (in chunks, not world units).
    pub z: i32,
}

impl ChunkCoord {
    /// Creates a new chunk coordinate.
    #[inline]
    #[must_use]
    pub const fn new(x: i32, z: i32) -> Self {
        Self { x, z }
    }

    /// Chunk containing a continuous world position.
    #[inline]
    #[must_use]
    pub fn from_world_pos(world_x: f64, world_z: f64) -> Self {
        Self::new(block_to_chunk(world_x), block_to_chunk(world_z))
    }

    /// Packed key of this coordinate.
    #[inline]
    #[must_use]
    pub const fn key(self) -> ChunkKey {
        ChunkKey::pack(self.x, self.z)
    }

    /// Map tile containing this chunk.
    ///
    /// Arithmetic shift, so chunk -1 lands in tile -1 rather than tile 0.
    #[inline]
    #[must_use]
    pub const fn to_tile(self) -> ChunkCoord {
        Self::new(self.x >> TILE_SHIFT, self.z >> TILE_SHIFT)
    }
}

impl fmt::Display for ChunkCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.z)
    }
}

/// Converts a world coordinate to the chunk coordinate containing it.
#[inline]
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn block_to_chunk(coord: f64) -> i32 {
    (coord.floor() as i32) >> CHUNK_SHIFT
}

/// Converts a world coordinate to the map tile coordinate containing it.
#[inline]
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn block_to_tile(coord: f64) -> i32 {
    (coord.floor() as i32) >> (CHUNK_SHIFT + TILE_SHIFT)
}

/// Chunks whose squared distance from the centre is at most `radius^2`.
///
/// A negative radius yields the empty set.
#[must_use]
pub fn circular_area(center_x: i32, center_z: i32, radius: i32) -> HashSet<ChunkKey> {
    if radius < 0 {
        return HashSet::new();
    }

    let radius_sq = i64::from(radius) * i64::from(radius);
    let side = usize::try_from(2 * i64::from(radius) + 1).unwrap_or(0);
    let mut chunks = HashSet::with_capacity(side * side);

    for dx in -radius..=radius {
        for dz in -radius..=radius {
            let (ddx, ddz) = (i64::from(dx), i64::from(dz));
            if ddx * ddx + ddz * ddz <= radius_sq {
                chunks.insert(ChunkKey::pack(center_x + dx, center_z + dz));
            }
        }
    }

    chunks
}

/// Every chunk in the closed rectangle `[min_x, max_x] x [min_z, max_z]`.
#[must_use]
pub fn rectangular_area(min_x: i32, max_x: i32, min_z: i32, max_z: i32) -> HashSet<ChunkKey> {
    let mut chunks = HashSet::new();

    for x in min_x..=max_x {
        for z in min_z..=max_z {
            chunks.insert(ChunkKey::pack(x, z));
        }
    }

    chunks
}

/// Euclidean distance between two chunk coordinates.
#[inline]
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn chunk_distance(a: ChunkCoord, b: ChunkCoord) -> f64 {
    let dx = i64::from(a.x) - i64::from(b.x);
    let dz = i64::from(a.z) - i64::from(b.z);
    ((dx * dx + dz * dz) as f64).sqrt()
}
