//! # Visibility Planner
//!
//! Decides which map tiles a viewer should have loaded, in priority order.
//!
//! ## Pipeline
//!
//! ```text
//!   explored chunks ──▶ downscale 2x2 ──▶ candidate tiles
//!                                              │
//!   boundary corners ──▶ anchor tiles ─────────┤ (removed from candidates)
//!                                              ▼
//!                         rank by (distance to viewer, key)
//!                                              │
//!                         truncate to capacity - anchors
//!                                              ▼
//!                         plan = anchors ++ ranked
//! ```
//!
//! ## Invariants
//!
//! - `plan.len() <= capacity`, always.
//! - With a non-empty boundary and `capacity >= 4`, every corner tile is in
//!   the plan.
//! - Output is a pure function of the inputs. Candidates are collected into a
//!   sorted structure before ranking, so hash iteration order never leaks.

use std::cmp::Ordering;
use std::collections::BTreeSet;

use crate::boundary::MapBoundary;
use crate::chunk::{ChunkKey, TILE_SHIFT};

/// Viewer position in continuous map-tile coordinates.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct TileCenter {
    /// Tile-space X.
    pub x: f64,
    /// Tile-space Z.
    pub z: f64,
}

impl TileCenter {
    /// Creates a tile-space centre.
    #[inline]
    #[must_use]
    pub const fn new(x: f64, z: f64) -> Self {
        Self { x, z }
    }

    /// Converts a continuous world position to tile space.
    #[inline]
    #[must_use]
    pub fn from_world_pos(world_x: f64, world_z: f64) -> Self {
        const TILE_WORLD_SIZE: f64 = 32.0;
        Self::new(world_x / TILE_WORLD_SIZE, world_z / TILE_WORLD_SIZE)
    }

    /// Euclidean distance from this centre to the middle of `tile`.
    #[inline]
    #[must_use]
    pub fn distance_to(&self, tile: ChunkKey) -> f64 {
        let dx = f64::from(tile.x()) + 0.5 - self.x;
        let dz = f64::from(tile.z()) + 0.5 - self.z;
        dx.hypot(dz)
    }
}

/// Ordered list of map tiles to keep loaded for one viewer.
///
/// Anchors come first, then the distance-ranked tiles nearest first.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct VisibilityPlan {
    tiles: Vec<ChunkKey>,
    anchor_count: usize,
}

impl VisibilityPlan {
    /// Tiles in load-priority order.
    #[inline]
    #[must_use]
    pub fn tiles(&self) -> &[ChunkKey] {
        &self.tiles
    }

    /// The boundary anchor tiles (a prefix of [`tiles`](Self::tiles)).
    #[inline]
    #[must_use]
    pub fn anchors(&self) -> &[ChunkKey] {
        &self.tiles[..self.anchor_count]
    }

    /// The distance-ranked tiles following the anchors.
    #[inline]
    #[must_use]
    pub fn ranked(&self) -> &[ChunkKey] {
        &self.tiles[self.anchor_count..]
    }

    /// Number of planned tiles.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    /// Whether nothing is planned.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    /// Whether `tile` is part of the plan.
    #[must_use]
    pub fn contains(&self, tile: ChunkKey) -> bool {
        self.tiles.contains(&tile)
    }

    /// Consumes the plan, returning the ordered tiles.
    #[must_use]
    pub fn into_tiles(self) -> Vec<ChunkKey> {
        self.tiles
    }
}

/// Map tile containing a chunk key.
#[inline]
#[must_use]
pub const fn chunk_to_tile(key: ChunkKey) -> ChunkKey {
    ChunkKey::pack(key.x() >> TILE_SHIFT, key.z() >> TILE_SHIFT)
}

/// Corner tiles of a boundary, deduplicated, in fixed corner order.
#[must_use]
pub fn anchor_tiles(boundary: Option<MapBoundary>) -> Vec<ChunkKey> {
    let Some(bounds) = boundary else {
        return Vec::new();
    };

    let mut anchors = Vec::with_capacity(4);
    for (x, z) in bounds.corners() {
        let tile = chunk_to_tile(ChunkKey::pack(x, z));
        if !anchors.contains(&tile) {
            anchors.push(tile);
        }
    }
    anchors
}

/// Builds visibility plans for a fixed tile capacity.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct VisibilityPlanner {
    capacity: usize,
}

impl VisibilityPlanner {
    /// Creates a planner that never plans more than `capacity` tiles.
    #[inline]
    #[must_use]
    pub const fn new(capacity: usize) -> Self {
        Self { capacity }
    }

    /// Tile cap.
    #[inline]
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Plans the tiles to keep loaded.
    ///
    /// `explored` is at chunk granularity; `boundary` is `None` when nothing
    /// has been explored.
    #[must_use]
    pub fn plan<'a, I>(
        &self,
        explored: I,
        boundary: Option<MapBoundary>,
        center: TileCenter,
    ) -> VisibilityPlan
    where
        I: IntoIterator<Item = &'a ChunkKey>,
    {
        let mut anchors = anchor_tiles(boundary);

        let candidates: BTreeSet<ChunkKey> = explored
            .into_iter()
            .map(|key| chunk_to_tile(*key))
            .filter(|tile| !anchors.contains(tile))
            .collect();

        let mut ranked: Vec<(f64, ChunkKey)> = candidates
            .into_iter()
            .map(|tile| (center.distance_to(tile), tile))
            .collect();
        ranked.sort_by(|a, b| match a.0.total_cmp(&b.0) {
            Ordering::Equal => a.1.cmp(&b.1),
            other => other,
        });

        anchors.truncate(self.capacity);
        let remaining = self.capacity - anchors.len();
        ranked.truncate(remaining);

        let anchor_count = anchors.len();
        let mut tiles = anchors;
        tiles.extend(ranked.into_iter().map(|(_, tile)| tile));

        VisibilityPlan { tiles, anchor_count }
    }
}
