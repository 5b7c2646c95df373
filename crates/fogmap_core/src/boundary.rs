//! # Boundary Tracking
//!
//! Maintains the smallest axis-aligned rectangle containing every chunk the
//! player has revealed. Each update folds in only the chunks around the new
//! position, so cost is proportional to the reveal radius, not the history.
//!
//! The rectangle only ever grows. [`BoundaryTracker::reset`] is the one way
//! back to the empty state, and it also clears the attached exploration set.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use crate::chunk::{circular_area, rectangular_area, ChunkKey};
use crate::exploration::ExplorationSet;

/// Inclusive rectangle of explored chunks.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct MapBoundary {
    /// Smallest explored chunk X.
    pub min_x: i32,
    /// Largest explored chunk X.
    pub max_x: i32,
    /// Smallest explored chunk Z.
    pub min_z: i32,
    /// Largest explored chunk Z.
    pub max_z: i32,
}

impl MapBoundary {
    /// Rectangle reported when nothing has been explored.
    pub const EMPTY: Self = Self {
        min_x: 0,
        max_x: 0,
        min_z: 0,
        max_z: 0,
    };

    /// Creates a boundary from explicit extents.
    #[inline]
    #[must_use]
    pub const fn new(min_x: i32, max_x: i32, min_z: i32, max_z: i32) -> Self {
        Self {
            min_x,
            max_x,
            min_z,
            max_z,
        }
    }

    /// Width in chunks (inclusive).
    #[inline]
    #[must_use]
    pub const fn width(&self) -> i64 {
        self.max_x as i64 - self.min_x as i64 + 1
    }

    /// Height in chunks (inclusive).
    #[inline]
    #[must_use]
    pub const fn height(&self) -> i64 {
        self.max_z as i64 - self.min_z as i64 + 1
    }

    /// Width x height, in chunks.
    #[inline]
    #[must_use]
    pub const fn area(&self) -> i64 {
        self.width() * self.height()
    }

    /// The four corner chunks: (min, min), (max, min), (min, max), (max, max).
    #[must_use]
    pub const fn corners(&self) -> [(i32, i32); 4] {
        [
            (self.min_x, self.min_z),
            (self.max_x, self.min_z),
            (self.min_x, self.max_z),
            (self.max_x, self.max_z),
        ]
    }

    fn include(&mut self, x: i32, z: i32) {
        self.min_x = self.min_x.min(x);
        self.max_x = self.max_x.max(x);
        self.min_z = self.min_z.min(z);
        self.max_z = self.max_z.max(z);
    }
}

impl fmt::Display for MapBoundary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "x:[{}, {}] z:[{}, {}] size:{}x{}",
            self.min_x,
            self.max_x,
            self.min_z,
            self.max_z,
            self.width(),
            self.height()
        )
    }
}

/// Running bounding rectangle over a player's exploration.
///
/// Every chunk revealed through [`update_boundaries`](Self::update_boundaries)
/// is also marked in the attached [`ExplorationSet`].
#[derive(Debug)]
pub struct BoundaryTracker {
    /// `None` until the first update.
    bounds: Option<MapBoundary>,
    /// Set receiving revealed chunks.
    explored: Arc<ExplorationSet>,
}

impl BoundaryTracker {
    /// Creates an empty tracker writing into `explored`.
    #[must_use]
    pub fn new(explored: Arc<ExplorationSet>) -> Self {
        Self {
            bounds: None,
            explored,
        }
    }

    /// Creates a tracker whose rectangle already covers everything in
    /// `explored`, for sets reloaded from persistence.
    #[must_use]
    pub fn seeded(explored: Arc<ExplorationSet>) -> Self {
        let mut bounds: Option<MapBoundary> = None;
        for key in explored.all_explored() {
            let (x, z) = (key.x(), key.z());
            match bounds.as_mut() {
                Some(b) => b.include(x, z),
                None => bounds = Some(MapBoundary::new(x, x, z, z)),
            }
        }
        Self { bounds, explored }
    }

    /// Reveals the circle of radius `view_radius` around the player.
    ///
    /// Returns the chunks revealed by this call (previously explored ones
    /// included).
    pub fn update_boundaries(
        &mut self,
        player_chunk_x: i32,
        player_chunk_z: i32,
        view_radius: i32,
    ) -> HashSet<ChunkKey> {
        let revealed = circular_area(player_chunk_x, player_chunk_z, view_radius);

        for key in &revealed {
            let (x, z) = (key.x(), key.z());
            match self.bounds.as_mut() {
                Some(bounds) => bounds.include(x, z),
                None => self.bounds = Some(MapBoundary::new(x, x, z, z)),
            }
        }

        self.explored.mark_chunks(&revealed);
        revealed
    }

    /// Current rectangle, or [`MapBoundary::EMPTY`] when nothing is explored.
    #[must_use]
    pub fn current_boundaries(&self) -> MapBoundary {
        self.bounds.unwrap_or(MapBoundary::EMPTY)
    }

    /// Current rectangle, `None` when nothing is explored.
    #[inline]
    #[must_use]
    pub fn bounds(&self) -> Option<MapBoundary> {
        self.bounds
    }

    /// Whether nothing has been explored since creation or the last reset.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bounds.is_none()
    }

    /// Area of the bounding rectangle in chunks.
    ///
    /// This counts the rectangle, not explored chunks: one far outlier makes
    /// it arbitrarily large. Use [`ExplorationSet::count`] for the number of
    /// chunks actually explored.
    #[must_use]
    pub fn total_area(&self) -> i64 {
        self.bounds.map_or(0, |b| b.area())
    }

    /// Every chunk inside the bounding rectangle, explored or not.
    #[must_use]
    pub fn expanded_map_chunks(&self) -> HashSet<ChunkKey> {
        match self.bounds {
            Some(b) => rectangular_area(b.min_x, b.max_x, b.min_z, b.max_z),
            None => HashSet::new(),
        }
    }

    /// The exploration set this tracker writes into.
    #[inline]
    #[must_use]
    pub fn explored(&self) -> &Arc<ExplorationSet> {
        &self.explored
    }

    /// Clears the rectangle and the attached exploration set.
    pub fn reset(&mut self) {
        self.bounds = None;
        self.explored.clear();
    }
}
