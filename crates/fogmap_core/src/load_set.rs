//! # Load Set Management
//!
//! Tracks which map tiles a viewer's client currently holds and turns each
//! new [`VisibilityPlan`] into load/unload instructions.
//!
//! ## Two Paths
//!
//! ```text
//!   movement ──▶ apply(plan) ──▶ TileDiff { to_load: plan, to_unload: loaded - plan }
//!
//!   tick ──▶ every N ticks ──▶ loaded > ceiling ? ──▶ sweep: unload loaded - last plan
//! ```
//!
//! `to_load` is always the whole plan in priority order. The renderer skips
//! tiles it already holds, and the full list lets it backfill gaps.
//!
//! Nothing here performs I/O. Instructions are handed back to the caller.

use std::collections::HashSet;

use crate::chunk::ChunkKey;
use crate::planner::VisibilityPlan;

/// Ticks between bulk eviction checks.
pub const DEFAULT_SWEEP_INTERVAL: u32 = 100;

/// Loaded-tile count above which a sweep evicts.
pub const DEFAULT_LOAD_CEILING: usize = 20_000;

/// Instructions produced for one viewer.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TileDiff {
    /// Tiles to request, in load-priority order.
    pub to_load: Vec<ChunkKey>,
    /// Tiles to drop, in key order.
    pub to_unload: Vec<ChunkKey>,
}

impl TileDiff {
    /// Whether there is nothing to send.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.to_load.is_empty() && self.to_unload.is_empty()
    }
}

/// Computes the instructions moving `loaded` to `plan`.
#[must_use]
pub fn diff(plan: &VisibilityPlan, loaded: &HashSet<ChunkKey>) -> TileDiff {
    let keep: HashSet<ChunkKey> = plan.tiles().iter().copied().collect();
    let mut to_unload: Vec<ChunkKey> = loaded.difference(&keep).copied().collect();
    to_unload.sort_unstable();

    TileDiff {
        to_load: plan.tiles().to_vec(),
        to_unload,
    }
}

/// When and how hard bulk eviction runs.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SweepPolicy {
    /// Ticks between checks. Zero disables sweeping.
    pub interval_ticks: u32,
    /// Sweep only when more than this many tiles are loaded.
    pub ceiling: usize,
}

impl Default for SweepPolicy {
    fn default() -> Self {
        Self {
            interval_ticks: DEFAULT_SWEEP_INTERVAL,
            ceiling: DEFAULT_LOAD_CEILING,
        }
    }
}

/// Loaded tiles of one viewer plus the last plan issued to it.
#[derive(Debug, Default)]
pub struct LoadSetManager {
    loaded: HashSet<ChunkKey>,
    last_plan: HashSet<ChunkKey>,
    ticks_since_sweep: u32,
    policy: SweepPolicy,
}

impl LoadSetManager {
    /// Creates an empty manager with the default sweep policy.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty manager with an explicit sweep policy.
    #[must_use]
    pub fn with_policy(policy: SweepPolicy) -> Self {
        Self {
            policy,
            ..Self::default()
        }
    }

    /// Sweep policy in effect.
    #[inline]
    #[must_use]
    pub fn policy(&self) -> SweepPolicy {
        self.policy
    }

    /// Tiles currently considered loaded.
    #[inline]
    #[must_use]
    pub fn loaded(&self) -> &HashSet<ChunkKey> {
        &self.loaded
    }

    /// Number of loaded tiles.
    #[inline]
    #[must_use]
    pub fn loaded_count(&self) -> usize {
        self.loaded.len()
    }

    /// Records tiles the client loaded outside a plan (e.g. the host's own
    /// streaming around the viewer).
    pub fn mark_loaded<I>(&mut self, tiles: I)
    where
        I: IntoIterator<Item = ChunkKey>,
    {
        self.loaded.extend(tiles);
    }

    /// Diffs `plan` against the loaded set and commits the result: unloaded
    /// tiles are dropped and every plan tile is marked loaded.
    pub fn apply(&mut self, plan: &VisibilityPlan) -> TileDiff {
        let result = diff(plan, &self.loaded);

        for tile in &result.to_unload {
            self.loaded.remove(tile);
        }
        self.loaded.extend(plan.tiles().iter().copied());
        self.last_plan = plan.tiles().iter().copied().collect();

        result
    }

    /// Advances the sweep counter. Returns the evicted tiles when a sweep ran.
    pub fn tick(&mut self) -> Vec<ChunkKey> {
        if self.policy.interval_ticks == 0 {
            return Vec::new();
        }

        self.ticks_since_sweep += 1;
        if self.ticks_since_sweep < self.policy.interval_ticks {
            return Vec::new();
        }

        self.ticks_since_sweep = 0;
        self.sweep()
    }

    /// Evicts every loaded tile absent from the last plan, if the loaded set
    /// is above the ceiling. Returns the evicted tiles in key order.
    pub fn sweep(&mut self) -> Vec<ChunkKey> {
        if self.loaded.len() <= self.policy.ceiling {
            return Vec::new();
        }

        let last_plan = &self.last_plan;
        let mut evicted: Vec<ChunkKey> = self
            .loaded
            .iter()
            .filter(|tile| !last_plan.contains(tile))
            .copied()
            .collect();
        evicted.sort_unstable();

        for tile in &evicted {
            self.loaded.remove(tile);
        }

        tracing::debug!(
            evicted = evicted.len(),
            remaining = self.loaded.len(),
            "bulk tile eviction"
        );
        evicted
    }

    /// Forgets all loaded state.
    pub fn clear(&mut self) {
        self.loaded.clear();
        self.last_plan.clear();
        self.ticks_since_sweep = 0;
    }
}
