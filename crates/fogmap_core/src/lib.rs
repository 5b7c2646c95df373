//! # FOGMAP Core
//!
//! Fog-of-war exploration tracking and map-tile visibility planning.
//!
//! ## Design Principles
//!
//! 1. **Monotone**: explored sets and boundaries only grow until reset
//! 2. **Deterministic**: identical inputs produce identical plans
//! 3. **Capped**: a plan never exceeds its tile capacity
//! 4. **Instruction-only**: nothing here talks to the network or disk
//!
//! ## Core Components
//!
//! - `chunk`: packed chunk keys, coordinate conversion, area queries
//! - `ExplorationSet`: per-player explored chunks, in memory or persisted
//! - `BoundaryTracker`: bounding rectangle of discovered territory
//! - `ExplorationRegistry`: records per world and player
//! - `VisibilityPlanner`: ranked tiles to keep loaded
//! - `LoadSetManager`: unload diffs and bulk eviction
//!
//! ## Example
//!
//! ```rust,ignore
//! use fogmap_core::{ChunkCoord, ExplorationRecord, LoadSetManager, PlayerId, TileCenter, VisibilityPlanner};
//!
//! let mut record = ExplorationRecord::new(PlayerId(1), None);
//! record.reveal(ChunkCoord::from_world_pos(40.0, -12.0), 16);
//!
//! let planner = VisibilityPlanner::new(6_000);
//! let plan = planner.plan(
//!     &record.explored().all_explored(),
//!     record.boundary().bounds(),
//!     TileCenter::from_world_pos(40.0, -12.0),
//! );
//!
//! let mut loaded = LoadSetManager::new();
//! let diff = loaded.apply(&plan);
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod boundary;
pub mod chunk;
pub mod exploration;
pub mod load_set;
pub mod planner;
pub mod record;

pub use boundary::{BoundaryTracker, MapBoundary};
pub use chunk::{
    block_to_chunk, block_to_tile, chunk_distance, circular_area, pack, rectangular_area,
    unpack_x, unpack_z, ChunkCoord, ChunkKey, CHUNK_SIZE,
};
pub use exploration::{ChunkStore, ExplorationSet, ExploredLookup};
pub use load_set::{
    diff, LoadSetManager, SweepPolicy, TileDiff, DEFAULT_LOAD_CEILING, DEFAULT_SWEEP_INTERVAL,
};
pub use planner::{TileCenter, VisibilityPlan, VisibilityPlanner};
pub use record::{ExplorationRecord, ExplorationRegistry, ExplorationStats, PlayerId, SharedRecord};
