//! # Host Integration Traits
//!
//! Traits the host game server implements so the map service can read
//! positions, reach worlds, and send tile instructions.
//!
//! ```text
//! map service defines:        host implements:
//! ┌────────────────────┐      ┌──────────────────────┐
//! │ trait WorldHost    │ ←─── │ impl for each world  │
//! │ trait TransportSink│ ←─── │ impl over connection │
//! └────────────────────┘      └──────────────────────┘
//! ```
//!
//! The service never stores host objects beyond the call that received them,
//! except the long-lived collaborators handed over at construction.

use std::sync::Arc;

use fogmap_core::{ChunkKey, ChunkStore, PlayerId};
use fogmap_privacy::MapMarkerRef;

use crate::config::MapSettings;
use crate::error::FogmapResult;

/// Continuous world position.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Position {
    /// World X.
    pub x: f64,
    /// World Y.
    pub y: f64,
    /// World Z.
    pub z: f64,
}

impl Position {
    /// Creates a position.
    #[inline]
    #[must_use]
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }
}

/// Work queued onto a world's own thread.
pub type WorldTask = Box<dyn FnOnce() + Send + 'static>;

/// Live player positions.
pub trait PositionSource: Send + Sync {
    /// Current position of `player`, `None` if not spawned.
    fn position(&self, player: PlayerId) -> Option<Position>;
}

/// Delivers tile instructions and settings to one viewer's client.
pub trait TransportSink: Send + Sync {
    /// Requests tiles, in load-priority order.
    fn load_tiles(&self, world: &str, viewer: PlayerId, tiles: &[ChunkKey]);

    /// Drops tiles.
    fn unload_tiles(&self, world: &str, viewer: PlayerId, tiles: &[ChunkKey]);

    /// Sends zoom and resolution settings.
    fn send_settings(&self, world: &str, viewer: PlayerId, settings: &MapSettings);
}

/// One world of the host, with its own single-threaded executor.
pub trait WorldHost: Send + Sync {
    /// Stable world name.
    fn name(&self) -> &str;

    /// Whether the world currently takes scheduled work.
    fn is_accepting_tasks(&self) -> bool;

    /// Queues `task` on the world's thread.
    ///
    /// # Errors
    ///
    /// Returns [`crate::FogmapError::WorldUnavailable`] if the world refused it.
    fn execute(&self, task: WorldTask) -> FogmapResult<()>;

    /// Players currently in this world.
    fn players(&self) -> Vec<PlayerId>;

    /// Stores new map settings for this world.
    fn apply_settings(&self, settings: &MapSettings);
}

/// Enumerates the host's active worlds.
pub trait WorldDirectory: Send + Sync {
    /// Active worlds.
    fn worlds(&self) -> Vec<Arc<dyn WorldHost>>;
}

/// The host's marker registry.
pub trait MarkerRegistry: Send + Sync {
    /// Every marker currently registered in `world`.
    fn markers(&self, world: &str) -> Vec<MapMarkerRef>;
}

/// Attaches persisted exploration stores to players.
pub trait ExplorationPersistence: Send + Sync {
    /// Store for `player` in `world`, `None` to keep exploration in memory.
    fn open(&self, world: &str, player: PlayerId) -> Option<Arc<dyn ChunkStore>>;
}
