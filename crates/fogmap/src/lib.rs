//! # FOGMAP
//!
//! World map service: reveals chunks as players move, keeps each viewer's
//! loaded tiles within the quality cap, and hides markers per privacy rules.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     ExplorationScheduler                    │
//! │        timer thread ──▶ world.execute(update_world)         │
//! ├─────────────────────────────────────────────────────────────┤
//! │                     ExplorationService                      │
//! │  registry ─▶ planner ─▶ load sets ─▶ TransportSink          │
//! │  PrivacyFilter over MarkerRegistry output                   │
//! ├──────────────────────────┬──────────────────────────────────┤
//! │ ConfigHandle (TOML)      │ FileStoreProvider (LZ4 files)    │
//! └──────────────────────────┴──────────────────────────────────┘
//! ```
//!
//! The host supplies worlds, positions, transport and permission checks
//! through the traits in [`host`] and [`fogmap_privacy::Capabilities`].
//!
//! ## Example
//!
//! ```rust,ignore
//! let config = Arc::new(ConfigHandle::initialize(Path::new("config/fogmap")));
//! let players = Arc::new(PlayerConfigs::new());
//! let service = Arc::new(ExplorationService::new(config.clone(), players, collaborators));
//!
//! let scheduler = ExplorationScheduler::new(
//!     service.clone(),
//!     worlds,
//!     SchedulerTiming::from_config(&config.get()),
//! );
//! scheduler.start();
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod commands;
pub mod config;
pub mod error;
pub mod host;
pub mod quality;
pub mod scheduler;
pub mod service;
pub mod store;

pub use commands::MapCommands;
pub use config::{
    ConfigHandle, MapConfig, MapSettings, PlayerConfigFile, QualityChange, CONFIG_FILE_NAME,
    PLAYER_CONFIG_FILE_NAME,
};
pub use error::{FogmapError, FogmapResult};
pub use host::{
    ExplorationPersistence, MarkerRegistry, Position, PositionSource, TransportSink,
    WorldDirectory, WorldHost, WorldTask,
};
pub use quality::MapQuality;
pub use scheduler::{DeferredTask, ExplorationScheduler, SchedulerStats, SchedulerTiming};
pub use service::{Collaborators, ExplorationService, UpdateReport, WorldTickReport};
pub use store::{
    decode_keys, encode_keys, FileChunkStore, FileStoreProvider, StoreWriterStats,
    DEFAULT_BATCH_DELAY,
};
