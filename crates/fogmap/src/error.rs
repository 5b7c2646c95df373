//! # Error Types
//!
//! All errors surfaced by the map service.
//!
//! None of these are fatal. Config and store failures leave the in-memory
//! state in charge; a busy world is retried on the next tick.

use std::path::PathBuf;

use fogmap_privacy::PrivacyError;
use thiserror::Error;

/// Errors that can occur in the map service.
#[derive(Error, Debug)]
pub enum FogmapError {
    /// Reading or writing a file failed.
    #[error("failed to access {}: {source}", .path.display())]
    ConfigIo {
        /// File involved.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// A config file is not valid TOML for its schema.
    #[error("failed to parse {}: {source}", .path.display())]
    ConfigParse {
        /// File involved.
        path: PathBuf,
        /// Parser error.
        #[source]
        source: toml::de::Error,
    },

    /// A config value could not be written as TOML.
    #[error("failed to serialize configuration: {0}")]
    ConfigSerialize(#[from] toml::ser::Error),

    /// A persisted exploration file is damaged.
    #[error("exploration store {} is corrupt: {reason}", .path.display())]
    StoreCorrupt {
        /// File involved.
        path: PathBuf,
        /// What is wrong with it.
        reason: String,
    },

    /// Unknown quality tier name.
    #[error("invalid quality value: {0} (expected low, medium or high)")]
    InvalidQuality(String),

    /// A world refused scheduled work.
    #[error("world {0} is not accepting tasks")]
    WorldUnavailable(String),

    /// A visibility toggle was refused.
    #[error(transparent)]
    Privacy(#[from] PrivacyError),
}

impl FogmapError {
    /// Wraps an I/O error with the file it concerns.
    #[must_use]
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::ConfigIo {
            path: path.into(),
            source,
        }
    }
}

/// Result type for map service operations.
pub type FogmapResult<T> = Result<T, FogmapError>;
