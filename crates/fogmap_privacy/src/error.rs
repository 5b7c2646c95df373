//! # Privacy Error Types
//!
//! Failures surfaced to players when a visibility toggle cannot be applied.

use thiserror::Error;

use crate::kind::ToggleKind;

/// Errors that can occur while changing visibility settings.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PrivacyError {
    /// The item is hidden server-wide and the player may not override it.
    #[error("{} globally hidden by the server", .0.subject())]
    GloballyHidden(ToggleKind),

    /// An optional integration the feature depends on is not installed.
    #[error("{feature} requires the {requirement}")]
    FeatureUnavailable {
        /// User-facing feature name.
        feature: &'static str,
        /// What is missing.
        requirement: &'static str,
    },
}

/// Result type for privacy operations.
pub type PrivacyResult<T> = Result<T, PrivacyError>;
