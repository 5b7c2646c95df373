//! # FOGMAP Privacy
//!
//! Per-viewer visibility of map markers: global rules, personal settings,
//! overrides, and the unexplored gate.
//!
//! ## Core Components
//!
//! - `VisibilityRules`: server-wide toggles and block-list
//! - `PlayerVisibilityConfig` / `PlayerConfigs`: personal toggles and overrides
//! - `resolve_toggle`: override-aware personal toggle
//! - `Capabilities`: permission oracle and optional warp ownership
//! - `PrivacyFilter`: the marker filter

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod capability;
pub mod error;
pub mod filter;
pub mod kind;
pub mod marker;
pub mod player_config;
pub mod rules;
pub mod toggle;

pub use capability::{Capabilities, NoOverrides, PermissionOracle, WarpOwnership};
pub use error::{PrivacyError, PrivacyResult};
pub use filter::{PrivacyFilter, ViewerPolicy};
pub use kind::{ItemKind, ToggleKind};
pub use marker::{normalize, MapMarkerRef, MarkerCategory, MarkerPosition};
pub use player_config::{PlayerConfigs, PlayerVisibilityConfig};
pub use rules::{ExploredScope, VisibilityRules};
pub use toggle::{resolve_toggle, ToggleOutcome};
