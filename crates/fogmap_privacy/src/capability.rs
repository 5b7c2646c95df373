//! # Capabilities
//!
//! Host-provided oracles the privacy layer consults.
//!
//! ```text
//! host implements:            privacy consumes:
//! ┌────────────────────┐      ┌───────────────────────────────────┐
//! │ PermissionOracle   │ ───▶ │ Capabilities.permissions          │
//! │ WarpOwnership      │ ───▶ │ Capabilities.warp_ownership (opt) │
//! └────────────────────┘      └───────────────────────────────────┘
//! ```
//!
//! Warp ownership is optional and fixed at startup. When it is absent the
//! other-warps feature reports itself unavailable.

use std::fmt;
use std::sync::Arc;

use fogmap_core::PlayerId;

use crate::kind::ItemKind;

/// Answers whether a player may override a global hide.
pub trait PermissionOracle: Send + Sync {
    /// Whether `player` may override the global hide for `kind`.
    fn can_override(&self, kind: ItemKind, player: PlayerId) -> bool;
}

/// Oracle that grants no overrides.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoOverrides;

impl PermissionOracle for NoOverrides {
    fn can_override(&self, _kind: ItemKind, _player: PlayerId) -> bool {
        false
    }
}

/// Resolves warp names to owners.
pub trait WarpOwnership: Send + Sync {
    /// Whether the integration is up.
    fn is_available(&self) -> bool;

    /// Owner of a warp, if known.
    fn owner_of(&self, warp_name: &str) -> Option<PlayerId>;
}

/// The capabilities in effect for this process.
#[derive(Clone)]
pub struct Capabilities {
    permissions: Arc<dyn PermissionOracle>,
    warp_ownership: Option<Arc<dyn WarpOwnership>>,
}

impl Capabilities {
    /// Creates capabilities with the given permission oracle and no warp
    /// ownership.
    #[must_use]
    pub fn new(permissions: Arc<dyn PermissionOracle>) -> Self {
        Self {
            permissions,
            warp_ownership: None,
        }
    }

    /// Attaches a warp ownership integration.
    #[must_use]
    pub fn with_warp_ownership(mut self, ownership: Arc<dyn WarpOwnership>) -> Self {
        self.warp_ownership = Some(ownership);
        self
    }

    /// Whether `player` may override the global hide for `kind`.
    #[inline]
    #[must_use]
    pub fn can_override(&self, kind: ItemKind, player: PlayerId) -> bool {
        self.permissions.can_override(kind, player)
    }

    /// The warp ownership integration, only if attached and available.
    #[must_use]
    pub fn warp_ownership(&self) -> Option<&dyn WarpOwnership> {
        self.warp_ownership
            .as_deref()
            .filter(|ownership| ownership.is_available())
    }

    /// Whether warp ownership can be resolved.
    #[inline]
    #[must_use]
    pub fn has_warp_ownership(&self) -> bool {
        self.warp_ownership().is_some()
    }
}

impl Default for Capabilities {
    fn default() -> Self {
        Self::new(Arc::new(NoOverrides))
    }
}

impl fmt::Debug for Capabilities {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Capabilities")
            .field("warp_ownership", &self.has_warp_ownership())
            .finish_non_exhaustive()
    }
}
