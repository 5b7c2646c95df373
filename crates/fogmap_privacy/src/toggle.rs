//! # Toggle Resolution
//!
//! Applies a player's personal visibility toggle.
//!
//! ```text
//!               globally hidden?
//!              ┌──────┴───────┐
//!             yes             no
//!              │               │
//!        permitted?       flip personal hide,
//!        ┌────┴────┐      clear override
//!       no        yes
//!        │         │
//!     rejected   flip override,
//!                enabling clears personal hide
//! ```
//!
//! Other-warps additionally needs the warp ownership capability; without it
//! the toggle is unavailable.

use std::fmt;

use fogmap_core::PlayerId;

use crate::capability::Capabilities;
use crate::error::{PrivacyError, PrivacyResult};
use crate::kind::ToggleKind;
use crate::player_config::PlayerVisibilityConfig;
use crate::rules::VisibilityRules;

/// Result of an accepted toggle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ToggleOutcome {
    /// What was toggled.
    pub kind: ToggleKind,
    /// Whether the item is now visible to the player.
    pub visible: bool,
    /// Whether the override flag was flipped rather than the hide flag.
    pub via_override: bool,
}

impl ToggleOutcome {
    /// Extra line explaining the override state, if any.
    #[must_use]
    pub fn override_note(&self) -> Option<&'static str> {
        match (self.via_override, self.visible) {
            (false, _) => None,
            (true, true) => Some("Override enabled; global hide is ignored."),
            (true, false) => Some("Override disabled; global hide is applied."),
        }
    }
}

impl fmt::Display for ToggleOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let status = if self.visible { "VISIBLE" } else { "HIDDEN" };
        write!(f, "{} now {status} for you.", self.kind.subject())
    }
}

/// Applies `kind`'s toggle to `config`.
///
/// # Errors
///
/// - [`PrivacyError::FeatureUnavailable`] for other-warps without warp ownership.
/// - [`PrivacyError::GloballyHidden`] when the kind is hidden server-wide and
///   `player` lacks the override permission.
///
/// On error `config` is untouched.
pub fn resolve_toggle(
    kind: ToggleKind,
    player: PlayerId,
    rules: &VisibilityRules,
    capabilities: &Capabilities,
    config: &mut PlayerVisibilityConfig,
) -> PrivacyResult<ToggleOutcome> {
    if kind == ToggleKind::OtherWarps && !capabilities.has_warp_ownership() {
        return Err(PrivacyError::FeatureUnavailable {
            feature: "Hiding other players' warps",
            requirement: "teleport ownership integration",
        });
    }

    let item = kind.item_kind();
    let globally_hidden = rules.is_globally_hidden(item);

    if globally_hidden {
        if !capabilities.can_override(item, player) {
            return Err(PrivacyError::GloballyHidden(kind));
        }

        let enabled = !config.overrides(item);
        config.set_override(item, enabled);
        if enabled {
            config.set_hide(item, false);
        }
        tracing::debug!(%player, kind = %item, enabled, "override toggled");

        return Ok(ToggleOutcome {
            kind,
            visible: enabled,
            via_override: true,
        });
    }

    let hide = !config.hides(item);
    config.set_override(item, false);
    config.set_hide(item, hide);
    tracing::debug!(%player, kind = %item, hide, "personal hide toggled");

    Ok(ToggleOutcome {
        kind,
        visible: !hide,
        via_override: false,
    })
}
