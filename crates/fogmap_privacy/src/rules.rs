//! # Global Visibility Rules
//!
//! Server-wide toggles. Loaded as part of the map config file; every field
//! defaults to "show everything".

use serde::{Deserialize, Serialize};

use crate::kind::ItemKind;
use crate::marker::normalize;

/// Which exploration set gates unexplored POIs.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExploredScope {
    /// The viewer's own explored chunks.
    Viewer,
    /// Every player's explored chunks in the world, pooled.
    Shared,
}

/// Server-wide visibility toggles.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VisibilityRules {
    /// Hide every POI.
    pub hide_all_poi_on_map: bool,
    /// Hide POIs in chunks the viewer has not explored.
    pub hide_unexplored_poi_on_map: bool,
    /// Hide death markers. No-op if the host never records deaths.
    pub hide_death_marker_on_map: bool,
    /// Hide the spawn marker.
    pub hide_spawn_on_map: bool,
    /// Hide warps owned by other players.
    pub hide_other_warps_on_map: bool,
    /// Hide other players.
    pub hide_players_on_map: bool,
    /// POI names, ids or image keys hidden for everyone.
    pub hidden_poi_names: Vec<String>,
    /// Pool exploration across players for the unexplored gate.
    pub share_all_exploration: bool,
}

impl VisibilityRules {
    /// Whether `kind` is hidden server-wide.
    ///
    /// Spawn also counts as hidden when `"spawn"` is on the block-list.
    #[must_use]
    pub fn is_globally_hidden(&self, kind: ItemKind) -> bool {
        match kind {
            ItemKind::Poi => self.hide_all_poi_on_map,
            ItemKind::UnexploredPoi => self.hide_unexplored_poi_on_map,
            ItemKind::Death => self.hide_death_marker_on_map,
            ItemKind::Spawn => self.hide_spawn_on_map || self.blocks_name("spawn"),
            ItemKind::Warps => self.hide_other_warps_on_map,
            ItemKind::Players => self.hide_players_on_map,
        }
    }

    /// Whether the global block-list contains `name` after normalization.
    #[must_use]
    pub fn blocks_name(&self, name: &str) -> bool {
        let wanted = normalize(name);
        !wanted.is_empty() && self.hidden_poi_names.iter().any(|n| normalize(n) == wanted)
    }

    /// Exploration set used by the unexplored gate.
    #[inline]
    #[must_use]
    pub fn explored_scope(&self) -> ExploredScope {
        if self.share_all_exploration {
            ExploredScope::Shared
        } else {
            ExploredScope::Viewer
        }
    }
}
