//! # Player Visibility Configs
//!
//! Personal mirrors of the global toggles, plus the override flags that let a
//! permitted player see through a global hide.
//!
//! For each kind the personal hide flag and the override flag are mutually
//! exclusive once set through [`crate::toggle::resolve_toggle`].

use std::collections::BTreeMap;

use fogmap_core::PlayerId;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::kind::ItemKind;

/// One player's visibility settings.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerVisibilityConfig {
    /// Hide every POI for this player.
    pub hide_all_poi_on_map: bool,
    /// Hide unexplored POIs for this player.
    pub hide_unexplored_poi_on_map: bool,
    /// Hide death markers for this player.
    pub hide_death_marker_on_map: bool,
    /// Hide the spawn marker for this player.
    pub hide_spawn_on_map: bool,
    /// Hide other players' warps for this player.
    pub hide_other_warps_on_map: bool,
    /// Hide other players for this player.
    pub hide_players_on_map: bool,
    /// Personal POI block-list. Always applied.
    pub hidden_poi_names: Vec<String>,

    /// See through the global POI hide (also covers the unexplored gate).
    pub override_global_poi_hide: bool,
    /// See through the global death-marker hide.
    pub override_global_death_hide: bool,
    /// See through the global spawn hide.
    pub override_global_spawn_hide: bool,
    /// See through the global other-warps hide.
    pub override_global_other_warps_hide: bool,
    /// See through the global players hide.
    pub override_global_players_hide: bool,
}

impl PlayerVisibilityConfig {
    /// Personal hide flag for `kind`.
    #[must_use]
    pub fn hides(&self, kind: ItemKind) -> bool {
        match kind {
            ItemKind::Poi => self.hide_all_poi_on_map,
            ItemKind::UnexploredPoi => self.hide_unexplored_poi_on_map,
            ItemKind::Death => self.hide_death_marker_on_map,
            ItemKind::Spawn => self.hide_spawn_on_map,
            ItemKind::Warps => self.hide_other_warps_on_map,
            ItemKind::Players => self.hide_players_on_map,
        }
    }

    /// Sets the personal hide flag for `kind`.
    pub fn set_hide(&mut self, kind: ItemKind, hide: bool) {
        let flag = match kind {
            ItemKind::Poi => &mut self.hide_all_poi_on_map,
            ItemKind::UnexploredPoi => &mut self.hide_unexplored_poi_on_map,
            ItemKind::Death => &mut self.hide_death_marker_on_map,
            ItemKind::Spawn => &mut self.hide_spawn_on_map,
            ItemKind::Warps => &mut self.hide_other_warps_on_map,
            ItemKind::Players => &mut self.hide_players_on_map,
        };
        *flag = hide;
    }

    /// Override flag for `kind`. Unexplored POIs share the POI override.
    #[must_use]
    pub fn overrides(&self, kind: ItemKind) -> bool {
        match kind {
            ItemKind::Poi | ItemKind::UnexploredPoi => self.override_global_poi_hide,
            ItemKind::Death => self.override_global_death_hide,
            ItemKind::Spawn => self.override_global_spawn_hide,
            ItemKind::Warps => self.override_global_other_warps_hide,
            ItemKind::Players => self.override_global_players_hide,
        }
    }

    /// Sets the override flag for `kind`.
    pub fn set_override(&mut self, kind: ItemKind, enabled: bool) {
        let flag = match kind {
            ItemKind::Poi | ItemKind::UnexploredPoi => &mut self.override_global_poi_hide,
            ItemKind::Death => &mut self.override_global_death_hide,
            ItemKind::Spawn => &mut self.override_global_spawn_hide,
            ItemKind::Warps => &mut self.override_global_other_warps_hide,
            ItemKind::Players => &mut self.override_global_players_hide,
        };
        *flag = enabled;
    }
}

/// Visibility configs of every known player.
///
/// Readers (marker broadcasts) and writers (toggle commands) may run on
/// different threads. Writers never hold the lock across I/O: persistence
/// works from a [`snapshot`](Self::snapshot).
#[derive(Debug, Default)]
pub struct PlayerConfigs {
    configs: RwLock<BTreeMap<PlayerId, PlayerVisibilityConfig>>,
}

impl PlayerConfigs {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a table from previously saved configs.
    #[must_use]
    pub fn from_map(configs: BTreeMap<PlayerId, PlayerVisibilityConfig>) -> Self {
        Self {
            configs: RwLock::new(configs),
        }
    }

    /// A copy of `player`'s config, default if unknown.
    #[must_use]
    pub fn get(&self, player: PlayerId) -> PlayerVisibilityConfig {
        self.configs.read().get(&player).cloned().unwrap_or_default()
    }

    /// Mutates `player`'s config in place, creating it if unknown.
    pub fn update<R>(&self, player: PlayerId, f: impl FnOnce(&mut PlayerVisibilityConfig) -> R) -> R {
        let mut configs = self.configs.write();
        f(configs.entry(player).or_default())
    }

    /// Copy of every config, ordered by player.
    #[must_use]
    pub fn snapshot(&self) -> BTreeMap<PlayerId, PlayerVisibilityConfig> {
        self.configs.read().clone()
    }

    /// Replaces the whole table.
    pub fn replace_all(&self, configs: BTreeMap<PlayerId, PlayerVisibilityConfig>) {
        *self.configs.write() = configs;
    }

    /// Number of known players.
    #[must_use]
    pub fn len(&self) -> usize {
        self.configs.read().len()
    }

    /// Whether no player has a config.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.configs.read().is_empty()
    }
}
