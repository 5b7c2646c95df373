//! # Privacy Filter
//!
//! Decides, per viewer, which markers are shown.
//!
//! ## Resolution Order (POIs)
//!
//! 1. Global hide-all, unless the viewer's override is active
//! 2. Personal hide-all, unless the viewer's override is active
//! 3. Block-list: global entries (dropped under override) plus personal entries
//! 4. Unexplored gate against the viewer's or the pooled exploration set
//! 5. Shown
//!
//! An override is *active* only when the flag is set and the viewer holds the
//! matching permission. It bypasses the hide toggles, never the personal
//! block-list.
//!
//! Spawn, death, warp and player markers each follow their own toggle with
//! the same override rule. The viewer's own player marker is always shown.
//!
//! Nothing is cached past a single call.

use fogmap_core::{ExploredLookup, PlayerId};

use crate::capability::Capabilities;
use crate::kind::ItemKind;
use crate::marker::{normalize, MapMarkerRef, MarkerCategory};
use crate::player_config::PlayerVisibilityConfig;
use crate::rules::VisibilityRules;

/// Flags resolved once per viewer per call.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ViewerPolicy {
    /// The viewer.
    pub viewer: PlayerId,
    /// Every POI hidden.
    pub hide_all_poi: bool,
    /// Normalized, non-empty block-list entries.
    pub block_list: Vec<String>,
    /// POIs in unexplored chunks hidden.
    pub hide_unexplored: bool,
    /// Death markers hidden.
    pub hide_death: bool,
    /// Spawn hidden.
    pub hide_spawn: bool,
    /// Warps owned by other players hidden.
    pub hide_other_warps: bool,
    /// Other players hidden.
    pub hide_players: bool,
}

/// Per-viewer marker filter over one set of rules and capabilities.
#[derive(Clone, Copy, Debug)]
pub struct PrivacyFilter<'a> {
    rules: &'a VisibilityRules,
    capabilities: &'a Capabilities,
}

impl<'a> PrivacyFilter<'a> {
    /// Creates a filter.
    #[must_use]
    pub const fn new(rules: &'a VisibilityRules, capabilities: &'a Capabilities) -> Self {
        Self {
            rules,
            capabilities,
        }
    }

    fn override_active(&self, kind: ItemKind, viewer: PlayerId, config: &PlayerVisibilityConfig) -> bool {
        config.overrides(kind) && self.capabilities.can_override(kind, viewer)
    }

    fn hidden(&self, kind: ItemKind, viewer: PlayerId, config: &PlayerVisibilityConfig) -> bool {
        if self.override_active(kind, viewer, config) {
            return false;
        }
        self.rules.is_globally_hidden(kind) || config.hides(kind)
    }

    /// Resolves every toggle for `viewer`.
    #[must_use]
    pub fn policy(&self, viewer: PlayerId, config: &PlayerVisibilityConfig) -> ViewerPolicy {
        let poi_override = self.override_active(ItemKind::Poi, viewer, config);

        let mut block_list = Vec::new();
        if !poi_override {
            block_list.extend(self.rules.hidden_poi_names.iter().map(|n| normalize(n)));
        }
        block_list.extend(config.hidden_poi_names.iter().map(|n| normalize(n)));
        block_list.retain(|entry| !entry.is_empty());

        let hide_other_warps = self.capabilities.has_warp_ownership()
            && self.hidden(ItemKind::Warps, viewer, config);

        ViewerPolicy {
            viewer,
            hide_all_poi: self.hidden(ItemKind::Poi, viewer, config),
            block_list,
            hide_unexplored: self.hidden(ItemKind::UnexploredPoi, viewer, config),
            hide_death: self.hidden(ItemKind::Death, viewer, config),
            hide_spawn: self.hidden(ItemKind::Spawn, viewer, config),
            hide_other_warps,
            hide_players: self.hidden(ItemKind::Players, viewer, config),
        }
    }

    /// Whether `marker` is shown under `policy`.
    ///
    /// `explored` is the set consulted by the unexplored gate. With the gate
    /// active and no set available, positioned POIs are hidden.
    #[must_use]
    pub fn is_visible(
        &self,
        marker: &MapMarkerRef,
        policy: &ViewerPolicy,
        explored: Option<&dyn ExploredLookup>,
    ) -> bool {
        match &marker.category {
            MarkerCategory::Poi => {
                if policy.hide_all_poi || marker.matches_any(&policy.block_list) {
                    return false;
                }
                if !policy.hide_unexplored {
                    return true;
                }
                match (marker.position, explored) {
                    (None, _) => true,
                    (Some(pos), Some(set)) => set.is_explored(pos.chunk_key()),
                    (Some(_), None) => false,
                }
            }
            MarkerCategory::Spawn => !policy.hide_spawn,
            MarkerCategory::Death => !policy.hide_death,
            MarkerCategory::Warp { name } => {
                if !policy.hide_other_warps {
                    return true;
                }
                let owner = self
                    .capabilities
                    .warp_ownership()
                    .and_then(|ownership| ownership.owner_of(name));
                owner.map_or(true, |owner| owner == policy.viewer)
            }
            MarkerCategory::Player { id } => *id == policy.viewer || !policy.hide_players,
        }
    }

    /// Markers visible to `viewer`, in input order.
    #[must_use]
    pub fn filter<'m>(
        &self,
        markers: &'m [MapMarkerRef],
        viewer: PlayerId,
        config: &PlayerVisibilityConfig,
        explored: Option<&dyn ExploredLookup>,
    ) -> Vec<&'m MapMarkerRef> {
        let policy = self.policy(viewer, config);
        markers
            .iter()
            .filter(|marker| self.is_visible(marker, &policy, explored))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::{PermissionOracle, WarpOwnership};
    use crate::marker::MarkerPosition;
    use fogmap_core::{ChunkKey, ExplorationSet};
    use std::collections::HashSet;
    use std::sync::Arc;

    struct Grant(&'static [ItemKind]);

    impl PermissionOracle for Grant {
        fn can_override(&self, kind: ItemKind, _player: PlayerId) -> bool {
            self.0.contains(&kind)
        }
    }

    struct Owners;

    impl WarpOwnership for Owners {
        fn is_available(&self) -> bool {
            true
        }

        fn owner_of(&self, warp_name: &str) -> Option<PlayerId> {
            match warp_name {
                "mine" => Some(PlayerId(1)),
                "theirs" => Some(PlayerId(2)),
                _ => None,
            }
        }
    }

    fn poi(name: &str, x: f64, z: f64) -> MapMarkerRef {
        MapMarkerRef::poi(name, name, MarkerPosition::new(x, 64.0, z))
    }

    #[test]
    fn test_defaults_show_everything() {
        let rules = VisibilityRules::default();
        let caps = Capabilities::default();
        let filter = PrivacyFilter::new(&rules, &caps);
        let markers = vec![
            poi("a", 0.0, 0.0),
            poi("b", 500.0, 500.0).with_category(MarkerCategory::Spawn),
            poi("c", 0.0, 0.0).with_category(MarkerCategory::Death),
        ];
        let shown = filter.filter(&markers, PlayerId(1), &PlayerVisibilityConfig::default(), None);
        assert_eq!(shown.len(), 3);
    }

    #[test]
    fn test_personal_hide_all_applies_to_viewer_only() {
        let rules = VisibilityRules::default();
        let caps = Capabilities::default();
        let filter = PrivacyFilter::new(&rules, &caps);
        let markers = vec![poi("a", 0.0, 0.0)];

        let hiding = PlayerVisibilityConfig {
            hide_all_poi_on_map: true,
            ..PlayerVisibilityConfig::default()
        };
        assert!(filter.filter(&markers, PlayerId(1), &hiding, None).is_empty());
        assert_eq!(
            filter
                .filter(&markers, PlayerId(2), &PlayerVisibilityConfig::default(), None)
                .len(),
            1
        );
    }

    #[test]
    fn test_unexplored_gate_uses_given_set() {
        let rules = VisibilityRules {
            hide_unexplored_poi_on_map: true,
            ..VisibilityRules::default()
        };
        let caps = Capabilities::default();
        let filter = PrivacyFilter::new(&rules, &caps);

        let explored = ExplorationSet::in_memory();
        explored.mark_chunk(ChunkKey::pack(0, 0));

        let mut unpositioned = poi("floating", 0.0, 0.0);
        unpositioned.position = None;
        let markers = vec![poi("near", 5.0, 5.0), poi("far", 100.0, 100.0), unpositioned];

        let config = PlayerVisibilityConfig::default();
        let shown: Vec<&str> = filter
            .filter(&markers, PlayerId(1), &config, Some(&explored))
            .into_iter()
            .map(|m| m.id.as_str())
            .collect();
        assert_eq!(shown, vec!["near", "floating"]);

        // No set: positioned POIs are hidden
        let none = filter.filter(&markers, PlayerId(1), &config, None);
        assert_eq!(none.len(), 1);

        // Pooled snapshots work the same
        let pooled: HashSet<ChunkKey> = [ChunkKey::pack(6, 6)].into_iter().collect();
        let shown_pooled = filter.filter(&markers, PlayerId(1), &config, Some(&pooled));
        assert_eq!(shown_pooled.len(), 2);
    }

    #[test]
    fn test_unexplored_override_needs_its_own_permission() {
        let rules = VisibilityRules {
            hide_unexplored_poi_on_map: true,
            ..VisibilityRules::default()
        };
        let config = PlayerVisibilityConfig {
            override_global_poi_hide: true,
            ..PlayerVisibilityConfig::default()
        };

        let poi_only = Capabilities::new(Arc::new(Grant(&[ItemKind::Poi])));
        assert!(PrivacyFilter::new(&rules, &poi_only).policy(PlayerId(1), &config).hide_unexplored);

        let both = Capabilities::new(Arc::new(Grant(&[ItemKind::Poi, ItemKind::UnexploredPoi])));
        assert!(!PrivacyFilter::new(&rules, &both).policy(PlayerId(1), &config).hide_unexplored);
    }

    #[test]
    fn test_other_warps_by_owner() {
        let rules = VisibilityRules {
            hide_other_warps_on_map: true,
            ..VisibilityRules::default()
        };
        let warp = |name: &str| {
            poi(name, 0.0, 0.0).with_category(MarkerCategory::Warp {
                name: name.to_owned(),
            })
        };
        let markers = vec![warp("mine"), warp("theirs"), warp("unknown")];
        let config = PlayerVisibilityConfig::default();

        let caps = Capabilities::default().with_warp_ownership(Arc::new(Owners));
        let shown: Vec<&str> = PrivacyFilter::new(&rules, &caps)
            .filter(&markers, PlayerId(1), &config, None)
            .into_iter()
            .map(|m| m.id.as_str())
            .collect();
        assert_eq!(shown, vec!["mine", "unknown"]);

        // Without ownership the feature is off
        let no_caps = Capabilities::default();
        assert_eq!(
            PrivacyFilter::new(&rules, &no_caps)
                .filter(&markers, PlayerId(1), &config, None)
                .len(),
            3
        );
    }

    #[test]
    fn test_own_player_marker_never_hidden() {
        let rules = VisibilityRules {
            hide_players_on_map: true,
            ..VisibilityRules::default()
        };
        let caps = Capabilities::default();
        let player = |id: u64| {
            poi(&id.to_string(), 0.0, 0.0).with_category(MarkerCategory::Player { id: PlayerId(id) })
        };
        let markers = vec![player(1), player(2)];

        let shown = PrivacyFilter::new(&rules, &caps).filter(
            &markers,
            PlayerId(1),
            &PlayerVisibilityConfig::default(),
            None,
        );
        assert_eq!(shown.len(), 1);
        assert_eq!(shown[0].id, "1");
    }

    #[test]
    fn test_death_and_spawn_overrides() {
        let rules = VisibilityRules {
            hide_death_marker_on_map: true,
            hide_spawn_on_map: true,
            ..VisibilityRules::default()
        };
        let caps = Capabilities::new(Arc::new(Grant(&[ItemKind::Death])));
        let config = PlayerVisibilityConfig {
            override_global_death_hide: true,
            override_global_spawn_hide: true,
            ..PlayerVisibilityConfig::default()
        };

        let policy = PrivacyFilter::new(&rules, &caps).policy(PlayerId(1), &config);
        assert!(!policy.hide_death);
        // Flag without permission does nothing
        assert!(policy.hide_spawn);
    }
}
