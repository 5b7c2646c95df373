//! # Item Kinds
//!
//! The categories of map items a viewer can have hidden or revealed.

use std::fmt;

/// Marker categories with their own visibility toggle and override permission.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ItemKind {
    /// Named points of interest.
    Poi,
    /// Points of interest in chunks the viewer has not explored.
    UnexploredPoi,
    /// Death markers.
    Death,
    /// The world spawn marker.
    Spawn,
    /// Warps owned by other players.
    Warps,
    /// Other players.
    Players,
}

impl ItemKind {
    /// Every kind, in declaration order.
    pub const ALL: [Self; 6] = [
        Self::Poi,
        Self::UnexploredPoi,
        Self::Death,
        Self::Spawn,
        Self::Warps,
        Self::Players,
    ];

    /// Short stable name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Poi => "poi",
            Self::UnexploredPoi => "unexplored_poi",
            Self::Death => "death",
            Self::Spawn => "spawn",
            Self::Warps => "warps",
            Self::Players => "players",
        }
    }

    /// Permission node a host checks for the override on this kind.
    #[must_use]
    pub const fn permission_node(self) -> &'static str {
        match self {
            Self::Poi => "fogmap.override.poi",
            Self::UnexploredPoi => "fogmap.override.unexplored_poi",
            Self::Death => "fogmap.override.death",
            Self::Spawn => "fogmap.override.spawn",
            Self::Warps => "fogmap.override.warps",
            Self::Players => "fogmap.override.players",
        }
    }
}

impl fmt::Display for ItemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kinds a player can toggle for themselves.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ToggleKind {
    /// Hide every point of interest.
    AllPoi,
    /// Hide death markers.
    Death,
    /// Hide the spawn marker.
    Spawn,
    /// Hide warps owned by other players.
    OtherWarps,
    /// Hide other players.
    Players,
}

impl ToggleKind {
    /// Every toggle.
    pub const ALL: [Self; 5] = [
        Self::AllPoi,
        Self::Death,
        Self::Spawn,
        Self::OtherWarps,
        Self::Players,
    ];

    /// The item kind whose permission governs this toggle's override.
    #[must_use]
    pub const fn item_kind(self) -> ItemKind {
        match self {
            Self::AllPoi => ItemKind::Poi,
            Self::Death => ItemKind::Death,
            Self::Spawn => ItemKind::Spawn,
            Self::OtherWarps => ItemKind::Warps,
            Self::Players => ItemKind::Players,
        }
    }

    /// Plural noun used in player messages.
    #[must_use]
    pub const fn subject(self) -> &'static str {
        match self {
            Self::AllPoi => "POIs are",
            Self::Death => "Death markers are",
            Self::Spawn => "Spawn markers are",
            Self::OtherWarps => "Other players' warps are",
            Self::Players => "Other players are",
        }
    }
}

impl From<ToggleKind> for ItemKind {
    fn from(kind: ToggleKind) -> Self {
        kind.item_kind()
    }
}
