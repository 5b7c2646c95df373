//! # Map Markers
//!
//! Read-only view of markers owned by the host's marker registry.

use fogmap_core::{block_to_chunk, ChunkKey, PlayerId};

/// What a marker represents. Decides which toggle governs it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MarkerCategory {
    /// A named point of interest.
    Poi,
    /// The world spawn.
    Spawn,
    /// A death marker.
    Death,
    /// A warp, identified by name for ownership lookups.
    Warp {
        /// Warp name as known to the ownership integration.
        name: String,
    },
    /// A player.
    Player {
        /// The player shown.
        id: PlayerId,
    },
}

/// World position of a marker.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct MarkerPosition {
    /// World X.
    pub x: f64,
    /// World Y.
    pub y: f64,
    /// World Z.
    pub z: f64,
}

impl MarkerPosition {
    /// Creates a position.
    #[inline]
    #[must_use]
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Chunk containing this position.
    #[inline]
    #[must_use]
    pub fn chunk_key(&self) -> ChunkKey {
        ChunkKey::pack(block_to_chunk(self.x), block_to_chunk(self.z))
    }
}

/// A marker as seen by the filter.
#[derive(Clone, Debug, PartialEq)]
pub struct MapMarkerRef {
    /// Registry id.
    pub id: String,
    /// Display name, possibly with markup.
    pub name: String,
    /// Image key.
    pub image: String,
    /// World position. Markers without one are treated as explored.
    pub position: Option<MarkerPosition>,
    /// Category.
    pub category: MarkerCategory,
}

impl MapMarkerRef {
    /// Creates a POI marker.
    #[must_use]
    pub fn poi(id: impl Into<String>, name: impl Into<String>, position: MarkerPosition) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            image: String::new(),
            position: Some(position),
            category: MarkerCategory::Poi,
        }
    }

    /// Replaces the image key.
    #[must_use]
    pub fn with_image(mut self, image: impl Into<String>) -> Self {
        self.image = image.into();
        self
    }

    /// Replaces the category.
    #[must_use]
    pub fn with_category(mut self, category: MarkerCategory) -> Self {
        self.category = category;
        self
    }

    /// Whether any of name, id or image matches an already-normalized entry.
    /// Empty entries never match.
    #[must_use]
    pub fn matches_any(&self, normalized_entries: &[String]) -> bool {
        if normalized_entries.is_empty() {
            return false;
        }
        let name = normalize(&self.name);
        let id = normalize(&self.id);
        let image = normalize(&self.image);
        normalized_entries.iter().any(|entry| {
            !entry.is_empty() && (*entry == name || *entry == id || *entry == image)
        })
    }
}

/// Strips `<...>` markup, trims, and lowercases.
///
/// An unterminated `<` is kept as text.
#[must_use]
pub fn normalize(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(open) = rest.find('<') {
        match rest[open..].find('>') {
            Some(close) => {
                out.push_str(&rest[..open]);
                rest = &rest[open + close + 1..];
            }
            None => break,
        }
    }
    out.push_str(rest);

    out.trim().to_lowercase()
}
