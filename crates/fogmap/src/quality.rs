//! # Map Quality Tiers
//!
//! | Tier   | Tiles per plan | Image scale |
//! |--------|----------------|-------------|
//! | low    | 12,000         | 0.25        |
//! | medium | 6,000          | 0.5         |
//! | high   | 3,000          | 1.0         |
//!
//! Higher resolution images cost more per tile, so fewer are planned.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::FogmapError;

/// Named bundle of tile cap and image resolution.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MapQuality {
    /// Many small images.
    Low,
    /// The default.
    #[default]
    Medium,
    /// Few full-resolution images.
    High,
}

impl MapQuality {
    /// Every tier, lowest first.
    pub const ALL: [Self; 3] = [Self::Low, Self::Medium, Self::High];

    /// Maximum tiles in one plan.
    #[inline]
    #[must_use]
    pub const fn max_tiles(self) -> usize {
        match self {
            Self::Low => 12_000,
            Self::Medium => 6_000,
            Self::High => 3_000,
        }
    }

    /// Rendered image scale factor.
    #[inline]
    #[must_use]
    pub const fn image_scale(self) -> f32 {
        match self {
            Self::Low => 0.25,
            Self::Medium => 0.5,
            Self::High => 1.0,
        }
    }

    /// Lowercase name, as written in the config file.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

impl fmt::Display for MapQuality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_str().to_uppercase())
    }
}

impl FromStr for MapQuality {
    type Err = FogmapError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Self::ALL
            .into_iter()
            .find(|q| q.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| FogmapError::InvalidQuality(s.to_owned()))
    }
}
