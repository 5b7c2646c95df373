//! # Map Configuration
//!
//! The server-wide config file and the per-player visibility file, both TOML.
//!
//! ## Example `config.toml`
//!
//! ```toml
//! exploration_radius = 16
//! update_rate_ms = 100
//! map_quality = "medium"
//! min_scale = 10.0
//! max_scale = 256.0
//! hide_unexplored_poi_on_map = true
//! hidden_poi_names = ["Old Mine"]
//! ```
//!
//! Every key is optional. A missing file is created with defaults.
//!
//! ## Failure Policy
//!
//! Load and save failures are logged and returned, but the value held by
//! [`ConfigHandle`] is only replaced by a successfully parsed file. A broken
//! edit on disk never takes down a running server.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use fogmap_core::PlayerId;
use fogmap_privacy::{PlayerVisibilityConfig, VisibilityRules};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::error::{FogmapError, FogmapResult};
use crate::quality::MapQuality;

/// Config file name inside the config directory.
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// Player visibility file name inside the config directory.
pub const PLAYER_CONFIG_FILE_NAME: &str = "players.toml";

/// Server-wide map settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MapConfig {
    /// Reveal radius around each player, in chunks.
    pub exploration_radius: i32,
    /// Scheduler period in milliseconds.
    pub update_rate_ms: u64,
    /// Quality tier. Takes effect on restart.
    pub map_quality: MapQuality,
    /// Smallest map zoom.
    pub min_scale: f32,
    /// Largest map zoom.
    pub max_scale: f32,
    /// Global visibility toggles.
    #[serde(flatten)]
    pub visibility: VisibilityRules,
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            exploration_radius: 16,
            update_rate_ms: 100,
            map_quality: MapQuality::Medium,
            min_scale: 10.0,
            max_scale: 256.0,
            visibility: VisibilityRules::default(),
        }
    }
}

impl MapConfig {
    /// Reads and parses a config file.
    ///
    /// # Errors
    ///
    /// Returns [`FogmapError::ConfigIo`] or [`FogmapError::ConfigParse`].
    pub fn load(path: &Path) -> FogmapResult<Self> {
        let text = fs::read_to_string(path).map_err(|e| FogmapError::io(path, e))?;
        toml::from_str(&text).map_err(|source| FogmapError::ConfigParse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Writes this config to `path`.
    ///
    /// # Errors
    ///
    /// Returns [`FogmapError::ConfigSerialize`] or [`FogmapError::ConfigIo`].
    pub fn save(&self, path: &Path) -> FogmapResult<()> {
        let text = toml::to_string_pretty(self)?;
        fs::write(path, text).map_err(|e| FogmapError::io(path, e))
    }
}

/// Zoom and resolution pushed to worlds and clients.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MapSettings {
    /// Smallest map zoom.
    pub min_scale: f32,
    /// Largest map zoom.
    pub max_scale: f32,
    /// Image scale of the active quality tier.
    pub image_scale: f32,
}

/// Result of a quality change request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct QualityChange {
    /// Tier now stored in the config file.
    pub configured: MapQuality,
    /// Tier in use until restart.
    pub active: MapQuality,
}

impl QualityChange {
    /// Whether a restart is needed for the change to apply.
    #[inline]
    #[must_use]
    pub fn pending_restart(&self) -> bool {
        self.configured != self.active
    }
}

/// Long-lived owner of the map config.
///
/// Readers take a short read lock; writers mutate in memory, release the
/// lock, then save.
#[derive(Debug)]
pub struct ConfigHandle {
    path: PathBuf,
    config: RwLock<MapConfig>,
    active_quality: MapQuality,
    active_update_rate_ms: u64,
}

impl ConfigHandle {
    /// Opens `dir/config.toml`, creating the directory and a default file if
    /// needed. Failures are logged and defaults are used.
    #[must_use]
    pub fn initialize(dir: &Path) -> Self {
        let path = dir.join(CONFIG_FILE_NAME);

        let config = match Self::load_or_create(dir, &path) {
            Ok(config) => config,
            Err(e) => {
                tracing::error!(error = %e, "failed to initialize configuration, using defaults");
                MapConfig::default()
            }
        };

        Self::with_config(path, config)
    }

    fn load_or_create(dir: &Path, path: &Path) -> FogmapResult<MapConfig> {
        fs::create_dir_all(dir).map_err(|e| FogmapError::io(dir, e))?;

        if path.exists() {
            let config = MapConfig::load(path)?;
            tracing::info!(path = %path.display(), "configuration loaded");
            Ok(config)
        } else {
            let config = MapConfig::default();
            config.save(path)?;
            tracing::info!(path = %path.display(), "default configuration written");
            Ok(config)
        }
    }

    /// Wraps an already-loaded config. The active quality and update rate
    /// are taken from it.
    #[must_use]
    pub fn with_config(path: PathBuf, config: MapConfig) -> Self {
        let active_quality = config.map_quality;
        let active_update_rate_ms = config.update_rate_ms;
        Self {
            path,
            config: RwLock::new(config),
            active_quality,
            active_update_rate_ms,
        }
    }

    /// Path of the config file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Copy of the current config.
    #[must_use]
    pub fn get(&self) -> MapConfig {
        self.config.read().clone()
    }

    /// Runs `f` against the current config under the read lock.
    pub fn read<R>(&self, f: impl FnOnce(&MapConfig) -> R) -> R {
        f(&self.config.read())
    }

    /// Copy of the global visibility rules.
    #[must_use]
    pub fn visibility(&self) -> VisibilityRules {
        self.config.read().visibility.clone()
    }

    /// Tier fixed at startup, used by the planner and for image scale.
    #[inline]
    #[must_use]
    pub fn active_quality(&self) -> MapQuality {
        self.active_quality
    }

    /// Update period fixed at startup. The scheduler timer keeps this period
    /// until restart, whatever a reload reads.
    #[inline]
    #[must_use]
    pub fn active_update_rate_ms(&self) -> u64 {
        self.active_update_rate_ms
    }

    /// Tier stored in the config file.
    #[must_use]
    pub fn configured_quality(&self) -> MapQuality {
        self.config.read().map_quality
    }

    /// Zoom and image scale to push to clients.
    #[must_use]
    pub fn map_settings(&self) -> MapSettings {
        let config = self.config.read();
        MapSettings {
            min_scale: config.min_scale,
            max_scale: config.max_scale,
            image_scale: self.active_quality.image_scale(),
        }
    }

    /// Re-reads the file. On failure the current config is kept.
    ///
    /// # Errors
    ///
    /// Returns the load error after logging it.
    pub fn reload(&self) -> FogmapResult<()> {
        match MapConfig::load(&self.path) {
            Ok(config) => {
                *self.config.write() = config;
                tracing::info!(path = %self.path.display(), "configuration reloaded");
                Ok(())
            }
            Err(e) => {
                tracing::warn!(error = %e, "reload failed, keeping current configuration");
                Err(e)
            }
        }
    }

    /// Writes the current config to disk.
    ///
    /// # Errors
    ///
    /// Returns the save error after logging it.
    pub fn save(&self) -> FogmapResult<()> {
        let snapshot = self.get();
        snapshot.save(&self.path).map_err(|e| {
            tracing::error!(error = %e, "failed to save configuration");
            e
        })?;
        tracing::info!(path = %self.path.display(), "configuration saved");
        Ok(())
    }

    /// Mutates the config in memory and saves it.
    ///
    /// The in-memory change stands even if the save fails.
    ///
    /// # Errors
    ///
    /// Returns the save error.
    pub fn update<R>(&self, f: impl FnOnce(&mut MapConfig) -> R) -> FogmapResult<R> {
        let result = f(&mut self.config.write());
        self.save()?;
        Ok(result)
    }

    /// Stores a new quality tier. It applies after restart.
    ///
    /// # Errors
    ///
    /// Returns the save error; the new tier is still held in memory.
    pub fn set_quality(&self, quality: MapQuality) -> FogmapResult<QualityChange> {
        self.update(|config| config.map_quality = quality)?;
        let change = QualityChange {
            configured: quality,
            active: self.active_quality,
        };
        tracing::info!(
            configured = %change.configured,
            active = %change.active,
            pending_restart = change.pending_restart(),
            "map quality changed"
        );
        Ok(change)
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct PlayerConfigDocument {
    #[serde(default)]
    players: BTreeMap<String, PlayerVisibilityConfig>,
}

/// Per-player visibility settings on disk, keyed by player id.
#[derive(Clone, Debug)]
pub struct PlayerConfigFile {
    path: PathBuf,
}

impl PlayerConfigFile {
    /// File at `dir/players.toml`.
    #[must_use]
    pub fn in_dir(dir: &Path) -> Self {
        Self {
            path: dir.join(PLAYER_CONFIG_FILE_NAME),
        }
    }

    /// File at an explicit path.
    #[must_use]
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Path of the file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads every stored config. A missing file is an empty table; entries
    /// with an unreadable id are skipped.
    ///
    /// # Errors
    ///
    /// Returns [`FogmapError::ConfigIo`] or [`FogmapError::ConfigParse`].
    pub fn load(&self) -> FogmapResult<BTreeMap<PlayerId, PlayerVisibilityConfig>> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }

        let text = fs::read_to_string(&self.path).map_err(|e| FogmapError::io(&self.path, e))?;
        let document: PlayerConfigDocument =
            toml::from_str(&text).map_err(|source| FogmapError::ConfigParse {
                path: self.path.clone(),
                source,
            })?;

        let mut configs = BTreeMap::new();
        for (key, config) in document.players {
            match key.parse::<u64>() {
                Ok(id) => {
                    configs.insert(PlayerId(id), config);
                }
                Err(_) => tracing::warn!(key = %key, "skipping player config with invalid id"),
            }
        }
        Ok(configs)
    }

    /// Writes every config.
    ///
    /// # Errors
    ///
    /// Returns [`FogmapError::ConfigSerialize`] or [`FogmapError::ConfigIo`].
    pub fn save(&self, configs: &BTreeMap<PlayerId, PlayerVisibilityConfig>) -> FogmapResult<()> {
        let document = PlayerConfigDocument {
            players: configs
                .iter()
                .map(|(id, config)| (id.0.to_string(), config.clone()))
                .collect(),
        };
        let text = toml::to_string_pretty(&document)?;
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| FogmapError::io(parent, e))?;
        }
        fs::write(&self.path, text).map_err(|e| FogmapError::io(&self.path, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn temp_dir(label: &str) -> PathBuf {
        static COUNTER: AtomicU32 = AtomicU32::new(0);
        let n = COUNTER.fetch_add(1, Ordering::Relaxed);
        let dir = std::env::temp_dir().join(format!(
            "fogmap_config_{label}_{}_{n}",
            std::process::id()
        ));
        let _ = fs::remove_dir_all(&dir);
        dir
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let config: MapConfig =
            toml::from_str("exploration_radius = 4\nhide_players_on_map = true").unwrap();
        assert_eq!(config.exploration_radius, 4);
        assert_eq!(config.update_rate_ms, 100);
        assert_eq!(config.map_quality, MapQuality::Medium);
        assert!(config.visibility.hide_players_on_map);
        assert!(!config.visibility.hide_spawn_on_map);
    }

    #[test]
    fn test_initialize_writes_defaults() {
        let dir = temp_dir("init");
        let handle = ConfigHandle::initialize(&dir);
        assert!(handle.path().exists());
        assert_eq!(handle.get(), MapConfig::default());

        let reread = MapConfig::load(handle.path()).unwrap();
        assert_eq!(reread, MapConfig::default());
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_broken_reload_keeps_current() {
        let dir = temp_dir("reload");
        let handle = ConfigHandle::initialize(&dir);
        handle.update(|c| c.exploration_radius = 7).unwrap();

        fs::write(handle.path(), "exploration_radius = \"seven\"").unwrap();
        assert!(matches!(handle.reload(), Err(FogmapError::ConfigParse { .. })));
        assert_eq!(handle.get().exploration_radius, 7);

        fs::write(handle.path(), "exploration_radius = 9").unwrap();
        handle.reload().unwrap();
        assert_eq!(handle.get().exploration_radius, 9);
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_quality_change_is_pending_restart() {
        let dir = temp_dir("quality");
        let handle = ConfigHandle::initialize(&dir);

        let change = handle.set_quality(MapQuality::High).unwrap();
        assert!(change.pending_restart());
        assert_eq!(handle.active_quality(), MapQuality::Medium);
        assert_eq!(handle.configured_quality(), MapQuality::High);
        assert!((handle.map_settings().image_scale - 0.5).abs() < f32::EPSILON);

        let restarted = ConfigHandle::initialize(&dir);
        assert_eq!(restarted.active_quality(), MapQuality::High);
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_player_config_file_roundtrip() {
        let dir = temp_dir("players");
        let file = PlayerConfigFile::in_dir(&dir);
        assert!(file.load().unwrap().is_empty());

        let mut configs = BTreeMap::new();
        configs.insert(
            PlayerId(42),
            PlayerVisibilityConfig {
                hide_spawn_on_map: true,
                hidden_poi_names: vec!["mine".to_owned()],
                ..PlayerVisibilityConfig::default()
            },
        );
        file.save(&configs).unwrap();
        assert_eq!(file.load().unwrap(), configs);
        let _ = fs::remove_dir_all(&dir);
    }
}
