//! # Command Surface
//!
//! Admin and player commands, independent of any command grammar. Every
//! command returns the lines to show the sender.
//!
//! | Command          | Who    | Effect                                          |
//! |------------------|--------|-------------------------------------------------|
//! | `settings`       | admin  | Show radius, scales and quality                 |
//! | `reload`         | admin  | Re-read config, push settings to every world    |
//! | `set_quality`    | admin  | Persist a tier; applies after restart           |
//! | `toggle_spawn`   | admin  | Flip the global spawn hide                      |
//! | `toggle`         | player | Personal hide / override for one [`ToggleKind`] |
//! | `stats`, `reset` | player | Exploration summary, forget exploration         |

use std::sync::Arc;

use fogmap_core::PlayerId;
use fogmap_privacy::{resolve_toggle, PlayerConfigs, ToggleKind};

use crate::config::PlayerConfigFile;
use crate::error::FogmapResult;
use crate::host::WorldDirectory;
use crate::quality::MapQuality;
use crate::scheduler::ExplorationScheduler;
use crate::service::ExplorationService;

/// Executes map commands against a running service.
pub struct MapCommands {
    service: Arc<ExplorationService>,
    worlds: Arc<dyn WorldDirectory>,
    player_file: Option<PlayerConfigFile>,
    scheduler: Option<Arc<ExplorationScheduler>>,
}

impl MapCommands {
    /// Creates the command surface. Personal toggles are kept in memory only
    /// until a player file is attached.
    #[must_use]
    pub fn new(service: Arc<ExplorationService>, worlds: Arc<dyn WorldDirectory>) -> Self {
        Self {
            service,
            worlds,
            player_file: None,
            scheduler: None,
        }
    }

    /// Persists personal toggles to `file`.
    #[must_use]
    pub fn with_player_file(mut self, file: PlayerConfigFile) -> Self {
        self.player_file = Some(file);
        self
    }

    /// Defers player-file saves onto `scheduler` while it runs.
    #[must_use]
    pub fn with_scheduler(mut self, scheduler: Arc<ExplorationScheduler>) -> Self {
        self.scheduler = Some(scheduler);
        self
    }

    /// Current settings.
    #[must_use]
    pub fn settings(&self) -> Vec<String> {
        let handle = self.service.config();
        let config = handle.get();
        let active = handle.active_quality();

        let mut lines = vec![
            "=== Map Settings ===".to_owned(),
            format!("Exploration Radius: {}", config.exploration_radius),
            format!("Min Scale: {}", config.min_scale),
            format!("Max Scale: {}", config.max_scale),
            format!("Map Quality: {}", config.map_quality),
        ];
        if config.map_quality != active {
            lines.push(format!("Map Quality change pending restart (Active: {active})"));
        }
        lines.extend(update_rate_lines(config.update_rate_ms, handle.active_update_rate_ms()));
        lines.push("Players must rejoin the server for map quality changes to take effect.".to_owned());
        lines
    }

    /// Re-reads the config and player files, then pushes map settings to
    /// every world that accepts work.
    ///
    /// # Errors
    ///
    /// Returns the config load error; the previous config stays in effect.
    pub fn reload(&self) -> FogmapResult<Vec<String>> {
        let handle = self.service.config();
        handle.reload()?;

        if let Some(file) = &self.player_file {
            match file.load() {
                Ok(configs) => self.service.player_configs().replace_all(configs),
                Err(e) => tracing::warn!(error = %e, "player visibility reload failed, keeping current"),
            }
        }

        for world in self.worlds.worlds() {
            let service = Arc::clone(&self.service);
            let target = Arc::clone(&world);
            if let Err(e) = world.execute(Box::new(move || service.push_settings(target.as_ref()))) {
                tracing::debug!(world = world.name(), error = %e, "settings push skipped");
            }
        }

        let config = handle.get();
        let mut lines = vec![
            "Map configuration reloaded!".to_owned(),
            format!("Exploration Radius: {}", config.exploration_radius),
            format!("Min Scale: {}", config.min_scale),
            format!("Max Scale: {}", config.max_scale),
        ];
        lines.extend(update_rate_lines(config.update_rate_ms, handle.active_update_rate_ms()));
        Ok(lines)
    }

    /// Stores a new quality tier by name.
    ///
    /// # Errors
    ///
    /// - [`crate::FogmapError::InvalidQuality`] for an unknown name; nothing changes.
    /// - The save error; the new tier is still held in memory.
    pub fn set_quality(&self, name: &str) -> FogmapResult<Vec<String>> {
        let quality: MapQuality = name.parse()?;
        let change = self.service.config().set_quality(quality)?;

        let mut lines = vec![format!("Map quality set to: {}", change.configured)];
        if change.pending_restart() {
            lines.push(format!(
                "WARNING: Map Quality change pending restart (Active: {})",
                change.active
            ));
        }
        Ok(lines)
    }

    /// Flips the server-wide spawn hide.
    ///
    /// # Errors
    ///
    /// Returns the save error; the flip still applies in memory.
    pub fn toggle_spawn(&self) -> FogmapResult<Vec<String>> {
        let hidden = self.service.config().update(|config| {
            config.visibility.hide_spawn_on_map = !config.visibility.hide_spawn_on_map;
            config.visibility.hide_spawn_on_map
        })?;

        Ok(if hidden {
            vec![
                "Hide Spawn Marker ENABLED".to_owned(),
                "The spawn marker is now hidden on the world map.".to_owned(),
            ]
        } else {
            vec![
                "Hide Spawn Marker DISABLED".to_owned(),
                "The spawn marker is now visible on the world map.".to_owned(),
            ]
        })
    }

    /// Toggles `kind` for `player`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::FogmapError::Privacy`] when the toggle is refused; the
    /// player's config is untouched.
    pub fn toggle(&self, player: PlayerId, kind: ToggleKind) -> FogmapResult<Vec<String>> {
        let rules = self.service.config().visibility();
        let capabilities = self.service.capabilities();
        let outcome = self.service.player_configs().update(player, |config| {
            resolve_toggle(kind, player, &rules, capabilities, config)
        })?;

        self.save_player_configs();

        let mut lines = vec![outcome.to_string()];
        lines.extend(outcome.override_note().map(str::to_owned));
        if kind == ToggleKind::Players {
            lines.push("Note: You may need to reopen the map to see changes.".to_owned());
        }
        Ok(lines)
    }

    /// Exploration summary of `player` in `world`.
    #[must_use]
    pub fn stats(&self, world: &str, player: PlayerId) -> Vec<String> {
        match self.service.stats(world, player) {
            Some(stats) => stats.to_string().lines().map(str::to_owned).collect(),
            None => vec!["No exploration data for this world.".to_owned()],
        }
    }

    /// Forgets `player`'s exploration in `world`.
    #[must_use]
    pub fn reset(&self, world: &str, player: PlayerId) -> Vec<String> {
        self.service.reset_player(world, player);
        vec!["Exploration data reset for this world.".to_owned()]
    }

    fn save_player_configs(&self) {
        let Some(file) = self.player_file.clone() else {
            return;
        };
        let configs = Arc::clone(self.service.player_configs());
        let save = move || save_logged(&file, &configs);

        match &self.scheduler {
            Some(scheduler) if scheduler.is_running() => {
                let fallback = save.clone();
                if !scheduler.schedule_once(save) {
                    fallback();
                }
            }
            _ => save(),
        }
    }
}

fn save_logged(file: &PlayerConfigFile, configs: &PlayerConfigs) {
    if let Err(e) = file.save(&configs.snapshot()) {
        tracing::warn!(error = %e, "failed to save player visibility settings");
    }
}

impl std::fmt::Debug for MapCommands {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MapCommands")
            .field("player_file", &self.player_file)
            .field("scheduler", &self.scheduler.is_some())
            .finish_non_exhaustive()
    }
}

/// Configured update rate, plus a pending-restart note while the running
/// timer still uses the startup period.
fn update_rate_lines(configured_ms: u64, active_ms: u64) -> Vec<String> {
    let mut lines = vec![format!("Update Rate: {configured_ms} ms")];
    if configured_ms != active_ms {
        lines.push(format!("Update Rate change pending restart (Active: {active_ms} ms)"));
    }
    lines
}
