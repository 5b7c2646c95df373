//! # Command Surface Integration Test
//!
//! Settings display, reload, quality changes and personal toggles with
//! their override resolution.

mod common;

use std::sync::Arc;

use common::{FakeWorld, FakeWorlds, Harness};
use fogmap::{
    FogmapError, MapCommands, MapConfig, MapQuality, PlayerConfigFile, WorldDirectory,
};
use fogmap_core::PlayerId;
use fogmap_privacy::{
    Capabilities, ItemKind, PermissionOracle, PrivacyError, ToggleKind, VisibilityRules,
    WarpOwnership,
};

struct AllowOverrides;

impl PermissionOracle for AllowOverrides {
    fn can_override(&self, _kind: ItemKind, _player: PlayerId) -> bool {
        true
    }
}

struct Warps;

impl WarpOwnership for Warps {
    fn is_available(&self) -> bool {
        true
    }

    fn owner_of(&self, _warp_name: &str) -> Option<PlayerId> {
        None
    }
}

fn map_commands(harness: &Harness, worlds: &[Arc<FakeWorld>]) -> MapCommands {
    MapCommands::new(
        Arc::clone(&harness.service),
        FakeWorlds::with(worlds) as Arc<dyn WorldDirectory>,
    )
}

fn spawn_hidden_config() -> MapConfig {
    MapConfig {
        visibility: VisibilityRules {
            hide_spawn_on_map: true,
            ..VisibilityRules::default()
        },
        ..MapConfig::default()
    }
}

/// Test: an unknown quality is rejected and nothing changes.
#[test]
fn test_invalid_quality_is_rejected() {
    let harness = Harness::new("badq", MapConfig::default(), Capabilities::default());
    let commands = map_commands(&harness, &[]);

    let err = commands.set_quality("ultra").unwrap_err();
    assert!(matches!(err, FogmapError::InvalidQuality(ref v) if v == "ultra"));
    assert_eq!(harness.service.config().configured_quality(), MapQuality::Medium);
}

/// Test: a new quality is stored but only applies after restart.
#[test]
fn test_quality_change_pending_restart() {
    let harness = Harness::new("quality", MapConfig::default(), Capabilities::default());
    let commands = map_commands(&harness, &[]);

    let lines = commands.set_quality(" HIGH ").unwrap();
    assert_eq!(lines[0], "Map quality set to: HIGH");
    assert_eq!(
        lines[1],
        "WARNING: Map Quality change pending restart (Active: MEDIUM)"
    );
    assert_eq!(harness.service.config().active_quality(), MapQuality::Medium);
    assert_eq!(
        harness.service.planner().capacity(),
        MapQuality::Medium.max_tiles()
    );

    let settings = commands.settings();
    assert!(settings.contains(&"Map Quality: HIGH".to_owned()));
    assert!(settings
        .iter()
        .any(|l| l == "Map Quality change pending restart (Active: MEDIUM)"));

    let lines = commands.set_quality("medium").unwrap();
    assert_eq!(lines, vec!["Map quality set to: MEDIUM".to_owned()]);
}

/// Test: reload picks up file changes and pushes settings to open worlds.
#[test]
fn test_reload_pushes_settings_to_worlds() {
    let harness = Harness::new("reload", MapConfig::default(), Capabilities::default());
    let player = PlayerId(1);
    let open = FakeWorld::new("open", &[player]);
    let closed = FakeWorld::new("closed", &[PlayerId(2)]);
    closed.set_accepting(false);
    let commands = map_commands(&harness, &[Arc::clone(&open), Arc::clone(&closed)]);

    let edited = MapConfig {
        min_scale: 20.0,
        max_scale: 128.0,
        ..MapConfig::default()
    };
    edited.save(harness.service.config().path()).unwrap();

    let lines = commands.reload().unwrap();
    assert_eq!(lines[0], "Map configuration reloaded!");
    assert!(lines.contains(&"Min Scale: 20".to_owned()));

    let applied = open.applied.lock().clone();
    assert_eq!(applied.len(), 1);
    assert!((applied[0].max_scale - 128.0).abs() < f32::EPSILON);
    assert!(closed.applied.lock().is_empty());
    assert_eq!(harness.transport.settings_for(player).len(), 1);
}

/// Test: a reloaded update rate is reported as pending until restart.
#[test]
fn test_reload_reports_update_rate_pending_restart() {
    let harness = Harness::new("rate", MapConfig::default(), Capabilities::default());
    let commands = map_commands(&harness, &[]);

    let lines = commands.reload().unwrap();
    assert!(lines.contains(&"Update Rate: 100 ms".to_owned()));
    assert!(!lines.iter().any(|l| l.starts_with("Update Rate change")));

    let edited = MapConfig {
        update_rate_ms: 250,
        ..MapConfig::default()
    };
    edited.save(harness.service.config().path()).unwrap();

    let lines = commands.reload().unwrap();
    assert!(lines.contains(&"Update Rate: 250 ms".to_owned()));
    assert!(lines.contains(&"Update Rate change pending restart (Active: 100 ms)".to_owned()));
    assert_eq!(harness.service.config().active_update_rate_ms(), 100);
    assert!(commands
        .settings()
        .contains(&"Update Rate change pending restart (Active: 100 ms)".to_owned()));
}

/// Test: a broken file keeps the current config.
#[test]
fn test_reload_failure_keeps_config() {
    let config = MapConfig {
        exploration_radius: 5,
        ..MapConfig::default()
    };
    let harness = Harness::new("badreload", config, Capabilities::default());
    std::fs::write(harness.service.config().path(), "exploration_radius = \"wide\"").unwrap();

    let commands = map_commands(&harness, &[]);
    assert!(matches!(
        commands.reload(),
        Err(FogmapError::ConfigParse { .. })
    ));
    assert_eq!(harness.service.config().get().exploration_radius, 5);
}

/// Test: without a global hide, toggles flip the personal flag.
#[test]
fn test_personal_toggle_round_trip() {
    let harness = Harness::new("personal", MapConfig::default(), Capabilities::default());
    let commands = map_commands(&harness, &[]);
    let player = PlayerId(3);

    let lines = commands.toggle(player, ToggleKind::Death).unwrap();
    assert_eq!(lines, vec!["Death markers are now HIDDEN for you.".to_owned()]);
    assert!(harness.service.player_configs().get(player).hides(ItemKind::Death));

    let lines = commands.toggle(player, ToggleKind::Death).unwrap();
    assert_eq!(lines, vec!["Death markers are now VISIBLE for you.".to_owned()]);

    let lines = commands.toggle(player, ToggleKind::Players).unwrap();
    assert_eq!(lines.len(), 2);
}

/// Test: a global hide refuses the toggle without the override permission.
#[test]
fn test_globally_hidden_without_permission() {
    let harness = Harness::new("noperm", spawn_hidden_config(), Capabilities::default());
    let commands = map_commands(&harness, &[]);

    let err = commands.toggle(PlayerId(4), ToggleKind::Spawn).unwrap_err();
    assert!(matches!(
        err,
        FogmapError::Privacy(PrivacyError::GloballyHidden(ToggleKind::Spawn))
    ));
    assert_eq!(
        err.to_string(),
        "Spawn markers are globally hidden by the server"
    );
    assert!(!harness
        .service
        .player_configs()
        .get(PlayerId(4))
        .overrides(ItemKind::Spawn));
}

/// Test: a permitted player flips the override instead of the hide.
#[test]
fn test_globally_hidden_with_permission_flips_override() {
    let harness = Harness::new(
        "perm",
        spawn_hidden_config(),
        Capabilities::new(Arc::new(AllowOverrides)),
    );
    let commands = map_commands(&harness, &[]);
    let player = PlayerId(5);

    let lines = commands.toggle(player, ToggleKind::Spawn).unwrap();
    assert_eq!(
        lines,
        vec![
            "Spawn markers are now VISIBLE for you.".to_owned(),
            "Override enabled; global hide is ignored.".to_owned(),
        ]
    );
    assert!(harness.service.player_configs().get(player).overrides(ItemKind::Spawn));

    let lines = commands.toggle(player, ToggleKind::Spawn).unwrap();
    assert_eq!(lines[1], "Override disabled; global hide is applied.");
}

/// Test: other-warps needs the ownership integration.
#[test]
fn test_other_warps_requires_ownership() {
    let harness = Harness::new("warps", MapConfig::default(), Capabilities::default());
    let commands = map_commands(&harness, &[]);
    let err = commands.toggle(PlayerId(6), ToggleKind::OtherWarps).unwrap_err();
    assert!(matches!(
        err,
        FogmapError::Privacy(PrivacyError::FeatureUnavailable { .. })
    ));

    let harness = Harness::new(
        "warps_ok",
        MapConfig::default(),
        Capabilities::default().with_warp_ownership(Arc::new(Warps)),
    );
    let commands = map_commands(&harness, &[]);
    assert!(commands.toggle(PlayerId(6), ToggleKind::OtherWarps).is_ok());
}

/// Test: personal toggles are written to the player file.
#[test]
fn test_toggle_saves_player_file() {
    let harness = Harness::new("pfile", MapConfig::default(), Capabilities::default());
    let file = PlayerConfigFile::in_dir(&harness.dir);
    let commands = map_commands(&harness, &[]).with_player_file(file.clone());

    commands.toggle(PlayerId(77), ToggleKind::AllPoi).unwrap();

    let stored = file.load().unwrap();
    assert!(stored[&PlayerId(77)].hides(ItemKind::Poi));
}

/// Test: the admin spawn toggle flips the global flag and saves it.
#[test]
fn test_admin_spawn_toggle() {
    let harness = Harness::new("admin", MapConfig::default(), Capabilities::default());
    let commands = map_commands(&harness, &[]);

    let lines = commands.toggle_spawn().unwrap();
    assert_eq!(lines[0], "Hide Spawn Marker ENABLED");
    assert!(harness.service.config().visibility().hide_spawn_on_map);

    let saved = MapConfig::load(harness.service.config().path()).unwrap();
    assert!(saved.visibility.hide_spawn_on_map);

    let lines = commands.toggle_spawn().unwrap();
    assert_eq!(lines[0], "Hide Spawn Marker DISABLED");
}

/// Test: stats and reset report on the caller's exploration.
#[test]
fn test_stats_and_reset() {
    let harness = Harness::new("stats", MapConfig::default(), Capabilities::default());
    let commands = map_commands(&harness, &[]);
    let player = PlayerId(9);

    assert_eq!(
        commands.stats("overworld", player),
        vec!["No exploration data for this world.".to_owned()]
    );

    harness.positions.set(player, 0.0, 0.0);
    harness.service.update_player("overworld", player).unwrap();
    let lines = commands.stats("overworld", player);
    assert!(lines.iter().any(|l| l.starts_with("Chunks Explored: ")));

    let _ = commands.reset("overworld", player);
    assert!(commands
        .stats("overworld", player)
        .contains(&"Chunks Explored: 0".to_owned()));
}
