//! In-process fakes of the host collaborators.

#![allow(dead_code)]

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;

use fogmap::{
    Collaborators, ConfigHandle, ExplorationService, FogmapError, FogmapResult, MapConfig,
    MapSettings, MarkerRegistry, Position, PositionSource, TransportSink, WorldDirectory,
    WorldHost, WorldTask,
};
use fogmap_core::{ChunkKey, PlayerId};
use fogmap_privacy::{Capabilities, MapMarkerRef, PlayerConfigs};
use parking_lot::Mutex;

pub fn temp_dir(label: &str) -> PathBuf {
    static COUNTER: AtomicU32 = AtomicU32::new(0);
    let n = COUNTER.fetch_add(1, Ordering::Relaxed);
    let dir = std::env::temp_dir().join(format!(
        "fogmap_it_{label}_{}_{n}",
        std::process::id()
    ));
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

#[derive(Default)]
pub struct FakePositions {
    positions: Mutex<HashMap<PlayerId, Position>>,
}

impl FakePositions {
    pub fn set(&self, player: PlayerId, x: f64, z: f64) {
        self.positions.lock().insert(player, Position::new(x, 64.0, z));
    }
}

impl PositionSource for FakePositions {
    fn position(&self, player: PlayerId) -> Option<Position> {
        self.positions.lock().get(&player).copied()
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Sent {
    Load(String, PlayerId, Vec<ChunkKey>),
    Unload(String, PlayerId, Vec<ChunkKey>),
    Settings(String, PlayerId, MapSettings),
}

#[derive(Default)]
pub struct FakeTransport {
    pub sent: Mutex<Vec<Sent>>,
}

impl FakeTransport {
    pub fn loaded_for(&self, viewer: PlayerId) -> usize {
        self.sent
            .lock()
            .iter()
            .map(|s| match s {
                Sent::Load(_, p, tiles) if *p == viewer => tiles.len(),
                _ => 0,
            })
            .sum()
    }

    pub fn settings_for(&self, viewer: PlayerId) -> Vec<MapSettings> {
        self.sent
            .lock()
            .iter()
            .filter_map(|s| match s {
                Sent::Settings(_, p, settings) if *p == viewer => Some(*settings),
                _ => None,
            })
            .collect()
    }
}

impl TransportSink for FakeTransport {
    fn load_tiles(&self, world: &str, viewer: PlayerId, tiles: &[ChunkKey]) {
        self.sent
            .lock()
            .push(Sent::Load(world.to_owned(), viewer, tiles.to_vec()));
    }

    fn unload_tiles(&self, world: &str, viewer: PlayerId, tiles: &[ChunkKey]) {
        self.sent
            .lock()
            .push(Sent::Unload(world.to_owned(), viewer, tiles.to_vec()));
    }

    fn send_settings(&self, world: &str, viewer: PlayerId, settings: &MapSettings) {
        self.sent
            .lock()
            .push(Sent::Settings(world.to_owned(), viewer, *settings));
    }
}

/// World that runs tasks inline on the caller's thread.
pub struct FakeWorld {
    name: String,
    accepting: AtomicBool,
    players: Mutex<Vec<PlayerId>>,
    pub applied: Mutex<Vec<MapSettings>>,
}

impl FakeWorld {
    pub fn new(name: &str, players: &[PlayerId]) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_owned(),
            accepting: AtomicBool::new(true),
            players: Mutex::new(players.to_vec()),
            applied: Mutex::new(Vec::new()),
        })
    }

    pub fn set_accepting(&self, accepting: bool) {
        self.accepting.store(accepting, Ordering::SeqCst);
    }
}

impl WorldHost for FakeWorld {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_accepting_tasks(&self) -> bool {
        self.accepting.load(Ordering::SeqCst)
    }

    fn execute(&self, task: WorldTask) -> FogmapResult<()> {
        if !self.is_accepting_tasks() {
            return Err(FogmapError::WorldUnavailable(self.name.clone()));
        }
        task();
        Ok(())
    }

    fn players(&self) -> Vec<PlayerId> {
        self.players.lock().clone()
    }

    fn apply_settings(&self, settings: &MapSettings) {
        self.applied.lock().push(*settings);
    }
}

#[derive(Default)]
pub struct FakeWorlds {
    pub worlds: Mutex<Vec<Arc<FakeWorld>>>,
}

impl FakeWorlds {
    pub fn with(worlds: &[Arc<FakeWorld>]) -> Arc<Self> {
        Arc::new(Self {
            worlds: Mutex::new(worlds.to_vec()),
        })
    }
}

impl WorldDirectory for FakeWorlds {
    fn worlds(&self) -> Vec<Arc<dyn WorldHost>> {
        self.worlds
            .lock()
            .iter()
            .map(|w| Arc::clone(w) as Arc<dyn WorldHost>)
            .collect()
    }
}

#[derive(Default)]
pub struct FakeMarkers {
    pub markers: Mutex<HashMap<String, Vec<MapMarkerRef>>>,
}

impl MarkerRegistry for FakeMarkers {
    fn markers(&self, world: &str) -> Vec<MapMarkerRef> {
        self.markers.lock().get(world).cloned().unwrap_or_default()
    }
}

pub struct Harness {
    pub dir: PathBuf,
    pub positions: Arc<FakePositions>,
    pub transport: Arc<FakeTransport>,
    pub service: Arc<ExplorationService>,
}

impl Harness {
    pub fn new(label: &str, config: MapConfig, capabilities: Capabilities) -> Self {
        let dir = temp_dir(label);
        let handle = Arc::new(ConfigHandle::with_config(dir.join("config.toml"), config));
        let positions = Arc::new(FakePositions::default());
        let transport = Arc::new(FakeTransport::default());
        let collaborators = Collaborators {
            positions: Arc::clone(&positions) as Arc<dyn PositionSource>,
            transport: Arc::clone(&transport) as Arc<dyn TransportSink>,
            persistence: None,
            capabilities,
        };
        let service = Arc::new(ExplorationService::new(
            handle,
            Arc::new(PlayerConfigs::new()),
            collaborators,
        ));

        Self {
            dir,
            positions,
            transport,
            service,
        }
    }
}

impl Drop for Harness {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.dir);
    }
}
