//! # Exploration Service
//!
//! Per-player pipeline from position to tile instructions.
//!
//! ```text
//!   position ──▶ chunk changed? ──no──▶ (nothing)
//!                     │ yes
//!                     ▼
//!        BoundaryTracker::update_boundaries (marks explored)
//!                     ▼
//!        VisibilityPlanner::plan (active quality cap)
//!                     ▼
//!        LoadSetManager::apply ──▶ unload, then load (priority order)
//! ```
//!
//! ## Locking
//!
//! - One record lock per player, held for that player's update only.
//! - One load-set lock per world.
//! - Config is read through short read locks; nothing is held across I/O.

use std::collections::HashMap;
use std::sync::Arc;

use fogmap_core::{
    ChunkCoord, ChunkKey, ExplorationRegistry, ExplorationStats, ExploredLookup, LoadSetManager, PlayerId,
    TileCenter, VisibilityPlanner,
};
use fogmap_privacy::{
    Capabilities, ExploredScope, MapMarkerRef, PlayerConfigs, PrivacyFilter,
};
use parking_lot::{Mutex, RwLock};

use crate::config::{ConfigHandle, MapSettings};
use crate::host::{
    ExplorationPersistence, MarkerRegistry, PositionSource, TransportSink, WorldHost,
};

/// Long-lived collaborators handed to the service at startup.
#[derive(Clone)]
pub struct Collaborators {
    /// Live player positions.
    pub positions: Arc<dyn PositionSource>,
    /// Tile and settings delivery.
    pub transport: Arc<dyn TransportSink>,
    /// Optional persisted exploration.
    pub persistence: Option<Arc<dyn ExplorationPersistence>>,
    /// Permission and warp ownership oracles.
    pub capabilities: Capabilities,
}

/// What one player update did.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct UpdateReport {
    /// Chunk the player is in.
    pub chunk: ChunkCoord,
    /// Tiles in the new plan.
    pub planned: usize,
    /// Tiles unloaded by the diff.
    pub unloaded: usize,
}

/// Totals for one world tick.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct WorldTickReport {
    /// Players visited.
    pub players: usize,
    /// Players whose chunk changed and were re-planned.
    pub replanned: usize,
    /// Tiles evicted by bulk sweeps.
    pub evicted: usize,
}

type WorldLoadSets = Mutex<HashMap<PlayerId, LoadSetManager>>;

/// Exploration tracking, planning and marker filtering for every world.
pub struct ExplorationService {
    config: Arc<ConfigHandle>,
    registry: ExplorationRegistry,
    planner: VisibilityPlanner,
    load_sets: RwLock<HashMap<String, Arc<WorldLoadSets>>>,
    player_configs: Arc<PlayerConfigs>,
    collaborators: Collaborators,
}

impl ExplorationService {
    /// Creates the service. The planner cap follows the config's active
    /// quality and does not change until restart.
    #[must_use]
    pub fn new(
        config: Arc<ConfigHandle>,
        player_configs: Arc<PlayerConfigs>,
        collaborators: Collaborators,
    ) -> Self {
        let planner = VisibilityPlanner::new(config.active_quality().max_tiles());
        Self {
            config,
            registry: ExplorationRegistry::new(),
            planner,
            load_sets: RwLock::new(HashMap::new()),
            player_configs,
            collaborators,
        }
    }

    /// Config handle.
    #[must_use]
    pub fn config(&self) -> &Arc<ConfigHandle> {
        &self.config
    }

    /// Exploration records.
    #[must_use]
    pub fn registry(&self) -> &ExplorationRegistry {
        &self.registry
    }

    /// Per-player visibility configs.
    #[must_use]
    pub fn player_configs(&self) -> &Arc<PlayerConfigs> {
        &self.player_configs
    }

    /// Capabilities in effect.
    #[must_use]
    pub fn capabilities(&self) -> &Capabilities {
        &self.collaborators.capabilities
    }

    /// Planner in use.
    #[must_use]
    pub fn planner(&self) -> VisibilityPlanner {
        self.planner
    }

    /// Current map settings.
    #[must_use]
    pub fn map_settings(&self) -> MapSettings {
        self.config.map_settings()
    }

    fn world_load_sets(&self, world: &str) -> Arc<WorldLoadSets> {
        if let Some(sets) = self.load_sets.read().get(world) {
            return Arc::clone(sets);
        }
        Arc::clone(
            self.load_sets
                .write()
                .entry(world.to_owned())
                .or_default(),
        )
    }

    /// Attaches the player's record (and persisted store, if any) and sends
    /// them the map settings.
    pub fn on_player_join(&self, world: &str, player: PlayerId) {
        let store = self
            .collaborators
            .persistence
            .as_ref()
            .and_then(|persistence| persistence.open(world, player));
        self.registry.attach(world, player, store);

        let settings = self.map_settings();
        self.collaborators
            .transport
            .send_settings(world, player, &settings);
        tracing::info!(world, %player, "player joined map");
    }

    /// Detaches the player's record and forgets their loaded tiles.
    pub fn on_player_leave(&self, world: &str, player: PlayerId) {
        self.registry.detach(world, player);
        self.world_load_sets(world).lock().remove(&player);
        tracing::info!(world, %player, "player left map");
    }

    /// Runs the pipeline for one player. Returns `None` when the player has
    /// no position or has not changed chunk.
    pub fn update_player(&self, world: &str, player: PlayerId) -> Option<UpdateReport> {
        let position = self.collaborators.positions.position(player)?;
        let chunk = ChunkCoord::from_world_pos(position.x, position.z);
        let radius = self.config.read(|c| c.exploration_radius);

        let record = self.registry.get_or_create(world, player);
        let plan = {
            let mut record = record.lock();
            if !record.reveal(chunk, radius) {
                return None;
            }
            self.planner.plan(
                &record.explored().all_explored(),
                record.boundary().bounds(),
                TileCenter::from_world_pos(position.x, position.z),
            )
        };

        let diff = {
            let sets = self.world_load_sets(world);
            let mut sets = sets.lock();
            sets.entry(player).or_default().apply(&plan)
        };

        let transport = &self.collaborators.transport;
        if !diff.to_unload.is_empty() {
            transport.unload_tiles(world, player, &diff.to_unload);
        }
        if !diff.to_load.is_empty() {
            transport.load_tiles(world, player, &diff.to_load);
        }

        tracing::debug!(
            world,
            %player,
            chunk = %chunk,
            planned = diff.to_load.len(),
            unloaded = diff.to_unload.len(),
            "map plan updated"
        );

        Some(UpdateReport {
            chunk,
            planned: diff.to_load.len(),
            unloaded: diff.to_unload.len(),
        })
    }

    /// Records tiles the host streamed to `viewer` on its own, outside any
    /// plan. They count toward the bulk-eviction ceiling and are unloaded by
    /// the next sweep unless a later plan keeps them.
    pub fn record_streamed_tiles(&self, world: &str, viewer: PlayerId, tiles: &[ChunkKey]) {
        if tiles.is_empty() {
            return;
        }
        let sets = self.world_load_sets(world);
        let mut sets = sets.lock();
        let manager = sets.entry(viewer).or_default();
        manager.mark_loaded(tiles.iter().copied());
        tracing::trace!(
            world,
            %viewer,
            streamed = tiles.len(),
            loaded = manager.loaded_count(),
            "host-streamed tiles recorded"
        );
    }

    /// Advances the bulk-eviction counter of one viewer, sending any evictions.
    /// Returns the number of tiles evicted.
    ///
    /// Planned tiles alone never exceed the quality cap, which sits below the
    /// eviction ceiling, so a sweep only evicts once the host has reported
    /// extra tiles through [`record_streamed_tiles`].
    ///
    /// [`record_streamed_tiles`]: ExplorationService::record_streamed_tiles
    pub fn sweep_player(&self, world: &str, player: PlayerId) -> usize {
        let evicted = {
            let sets = self.world_load_sets(world);
            let mut sets = sets.lock();
            match sets.get_mut(&player) {
                Some(manager) => manager.tick(),
                None => return 0,
            }
        };

        if !evicted.is_empty() {
            self.collaborators
                .transport
                .unload_tiles(world, player, &evicted);
        }
        evicted.len()
    }

    /// Updates every player of `world`. Runs on the world's own thread.
    pub fn update_world(&self, world: &dyn WorldHost) -> WorldTickReport {
        let name = world.name();
        let mut report = WorldTickReport::default();

        for player in world.players() {
            report.players += 1;
            if self.update_player(name, player).is_some() {
                report.replanned += 1;
            }
            report.evicted += self.sweep_player(name, player);
        }

        report
    }

    /// Pushes the current map settings to `world` and every player in it.
    pub fn push_settings(&self, world: &dyn WorldHost) {
        let settings = self.map_settings();
        world.apply_settings(&settings);
        for player in world.players() {
            self.collaborators
                .transport
                .send_settings(world.name(), player, &settings);
        }
    }

    /// Markers from `markers` that `viewer` may see in `world`.
    #[must_use]
    pub fn visible_markers<'m>(
        &self,
        world: &str,
        viewer: PlayerId,
        markers: &'m [MapMarkerRef],
    ) -> Vec<&'m MapMarkerRef> {
        let rules = self.config.visibility();
        let config = self.player_configs.get(viewer);
        let filter = PrivacyFilter::new(&rules, &self.collaborators.capabilities);

        match rules.explored_scope() {
            ExploredScope::Shared => {
                let pooled = self.registry.pooled_explored(world);
                filter.filter(markers, viewer, &config, Some(&pooled as &dyn ExploredLookup))
            }
            ExploredScope::Viewer => {
                let explored = self.registry.explored(world, viewer);
                filter.filter(
                    markers,
                    viewer,
                    &config,
                    explored.as_deref().map(|set| set as &dyn ExploredLookup),
                )
            }
        }
    }

    /// Markers registered in `world` that `viewer` may see.
    #[must_use]
    pub fn visible_world_markers(
        &self,
        markers: &dyn MarkerRegistry,
        world: &str,
        viewer: PlayerId,
    ) -> Vec<MapMarkerRef> {
        let all = markers.markers(world);
        self.visible_markers(world, viewer, &all)
            .into_iter()
            .cloned()
            .collect()
    }

    /// Statistics of a player's exploration in `world`.
    #[must_use]
    pub fn stats(&self, world: &str, player: PlayerId) -> Option<ExplorationStats> {
        self.registry
            .get(world, player)
            .map(|record| record.lock().stats())
    }

    /// Forgets a player's exploration in `world` and their loaded tiles.
    pub fn reset_player(&self, world: &str, player: PlayerId) {
        if let Some(record) = self.registry.get(world, player) {
            record.lock().reset();
        }
        let removed = self.world_load_sets(world).lock().remove(&player);
        if let Some(manager) = removed {
            let mut loaded: Vec<_> = manager.loaded().iter().copied().collect();
            loaded.sort_unstable();
            if !loaded.is_empty() {
                self.collaborators
                    .transport
                    .unload_tiles(world, player, &loaded);
            }
        }
    }

    /// Number of tiles currently loaded for `viewer`.
    #[must_use]
    pub fn loaded_tile_count(&self, world: &str, viewer: PlayerId) -> usize {
        self.world_load_sets(world)
            .lock()
            .get(&viewer)
            .map_or(0, LoadSetManager::loaded_count)
    }
}

impl std::fmt::Debug for ExplorationService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExplorationService")
            .field("records", &self.registry.len())
            .field("planner", &self.planner)
            .finish_non_exhaustive()
    }
}
