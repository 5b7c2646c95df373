//! # Exploration Records
//!
//! One record per player per world: the explored set, the boundary tracker
//! that feeds it, and the last chunk the player was seen in.
//!
//! ## Lifecycle
//!
//! - Created on join (optionally attached to a persisted store) or lazily on
//!   the first lookup. A missing record is never an error.
//! - A lazy in-memory record is moved onto the store when a later join
//!   brings one.
//! - Detached on disconnect, after its store is synced. A persisted store
//!   outlives the record and is reattached on reconnect.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};

use crate::boundary::{BoundaryTracker, MapBoundary};
use crate::chunk::{ChunkCoord, ChunkKey, CHUNK_SIZE};
use crate::exploration::{ChunkStore, ExplorationSet};

/// Stable player identity.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PlayerId(pub u64);

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "player#{}", self.0)
    }
}

/// A player's exploration in one world.
#[derive(Debug)]
pub struct ExplorationRecord {
    player: PlayerId,
    boundary: BoundaryTracker,
    last_chunk: Option<ChunkCoord>,
}

impl ExplorationRecord {
    /// Creates a record, persisted when `store` is given.
    #[must_use]
    pub fn new(player: PlayerId, store: Option<Arc<dyn ChunkStore>>) -> Self {
        let explored = Arc::new(ExplorationSet::with_store(store));
        Self {
            player,
            boundary: BoundaryTracker::seeded(explored),
            last_chunk: None,
        }
    }

    /// Moves an in-memory record onto `store`.
    ///
    /// Chunks explored so far are copied into the store and the boundary is
    /// re-seeded from its union with whatever the store already held. The
    /// last chunk is kept. Returns `false` when the record is already
    /// persisted, leaving it untouched.
    pub fn attach_store(&mut self, store: Arc<dyn ChunkStore>) -> bool {
        if self.explored().is_persisted() {
            return false;
        }

        let raw: Vec<i64> = self.explored().all_explored().iter().map(|k| k.raw()).collect();
        if !raw.is_empty() {
            store.insert_all(&raw);
        }
        self.boundary = BoundaryTracker::seeded(Arc::new(ExplorationSet::persisted(store)));
        true
    }

    /// Owning player.
    #[inline]
    #[must_use]
    pub fn player(&self) -> PlayerId {
        self.player
    }

    /// Explored chunk set.
    #[inline]
    #[must_use]
    pub fn explored(&self) -> &Arc<ExplorationSet> {
        self.boundary.explored()
    }

    /// Boundary tracker.
    #[inline]
    #[must_use]
    pub fn boundary(&self) -> &BoundaryTracker {
        &self.boundary
    }

    /// Last chunk the player was seen in.
    #[inline]
    #[must_use]
    pub fn last_chunk(&self) -> Option<ChunkCoord> {
        self.last_chunk
    }

    /// Whether `chunk` differs from the last recorded chunk.
    #[inline]
    #[must_use]
    pub fn has_moved_to_new_chunk(&self, chunk: ChunkCoord) -> bool {
        self.last_chunk != Some(chunk)
    }

    /// Records the player's chunk without revealing anything.
    #[inline]
    pub fn set_last_chunk(&mut self, chunk: ChunkCoord) {
        self.last_chunk = Some(chunk);
    }

    /// Reveals around `chunk` if the player changed chunk since last time.
    ///
    /// Returns `true` when something was revealed (and a re-plan is due).
    pub fn reveal(&mut self, chunk: ChunkCoord, radius: i32) -> bool {
        if !self.has_moved_to_new_chunk(chunk) {
            return false;
        }
        self.boundary.update_boundaries(chunk.x, chunk.z, radius);
        self.last_chunk = Some(chunk);
        true
    }

    /// Forgets all exploration, including the persisted set.
    pub fn reset(&mut self) {
        self.boundary.reset();
        self.last_chunk = None;
        tracing::info!(player = %self.player, "exploration reset");
    }

    /// Snapshot of the record's statistics.
    #[must_use]
    pub fn stats(&self) -> ExplorationStats {
        ExplorationStats {
            explored_chunks: self.explored().count(),
            total_area: self.boundary.total_area(),
            boundaries: self.boundary.bounds(),
        }
    }
}

/// Summary numbers for a record.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ExplorationStats {
    /// Chunks actually explored.
    pub explored_chunks: usize,
    /// Area of the bounding rectangle, in chunks.
    pub total_area: i64,
    /// Bounding rectangle, `None` when nothing is explored.
    pub boundaries: Option<MapBoundary>,
}

impl ExplorationStats {
    /// Rectangle area in world units squared.
    #[inline]
    #[must_use]
    pub const fn area_in_blocks(&self) -> i64 {
        self.total_area * (CHUNK_SIZE as i64) * (CHUNK_SIZE as i64)
    }
}

impl fmt::Display for ExplorationStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Chunks Explored: {}", self.explored_chunks)?;
        writeln!(
            f,
            "Total Map Area: {} chunks ({} blocks)",
            self.total_area,
            self.area_in_blocks()
        )?;
        match self.boundaries {
            Some(b) => write!(f, "Boundaries: {b}"),
            None => write!(f, "Boundaries: none"),
        }
    }
}

type RecordKey = (String, PlayerId);

/// Shared handle to a record. Per-world ticks lock it for the duration of
/// one player's update.
pub type SharedRecord = Arc<Mutex<ExplorationRecord>>;

/// All live exploration records, keyed by world and player.
#[derive(Default)]
pub struct ExplorationRegistry {
    records: RwLock<HashMap<RecordKey, SharedRecord>>,
}

impl ExplorationRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Looks up a record without creating one.
    #[must_use]
    pub fn get(&self, world: &str, player: PlayerId) -> Option<SharedRecord> {
        self.records
            .read()
            .get(&(world.to_owned(), player))
            .map(Arc::clone)
    }

    /// Looks up a record, creating an in-memory one if absent.
    pub fn get_or_create(&self, world: &str, player: PlayerId) -> SharedRecord {
        if let Some(record) = self.get(world, player) {
            return record;
        }

        let mut records = self.records.write();
        let record = records
            .entry((world.to_owned(), player))
            .or_insert_with(|| {
                tracing::debug!(world, %player, "creating exploration record");
                Arc::new(Mutex::new(ExplorationRecord::new(player, None)))
            });
        Arc::clone(record)
    }

    /// Attaches a record on join.
    ///
    /// An existing in-memory record (created lazily before the join) is
    /// moved onto `store`; an existing persisted record is kept as-is.
    pub fn attach(
        &self,
        world: &str,
        player: PlayerId,
        store: Option<Arc<dyn ChunkStore>>,
    ) -> SharedRecord {
        let mut records = self.records.write();
        if let Some(record) = records.get(&(world.to_owned(), player)) {
            if let Some(store) = store {
                if record.lock().attach_store(store) {
                    tracing::info!(world, %player, "in-memory exploration moved to persisted store");
                }
            }
            return Arc::clone(record);
        }

        let persisted = store.is_some();
        tracing::info!(world, %player, persisted, "exploration record attached");
        let record = Arc::new(Mutex::new(ExplorationRecord::new(player, store)));
        records.insert((world.to_owned(), player), Arc::clone(&record));
        record
    }

    /// Detaches a record, returning it if present. Deferred writes of a
    /// persisted set are flushed first.
    pub fn detach(&self, world: &str, player: PlayerId) -> Option<SharedRecord> {
        let removed = self.records.write().remove(&(world.to_owned(), player));
        if let Some(record) = &removed {
            record.lock().explored().sync();
            tracing::info!(world, %player, "exploration record detached");
        }
        removed
    }

    /// Detaches every record of `player`. Returns how many were removed.
    pub fn detach_player(&self, player: PlayerId) -> usize {
        let removed: Vec<SharedRecord> = {
            let mut records = self.records.write();
            let keys: Vec<RecordKey> = records
                .keys()
                .filter(|(_, p)| *p == player)
                .cloned()
                .collect();
            keys.iter().filter_map(|key| records.remove(key)).collect()
        };
        for record in &removed {
            record.lock().explored().sync();
        }
        removed.len()
    }

    /// Explored set of one player, if a record exists.
    #[must_use]
    pub fn explored(&self, world: &str, player: PlayerId) -> Option<Arc<ExplorationSet>> {
        self.get(world, player)
            .map(|record| Arc::clone(record.lock().explored()))
    }

    /// Union of every player's explored chunks in `world`.
    #[must_use]
    pub fn pooled_explored(&self, world: &str) -> HashSet<ChunkKey> {
        let sets: Vec<Arc<ExplorationSet>> = self
            .records
            .read()
            .iter()
            .filter(|((w, _), _)| w == world)
            .map(|(_, record)| Arc::clone(record.lock().explored()))
            .collect();

        let mut pooled = HashSet::new();
        for set in sets {
            pooled.extend(set.all_explored());
        }
        pooled
    }

    /// Players with a record in `world`, sorted.
    #[must_use]
    pub fn players_in(&self, world: &str) -> Vec<PlayerId> {
        let mut players: Vec<PlayerId> = self
            .records
            .read()
            .keys()
            .filter(|(w, _)| w == world)
            .map(|(_, p)| *p)
            .collect();
        players.sort_unstable();
        players
    }

    /// Number of live records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    /// Whether no records are live.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunk::pack;
    use crate::exploration::tests::VecStore;

    #[test]
    fn test_reveal_only_on_chunk_change() {
        let mut record = ExplorationRecord::new(PlayerId(1), None);
        assert!(record.reveal(ChunkCoord::new(0, 0), 2));
        let count = record.explored().count();
        assert!(!record.reveal(ChunkCoord::new(0, 0), 2));
        assert_eq!(record.explored().count(), count);
        assert!(record.reveal(ChunkCoord::new(1, 0), 2));
        assert!(record.explored().count() > count);
        assert_eq!(record.last_chunk(), Some(ChunkCoord::new(1, 0)));
    }

    #[test]
    fn test_stats() {
        let mut record = ExplorationRecord::new(PlayerId(1), None);
        assert_eq!(record.stats(), ExplorationStats::default());

        record.reveal(ChunkCoord::new(0, 0), 1);
        let stats = record.stats();
        assert_eq!(stats.explored_chunks, 5);
        assert_eq!(stats.total_area, 9);
        assert_eq!(stats.area_in_blocks(), 9 * 256);
        assert!(stats.to_string().contains("Chunks Explored: 5"));
    }

    #[test]
    fn test_reset_forgets_last_chunk() {
        let mut record = ExplorationRecord::new(PlayerId(3), None);
        record.reveal(ChunkCoord::new(2, 2), 1);
        record.reset();
        assert_eq!(record.last_chunk(), None);
        assert_eq!(record.explored().count(), 0);
        assert!(record.reveal(ChunkCoord::new(2, 2), 1));
    }

    #[test]
    fn test_get_or_create_is_lazy_and_stable() {
        let registry = ExplorationRegistry::new();
        assert!(registry.get("overworld", PlayerId(1)).is_none());

        let a = registry.get_or_create("overworld", PlayerId(1));
        let b = registry.get_or_create("overworld", PlayerId(1));
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_persisted_store_survives_detach() {
        let registry = ExplorationRegistry::new();
        let store: Arc<dyn ChunkStore> = Arc::new(VecStore::default());

        let record = registry.attach("overworld", PlayerId(7), Some(Arc::clone(&store)));
        record.lock().reveal(ChunkCoord::new(10, 10), 0);
        registry.detach("overworld", PlayerId(7));
        assert!(registry.is_empty());

        let again = registry.attach("overworld", PlayerId(7), Some(store));
        let guard = again.lock();
        assert!(guard.explored().is_explored(pack(10, 10)));
        assert_eq!(
            guard.boundary().current_boundaries(),
            MapBoundary::new(10, 10, 10, 10)
        );
    }

    #[test]
    fn test_attach_moves_lazy_record_onto_store() {
        let registry = ExplorationRegistry::new();
        let lazy = registry.get_or_create("overworld", PlayerId(8));
        lazy.lock().reveal(ChunkCoord::new(3, 3), 0);

        let store: Arc<dyn ChunkStore> = Arc::new(VecStore::default());
        let attached = registry.attach("overworld", PlayerId(8), Some(Arc::clone(&store)));
        assert!(Arc::ptr_eq(&lazy, &attached));
        assert_eq!(store.len(), 1);
        assert!(store.contains(pack(3, 3).raw()));

        let mut guard = attached.lock();
        assert!(guard.explored().is_persisted());
        assert_eq!(guard.last_chunk(), Some(ChunkCoord::new(3, 3)));
        assert_eq!(guard.boundary().bounds(), Some(MapBoundary::new(3, 3, 3, 3)));

        guard.reveal(ChunkCoord::new(4, 3), 0);
        assert!(store.contains(pack(4, 3).raw()));
        assert_eq!(guard.boundary().bounds(), Some(MapBoundary::new(3, 4, 3, 3)));
    }

    #[test]
    fn test_attach_store_merges_with_stored_keys() {
        let store: Arc<dyn ChunkStore> = Arc::new(VecStore::default());
        store.insert_all(&[pack(-2, 5).raw()]);

        let mut record = ExplorationRecord::new(PlayerId(9), None);
        record.reveal(ChunkCoord::new(1, 1), 0);
        assert!(record.attach_store(Arc::clone(&store)));
        assert_eq!(record.explored().count(), 2);
        assert_eq!(record.boundary().bounds(), Some(MapBoundary::new(-2, 1, 1, 5)));

        // Second attach is refused and leaves the first store in place
        let other: Arc<dyn ChunkStore> = Arc::new(VecStore::default());
        assert!(!record.attach_store(Arc::clone(&other)));
        record.reveal(ChunkCoord::new(6, 6), 0);
        assert!(store.contains(pack(6, 6).raw()));
        assert!(other.is_empty());
    }

    #[test]
    fn test_pooled_explored_is_per_world() {
        let registry = ExplorationRegistry::new();
        registry
            .get_or_create("overworld", PlayerId(1))
            .lock()
            .reveal(ChunkCoord::new(0, 0), 0);
        registry
            .get_or_create("overworld", PlayerId(2))
            .lock()
            .reveal(ChunkCoord::new(5, 5), 0);
        registry
            .get_or_create("nether", PlayerId(1))
            .lock()
            .reveal(ChunkCoord::new(9, 9), 0);

        let pooled = registry.pooled_explored("overworld");
        assert_eq!(pooled.len(), 2);
        assert!(pooled.contains(&pack(0, 0)));
        assert!(pooled.contains(&pack(5, 5)));
        assert!(!pooled.contains(&pack(9, 9)));

        assert_eq!(registry.players_in("overworld"), vec![PlayerId(1), PlayerId(2)]);
        assert_eq!(registry.detach_player(PlayerId(1)), 2);
        assert_eq!(registry.len(), 1);
    }
}
