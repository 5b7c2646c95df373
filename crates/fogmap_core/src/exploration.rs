//! # Exploration Sets
//!
//! The set of chunks a player has explored. Grows monotonically; the only way
//! to shrink it is [`ExplorationSet::clear`].
//!
//! ## Backing Strategies
//!
//! ```text
//!                 ┌──────────────────┐
//!   scheduler ───▶│  ExplorationSet  │◀─── commands / marker queries
//!                 └────────┬─────────┘
//!            ┌─────────────┴──────────────┐
//!            ▼                            ▼
//!   ┌─────────────────┐        ┌─────────────────────┐
//!   │ Memory          │        │ Persisted           │
//!   │ RwLock<HashSet> │        │ Arc<dyn ChunkStore> │
//!   └─────────────────┘        └─────────────────────┘
//! ```
//!
//! Both present the same behaviour. Reads never observe a torn set: the
//! in-memory strategy takes a read lock, persisted stores must provide the
//! same guarantee themselves.

use std::collections::HashSet;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::chunk::ChunkKey;

/// Externally-owned persistence for explored chunks.
///
/// Implementations own their collection and are responsible for saving it
/// when it changes. Saves are fire-and-forget from the caller's side: none of
/// these methods report I/O failure. A store may defer saves; [`sync`]
/// forces anything pending out.
///
/// [`sync`]: ChunkStore::sync
pub trait ChunkStore: Send + Sync {
    /// Raw packed keys currently stored.
    fn get(&self) -> Vec<i64>;

    /// Adds keys. Already-present keys are ignored.
    fn insert_all(&self, keys: &[i64]);

    /// Whether a key is stored.
    fn contains(&self, key: i64) -> bool;

    /// Number of stored keys.
    fn len(&self) -> usize;

    /// Whether the store is empty.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Removes every key.
    fn clear(&self);

    /// Writes out any deferred changes before returning.
    fn sync(&self) {}
}

/// Anything that can answer "has this chunk been explored?".
///
/// Lets marker filtering treat a single player's set and a pooled snapshot
/// the same way.
pub trait ExploredLookup {
    /// Whether the chunk is explored.
    fn is_explored(&self, key: ChunkKey) -> bool;
}

impl ExploredLookup for HashSet<ChunkKey> {
    fn is_explored(&self, key: ChunkKey) -> bool {
        self.contains(&key)
    }
}

enum Backing {
    Memory(RwLock<HashSet<ChunkKey>>),
    Persisted(Arc<dyn ChunkStore>),
}

/// Thread-safe set of explored chunk keys.
pub struct ExplorationSet {
    backing: Backing,
}

impl ExplorationSet {
    /// Creates an empty in-memory set.
    #[must_use]
    pub fn in_memory() -> Self {
        Self {
            backing: Backing::Memory(RwLock::new(HashSet::new())),
        }
    }

    /// Creates a set backed by a persisted store.
    #[must_use]
    pub fn persisted(store: Arc<dyn ChunkStore>) -> Self {
        Self {
            backing: Backing::Persisted(store),
        }
    }

    /// Picks the persisted strategy when a store is attached.
    #[must_use]
    pub fn with_store(store: Option<Arc<dyn ChunkStore>>) -> Self {
        store.map_or_else(Self::in_memory, Self::persisted)
    }

    /// Whether this set writes through to a persisted store.
    #[inline]
    #[must_use]
    pub fn is_persisted(&self) -> bool {
        matches!(self.backing, Backing::Persisted(_))
    }

    /// Marks a single chunk explored.
    pub fn mark_chunk(&self, key: ChunkKey) {
        match &self.backing {
            Backing::Memory(set) => {
                set.write().insert(key);
            }
            Backing::Persisted(store) => store.insert_all(&[key.raw()]),
        }
    }

    /// Marks many chunks explored under a single write.
    pub fn mark_chunks<'a, I>(&self, keys: I)
    where
        I: IntoIterator<Item = &'a ChunkKey>,
    {
        match &self.backing {
            Backing::Memory(set) => {
                set.write().extend(keys);
            }
            Backing::Persisted(store) => {
                let raw: Vec<i64> = keys.into_iter().map(|k| k.raw()).collect();
                if !raw.is_empty() {
                    store.insert_all(&raw);
                }
            }
        }
    }

    /// Whether a chunk is explored.
    #[must_use]
    pub fn is_explored(&self, key: ChunkKey) -> bool {
        match &self.backing {
            Backing::Memory(set) => set.read().contains(&key),
            Backing::Persisted(store) => store.contains(key.raw()),
        }
    }

    /// Copy of every explored key. Later marks do not affect the copy.
    #[must_use]
    pub fn all_explored(&self) -> HashSet<ChunkKey> {
        match &self.backing {
            Backing::Memory(set) => set.read().clone(),
            Backing::Persisted(store) => store.get().into_iter().map(ChunkKey).collect(),
        }
    }

    /// Number of explored chunks.
    #[must_use]
    pub fn count(&self) -> usize {
        match &self.backing {
            Backing::Memory(set) => set.read().len(),
            Backing::Persisted(store) => store.len(),
        }
    }

    /// Forces deferred writes of a persisted store out. No-op in memory.
    pub fn sync(&self) {
        if let Backing::Persisted(store) = &self.backing {
            store.sync();
        }
    }

    /// Forgets every explored chunk.
    pub fn clear(&self) {
        match &self.backing {
            Backing::Memory(set) => set.write().clear(),
            Backing::Persisted(store) => store.clear(),
        }
    }
}

impl Default for ExplorationSet {
    fn default() -> Self {
        Self::in_memory()
    }
}

impl std::fmt::Debug for ExplorationSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExplorationSet")
            .field("persisted", &self.is_persisted())
            .field("count", &self.count())
            .finish()
    }
}

impl ExploredLookup for ExplorationSet {
    fn is_explored(&self, key: ChunkKey) -> bool {
        ExplorationSet::is_explored(self, key)
    }
}
