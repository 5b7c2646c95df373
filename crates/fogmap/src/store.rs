//! # File-Backed Exploration Store
//!
//! Persists one player's explored chunk keys as a single file.
//!
//! ## Format
//!
//! ```text
//! ┌──────────────┬─────────────────────────────────────────┐
//! │ size (u32 LE)│ LZ4 block: i64 LE keys, ascending order │
//! └──────────────┴─────────────────────────────────────────┘
//! ```
//!
//! ## Write Batching
//!
//! ```text
//!   world tick ──insert_all──▶ [keys + dirty flag] ──notify──▶ [StoreWriter thread]
//!                                                                  │ waits batch_delay
//!                                                                  ▼
//!                                                        encode + fs::write per store
//! ```
//!
//! Adding keys only marks the store dirty. Stores opened through a
//! [`FileStoreProvider`] share one writer thread that saves every dirty
//! store once per batch window. A standalone store saves inline. Pending
//! changes are written on [`ChunkStore::sync`], on drop and when the
//! provider shuts down. Write failures are logged and the in-memory copy
//! stays authoritative until the next successful save.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use fogmap_core::{ChunkStore, PlayerId};
use lz4_flex::{compress_prepend_size, decompress_size_prepended};
use parking_lot::{Mutex, RwLock};

use crate::error::{FogmapError, FogmapResult};
use crate::host::ExplorationPersistence;

const KEY_BYTES: usize = std::mem::size_of::<i64>();

/// Encodes keys as an LZ4-compressed little-endian `i64` array.
#[must_use]
pub fn encode_keys(keys: &BTreeSet<i64>) -> Vec<u8> {
    let le: Vec<i64> = keys.iter().map(|k| k.to_le()).collect();
    compress_prepend_size(bytemuck::cast_slice::<i64, u8>(&le))
}

/// Decodes [`encode_keys`] output.
///
/// # Errors
///
/// Returns [`FogmapError::StoreCorrupt`] on bad compression or a length that
/// is not a whole number of keys.
pub fn decode_keys(path: &Path, bytes: &[u8]) -> FogmapResult<BTreeSet<i64>> {
    let raw = decompress_size_prepended(bytes).map_err(|e| FogmapError::StoreCorrupt {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;

    if raw.len() % KEY_BYTES != 0 {
        return Err(FogmapError::StoreCorrupt {
            path: path.to_path_buf(),
            reason: format!("{} bytes is not a whole number of keys", raw.len()),
        });
    }

    Ok(raw
        .chunks_exact(KEY_BYTES)
        .map(|chunk| i64::from_le(bytemuck::pod_read_unaligned::<i64>(chunk)))
        .collect())
}

/// Explored keys of one player, mirrored to a file.
#[derive(Debug)]
pub struct FileChunkStore {
    path: PathBuf,
    keys: RwLock<BTreeSet<i64>>,
    /// Serializes saves so a stale snapshot never overwrites a newer one.
    save_lock: Mutex<()>,
    /// Set when keys changed since the last save started.
    dirty: AtomicBool,
    writer: Option<WriterLink>,
}

#[derive(Debug)]
struct WriterLink {
    inbox: Sender<WriterMessage>,
    me: Weak<FileChunkStore>,
}

fn load_keys(path: &Path) -> FogmapResult<BTreeSet<i64>> {
    if !path.exists() {
        return Ok(BTreeSet::new());
    }
    let bytes = fs::read(path).map_err(|e| FogmapError::io(path, e))?;
    decode_keys(path, &bytes)
}

impl FileChunkStore {
    /// Opens the store at `path`, loading existing keys. A missing file is an
    /// empty store. Changes are saved inline.
    ///
    /// # Errors
    ///
    /// Returns [`FogmapError::ConfigIo`] when the file cannot be read, or
    /// [`FogmapError::StoreCorrupt`] when it cannot be decoded.
    pub fn open(path: impl Into<PathBuf>) -> FogmapResult<Self> {
        let path = path.into();
        let keys = load_keys(&path)?;
        Ok(Self {
            path,
            keys: RwLock::new(keys),
            save_lock: Mutex::new(()),
            dirty: AtomicBool::new(false),
            writer: None,
        })
    }

    /// Opens the store at `path` with saves handed to `inbox`.
    fn open_batched(path: PathBuf, inbox: Sender<WriterMessage>) -> FogmapResult<Arc<Self>> {
        let keys = load_keys(&path)?;
        Ok(Arc::new_cyclic(|me| Self {
            path,
            keys: RwLock::new(keys),
            save_lock: Mutex::new(()),
            dirty: AtomicBool::new(false),
            writer: Some(WriterLink {
                inbox,
                me: me.clone(),
            }),
        }))
    }

    /// Path of the backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether changes are waiting to be saved.
    #[inline]
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.dirty.load(Ordering::Acquire)
    }

    /// Writes the current keys to disk now.
    ///
    /// # Errors
    ///
    /// Returns [`FogmapError::ConfigIo`] when the write fails.
    pub fn flush(&self) -> FogmapResult<()> {
        let _guard = self.save_lock.lock();
        // Cleared before the snapshot: a concurrent insert re-marks the store
        self.dirty.store(false, Ordering::Release);
        let encoded = encode_keys(&self.keys.read());

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| FogmapError::io(parent, e))?;
        }
        fs::write(&self.path, encoded).map_err(|e| FogmapError::io(&self.path, e))
    }

    fn save_logged(&self) {
        if let Err(e) = self.flush() {
            tracing::warn!(path = %self.path.display(), error = %e, "failed to save exploration store");
        }
    }

    /// Marks the store dirty and schedules a save.
    fn mark_dirty(&self) {
        if self.dirty.swap(true, Ordering::AcqRel) {
            return;
        }
        let queued = self.writer.as_ref().is_some_and(|link| {
            link.inbox
                .send(WriterMessage::Dirty(link.me.clone()))
                .is_ok()
        });
        if !queued {
            self.save_logged();
        }
    }
}

impl ChunkStore for FileChunkStore {
    fn get(&self) -> Vec<i64> {
        self.keys.read().iter().copied().collect()
    }

    fn insert_all(&self, keys: &[i64]) {
        let changed = {
            let mut stored = self.keys.write();
            let before = stored.len();
            stored.extend(keys.iter().copied());
            stored.len() != before
        };
        if changed {
            self.mark_dirty();
        }
    }

    fn contains(&self, key: i64) -> bool {
        self.keys.read().contains(&key)
    }

    fn len(&self) -> usize {
        self.keys.read().len()
    }

    fn clear(&self) {
        self.keys.write().clear();
        self.mark_dirty();
    }

    fn sync(&self) {
        if self.is_dirty() {
            self.save_logged();
        }
    }
}

impl Drop for FileChunkStore {
    fn drop(&mut self) {
        if self.is_dirty() {
            self.save_logged();
        }
    }
}

enum WriterMessage {
    Dirty(Weak<FileChunkStore>),
    Shutdown,
}

impl std::fmt::Debug for WriterMessage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Dirty(_) => f.write_str("Dirty"),
            Self::Shutdown => f.write_str("Shutdown"),
        }
    }
}

/// Counters for the store writer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StoreWriterStats {
    /// Batch windows that closed with work in them.
    pub batches: u64,
    /// Store saves performed by the writer.
    pub saves: u64,
}

#[derive(Debug, Default)]
struct WriterCounters {
    batches: AtomicU64,
    saves: AtomicU64,
}

/// Background thread saving dirty stores in batches.
#[derive(Debug)]
struct StoreWriter {
    inbox: Sender<WriterMessage>,
    handle: Mutex<Option<JoinHandle<()>>>,
    counters: Arc<WriterCounters>,
}

impl StoreWriter {
    fn spawn(batch_delay: Duration) -> Self {
        let (inbox, outbox) = crossbeam_channel::unbounded();
        let counters = Arc::new(WriterCounters::default());
        let thread_counters = Arc::clone(&counters);
        let handle = thread::Builder::new()
            .name("fogmap-store-writer".into())
            .spawn(move || writer_loop(&outbox, batch_delay, &thread_counters))
            .map_err(|e| {
                tracing::warn!(error = %e, "store writer thread unavailable, saving inline");
            })
            .ok();

        Self {
            inbox,
            handle: Mutex::new(handle),
            counters,
        }
    }

    fn is_running(&self) -> bool {
        self.handle.lock().is_some()
    }

    fn stats(&self) -> StoreWriterStats {
        StoreWriterStats {
            batches: self.counters.batches.load(Ordering::Relaxed),
            saves: self.counters.saves.load(Ordering::Relaxed),
        }
    }

    fn shutdown(&self) {
        let Some(handle) = self.handle.lock().take() else {
            return;
        };
        let _ = self.inbox.send(WriterMessage::Shutdown);
        if handle.join().is_err() {
            tracing::error!("store writer thread panicked");
        }
    }
}

impl Drop for StoreWriter {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn writer_loop(
    outbox: &Receiver<WriterMessage>,
    batch_delay: Duration,
    counters: &WriterCounters,
) {
    let mut pending: Vec<Weak<FileChunkStore>> = Vec::new();
    let mut deadline: Option<Instant> = None;

    loop {
        let message = match deadline {
            Some(at) => outbox.recv_deadline(at),
            None => outbox.recv().map_err(|_| RecvTimeoutError::Disconnected),
        };

        match message {
            Ok(WriterMessage::Dirty(store)) => {
                pending.push(store);
                deadline.get_or_insert_with(|| Instant::now() + batch_delay);
            }
            Err(RecvTimeoutError::Timeout) => {
                save_batch(&mut pending, counters);
                deadline = None;
            }
            Ok(WriterMessage::Shutdown) | Err(RecvTimeoutError::Disconnected) => {
                // Stores queued behind the shutdown message still get saved
                while let Ok(WriterMessage::Dirty(store)) = outbox.try_recv() {
                    pending.push(store);
                }
                save_batch(&mut pending, counters);
                tracing::debug!("store writer stopped");
                return;
            }
        }
    }
}

fn save_batch(pending: &mut Vec<Weak<FileChunkStore>>, counters: &WriterCounters) {
    if pending.is_empty() {
        return;
    }
    let mut saved = 0_u64;
    for store in pending.drain(..).filter_map(|weak| weak.upgrade()) {
        if store.is_dirty() {
            store.save_logged();
            saved += 1;
        }
    }
    counters.batches.fetch_add(1, Ordering::Relaxed);
    counters.saves.fetch_add(saved, Ordering::Relaxed);
    tracing::trace!(saved, "exploration store batch written");
}

/// Default window the writer waits after the first change before saving.
pub const DEFAULT_BATCH_DELAY: Duration = Duration::from_millis(500);

/// Opens one [`FileChunkStore`] per world and player under a root directory.
///
/// Layout: `<root>/<world>/<player id>.bin`. Clones share the writer thread,
/// which stops once the last clone is dropped or [`shutdown`] is called.
///
/// [`shutdown`]: FileStoreProvider::shutdown
#[derive(Clone, Debug)]
pub struct FileStoreProvider {
    root: PathBuf,
    writer: Arc<StoreWriter>,
}

impl FileStoreProvider {
    /// Creates a provider rooted at `root` with [`DEFAULT_BATCH_DELAY`].
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self::with_batch_delay(root, DEFAULT_BATCH_DELAY)
    }

    /// Creates a provider whose writer saves at most once per `batch_delay`.
    #[must_use]
    pub fn with_batch_delay(root: impl Into<PathBuf>, batch_delay: Duration) -> Self {
        Self {
            root: root.into(),
            writer: Arc::new(StoreWriter::spawn(batch_delay)),
        }
    }

    /// File used for `player` in `world`.
    #[must_use]
    pub fn path_for(&self, world: &str, player: PlayerId) -> PathBuf {
        let safe_world: String = world
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '_' || c == '-' { c } else { '_' })
            .collect();
        self.root.join(safe_world).join(format!("{}.bin", player.0))
    }

    /// Opens the batched store for `player` in `world`.
    ///
    /// # Errors
    ///
    /// Same as [`FileChunkStore::open`].
    pub fn open_store(&self, world: &str, player: PlayerId) -> FogmapResult<Arc<FileChunkStore>> {
        let path = self.path_for(world, player);
        if self.writer.is_running() {
            FileChunkStore::open_batched(path, self.writer.inbox.clone())
        } else {
            FileChunkStore::open(path).map(Arc::new)
        }
    }

    /// Writer counters.
    #[must_use]
    pub fn writer_stats(&self) -> StoreWriterStats {
        self.writer.stats()
    }

    /// Saves every pending store and stops the writer. Stores opened
    /// afterwards save inline.
    pub fn shutdown(&self) {
        self.writer.shutdown();
    }
}

impl ExplorationPersistence for FileStoreProvider {
    fn open(&self, world: &str, player: PlayerId) -> Option<Arc<dyn ChunkStore>> {
        match self.open_store(world, player) {
            Ok(store) => Some(store),
            Err(e) => {
                tracing::warn!(world, %player, error = %e, "exploration store unavailable, keeping exploration in memory");
                None
            }
        }
    }
}
