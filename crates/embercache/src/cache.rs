//! ReferenceCache: key → reclaimable value map with lazy compaction

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, trace};

use crate::config::{BackingStoreKind, CacheConfig, CacheMode};
use crate::error::{CacheError, Result};
use crate::handle::Handle;
use crate::key::CacheKey;
use crate::queue::ReclamationQueue;
use crate::reference::CacheReference;
use crate::retention::SoftRetention;
use crate::stats::CacheStats;
use crate::store::{open_store, ReferenceStore};

/// Cache whose values are evicted once nothing else owns them
///
/// Values are stored through weak observers of their [`Handle`]s. Releasing
/// the last handle of a value queues its entry for removal, and the queue is
/// drained by every public operation. An entry can therefore outlive its
/// value until the next call, but never surfaces a dead value: `get` returns
/// `None` for it.
///
/// Absent keys are rejected by [`put`](Self::put); every other operation on
/// a missing key is a no-op.
pub struct ReferenceCache<K, V> {
    /// Key → reference mapping
    store: Box<dyn ReferenceStore<K, CacheReference<K, V>>>,

    /// Slots of released or invalidated references
    queue: Arc<ReclamationQueue<K>>,

    /// Strong handles kept alive in soft mode
    retention: Option<Mutex<SoftRetention<V>>>,

    mode: CacheMode,

    next_ticket: AtomicU64,

    stats: CacheStats,
}

impl<K, V> ReferenceCache<K, V>
where
    K: CacheKey,
    V: Send + Sync + 'static,
{
    /// Create a cache with the given backing store and mode
    pub fn new(backing: BackingStoreKind, mode: CacheMode) -> Self {
        Self::build(CacheConfig::new(backing, mode))
    }

    /// Create a cache from a validated configuration
    ///
    /// # Returns
    /// * `Err(CacheError::InvalidConfig)` - a parameter is out of range
    pub fn with_config(config: CacheConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::build(config))
    }

    fn build(config: CacheConfig) -> Self {
        debug!(
            backing = %config.backing,
            mode = %config.mode,
            soft_capacity = config.soft_capacity,
            shards = config.shards,
            "reference cache created"
        );

        let retention = match config.mode {
            CacheMode::Soft => Some(Mutex::new(SoftRetention::new(config.soft_capacity))),
            CacheMode::Weak => None,
        };

        Self {
            store: open_store(config.backing, config.shards),
            queue: Arc::new(ReclamationQueue::new()),
            retention,
            mode: config.mode,
            next_ticket: AtomicU64::new(0),
            stats: CacheStats::new(),
        }
    }

    /// Associate `value` with `key`
    ///
    /// The cache observes `value` without owning it (soft mode additionally
    /// retains it until released by the retention bound). A previous entry
    /// for `key` is replaced.
    ///
    /// # Arguments
    /// * `key` - Key to store under; `None` is rejected
    /// * `value` - Handle of the value to cache
    ///
    /// # Returns
    /// * `Result<K>` - The key, or `InvalidArgument` for an absent key or a
    ///   key without identity in an identity-keyed cache
    pub fn put(&self, key: impl Into<Option<K>>, value: &Handle<V>) -> Result<K> {
        self.compact();

        let key = key
            .into()
            .ok_or_else(|| CacheError::invalid_argument("key must not be absent"))?;
        let ticket = self.next_ticket.fetch_add(1, Ordering::Relaxed);
        let reference = CacheReference::new(ticket, key.clone(), value);

        let mut released = Vec::new();
        {
            // Held across the insert so retention follows store order
            let mut retention = self.retention.as_ref().map(|r| r.lock());

            let previous = self.store.insert(key.clone(), reference.clone())?;
            self.stats.record_insert();

            // Invalidate first so attach prunes the replaced registration
            if let Some(previous) = previous {
                previous.invalidate(&self.queue);
                self.stats.record_replacement();
                if let Some(retention) = retention.as_mut() {
                    released.extend(retention.release(previous.ticket()));
                }
            }
            reference.register(value, &self.queue);

            if let Some(retention) = retention.as_mut() {
                released.extend(retention.retain(ticket, value.clone()));
            }
        }
        drop(released);

        Ok(key)
    }

    /// Look up the value stored under `key`
    ///
    /// Returns `None` for a missing key and for an entry whose value has
    /// been released.
    pub fn get(&self, key: &K) -> Option<Handle<V>> {
        self.compact();

        let found = match &self.retention {
            Some(retention) => {
                // Lookup and retain under one lock so a concurrent put or
                // remove cannot release the ticket in between
                let mut retention = retention.lock();
                let found = self.lookup(key);
                let evicted = found.as_ref().and_then(|(ticket, handle)| {
                    if retention.touch(*ticket) {
                        None
                    } else {
                        retention.retain(*ticket, handle.clone())
                    }
                });
                drop(retention);
                drop(evicted);
                found
            }
            None => self.lookup(key),
        };

        match found {
            Some((_, handle)) => {
                self.stats.record_hit();
                Some(handle)
            }
            None => {
                self.stats.record_miss();
                None
            }
        }
    }

    fn lookup(&self, key: &K) -> Option<(u64, Handle<V>)> {
        self.store
            .get(key)
            .and_then(|reference| reference.get().map(|handle| (reference.ticket(), handle)))
    }

    /// Remove the entry for `key`
    ///
    /// # Returns
    /// * `Option<Handle<V>>` - The removed value if it was still alive
    pub fn remove(&self, key: &K) -> Option<Handle<V>> {
        let removed = self.store.remove(key);

        let value = removed.as_ref().and_then(|reference| {
            reference.invalidate(&self.queue);
            self.stats.record_removals(1);
            reference.get()
        });

        let released = match (&removed, &self.retention) {
            (Some(reference), Some(retention)) => retention.lock().release(reference.ticket()),
            _ => None,
        };
        drop(released);

        self.compact();
        value
    }

    /// Whether an entry exists for `key`
    ///
    /// An entry may exist for a value that is no longer alive; use
    /// [`get`](Self::get) to check liveness.
    pub fn contains_key(&self, key: &K) -> bool {
        self.compact();
        self.store.contains_key(key)
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.compact();
        self.store.len()
    }

    /// Check if the cache has no entries
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of the keys currently stored
    pub fn keys(&self) -> Vec<K> {
        self.compact();
        let mut keys = Vec::with_capacity(self.store.len());
        self.store.for_each(&mut |key, _| keys.push(key.clone()));
        keys
    }

    /// Remove every entry
    pub fn clear(&self) {
        let references = self.store.drain();
        for reference in &references {
            reference.invalidate(&self.queue);
        }
        self.stats.record_removals(references.len() as u64);

        let released = self
            .retention
            .as_ref()
            .map(|r| r.lock().clear())
            .unwrap_or_default();
        drop(released);
        drop(references);

        self.compact();
    }

    /// Purge entries whose values have been released
    ///
    /// Runs implicitly at the start or end of every other operation. Never
    /// blocks and never fails.
    ///
    /// # Returns
    /// * `usize` - Number of entries purged
    pub fn compact(&self) -> usize {
        let mut purged = 0;

        while let Some(slot) = self.queue.poll() {
            // Invalidated references carry no key
            let Some(key) = slot.take_key() else {
                continue;
            };
            let ticket = slot.ticket();
            if self
                .store
                .remove_if(&key, &|reference| reference.ticket() == ticket)
                .is_some()
            {
                purged += 1;
            }
        }

        if purged > 0 {
            self.stats.record_reclaimed(purged as u64);
            trace!(purged, "purged reclaimed entries");
        }
        purged
    }

    /// Release every softly retained value, as under memory pressure
    ///
    /// # Returns
    /// * `usize` - Number of handles released (always 0 in weak mode)
    pub fn reclaim_soft(&self) -> usize {
        let released = self
            .retention
            .as_ref()
            .map(|r| r.lock().clear())
            .unwrap_or_default();
        let count = released.len();
        drop(released);

        if count > 0 {
            debug!(released = count, "soft retention released");
        }
        self.compact();
        count
    }

    /// Number of values kept alive by soft retention
    pub fn retained(&self) -> usize {
        self.retention.as_ref().map_or(0, |r| r.lock().len())
    }

    /// Soft retention bound (0 in weak mode)
    pub fn soft_capacity(&self) -> usize {
        self.retention.as_ref().map_or(0, |r| r.lock().capacity())
    }

    /// Reclamation mode
    pub fn mode(&self) -> CacheMode {
        self.mode
    }

    /// Backing store kind
    pub fn backing(&self) -> BackingStoreKind {
        self.store.kind()
    }

    /// Get cache statistics
    pub fn stats(&self) -> &CacheStats {
        &self.stats
    }
}

impl<K, V> Default for ReferenceCache<K, V>
where
    K: CacheKey,
    V: Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new(BackingStoreKind::Hash, CacheMode::Weak)
    }
}

impl<K, V> fmt::Debug for ReferenceCache<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReferenceCache")
            .field("backing", &self.store.kind())
            .field("mode", &self.mode)
            .field("entries", &self.store.len())
            .field("pending", &self.queue.len())
            .finish()
    }
}
