//! Cache statistics tracking

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Counters describing cache activity
#[derive(Debug, Default)]
pub struct CacheStats {
    hits: AtomicU64,
    misses: AtomicU64,
    inserts: AtomicU64,
    replacements: AtomicU64,
    removals: AtomicU64,
    reclaimed: AtomicU64,
}

/// Point-in-time copy of [`CacheStats`]
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct StatsSnapshot {
    /// Lookups that returned a live value
    pub hits: u64,
    /// Lookups that found no entry or a released value
    pub misses: u64,
    /// Successful puts
    pub inserts: u64,
    /// Puts that replaced an existing entry
    pub replacements: u64,
    /// Entries removed explicitly or by clear
    pub removals: u64,
    /// Entries purged after their value was released
    pub reclaimed: u64,
    /// Hit ratio at the time of the snapshot
    pub hit_ratio: f64,
}

impl CacheStats {
    /// Create new stats tracker
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_insert(&self) {
        self.inserts.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_replacement(&self) {
        self.replacements.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_removals(&self, count: u64) {
        if count > 0 {
            self.removals.fetch_add(count, Ordering::Relaxed);
        }
    }

    pub(crate) fn record_reclaimed(&self, count: u64) {
        if count > 0 {
            self.reclaimed.fetch_add(count, Ordering::Relaxed);
        }
    }

    /// Get total hits
    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    /// Get total misses
    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }

    /// Get total inserts
    pub fn inserts(&self) -> u64 {
        self.inserts.load(Ordering::Relaxed)
    }

    /// Get total replacements
    pub fn replacements(&self) -> u64 {
        self.replacements.load(Ordering::Relaxed)
    }

    /// Get total explicit removals
    pub fn removals(&self) -> u64 {
        self.removals.load(Ordering::Relaxed)
    }

    /// Get total entries purged by compaction
    pub fn reclaimed(&self) -> u64 {
        self.reclaimed.load(Ordering::Relaxed)
    }

    /// Calculate hit ratio (0.0 to 1.0)
    pub fn hit_ratio(&self) -> f64 {
        let hits = self.hits();
        let total = hits + self.misses();
        if total == 0 {
            0.0
        } else {
            hits as f64 / total as f64
        }
    }

    /// Copy all counters
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            hits: self.hits(),
            misses: self.misses(),
            inserts: self.inserts(),
            replacements: self.replacements(),
            removals: self.removals(),
            reclaimed: self.reclaimed(),
            hit_ratio: self.hit_ratio(),
        }
    }

    /// Reset all statistics
    pub fn reset(&self) {
        self.hits.store(0, Ordering::Relaxed);
        self.misses.store(0, Ordering::Relaxed);
        self.inserts.store(0, Ordering::Relaxed);
        self.replacements.store(0, Ordering::Relaxed);
        self.removals.store(0, Ordering::Relaxed);
        self.reclaimed.store(0, Ordering::Relaxed);
    }
}
