//! Cache configuration: reclamation mode and backing store selection

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{CacheError, Result};

/// Default number of strong handles kept alive in [`CacheMode::Soft`]
pub const DEFAULT_SOFT_CAPACITY: usize = 1024;

/// Default shard count for [`BackingStoreKind::Concurrent`]
pub const DEFAULT_SHARDS: usize = 16;

/// Upper bound on the shard count
pub const MAX_SHARDS: usize = 1024;

/// Determines when a cached value becomes eligible for reclamation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheMode {
    /// Values are retained in a bounded least-recently-used set of strong
    /// handles and are reclaimed once released from it with no other owner
    Soft,
    /// Values are reclaimed as soon as no strong handle remains
    #[default]
    Weak,
}

/// Selects the map implementation backing the cache
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackingStoreKind {
    /// Single locked hash map, keys compared by `Eq + Hash`
    #[default]
    Hash,
    /// Single locked map, keys compared by [`identity`](crate::CacheKey::identity)
    Identity,
    /// Sharded map with one lock per shard
    Concurrent,
}

impl fmt::Display for CacheMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheMode::Soft => f.write_str("soft"),
            CacheMode::Weak => f.write_str("weak"),
        }
    }
}

impl FromStr for CacheMode {
    type Err = CacheError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "soft" => Ok(CacheMode::Soft),
            "weak" => Ok(CacheMode::Weak),
            other => Err(CacheError::invalid_config(format!(
                "unknown cache mode '{}' (expected soft or weak)",
                other
            ))),
        }
    }
}

impl fmt::Display for BackingStoreKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackingStoreKind::Hash => f.write_str("hash"),
            BackingStoreKind::Identity => f.write_str("identity"),
            BackingStoreKind::Concurrent => f.write_str("concurrent"),
        }
    }
}

impl FromStr for BackingStoreKind {
    type Err = CacheError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "hash" => Ok(BackingStoreKind::Hash),
            "identity" => Ok(BackingStoreKind::Identity),
            "concurrent" => Ok(BackingStoreKind::Concurrent),
            other => Err(CacheError::invalid_config(format!(
                "unknown backing store '{}' (expected hash, identity or concurrent)",
                other
            ))),
        }
    }
}

/// Construction-time settings for a [`ReferenceCache`](crate::ReferenceCache)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Backing store implementation
    pub backing: BackingStoreKind,

    /// Reclamation mode
    pub mode: CacheMode,

    /// Strong handles retained in soft mode
    pub soft_capacity: usize,

    /// Shard count for the concurrent store
    pub shards: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            backing: BackingStoreKind::default(),
            mode: CacheMode::default(),
            soft_capacity: DEFAULT_SOFT_CAPACITY,
            shards: DEFAULT_SHARDS,
        }
    }
}

impl CacheConfig {
    /// Create a config with the given backing store and mode
    pub fn new(backing: BackingStoreKind, mode: CacheMode) -> Self {
        Self {
            backing,
            mode,
            ..Self::default()
        }
    }

    /// Set the backing store
    pub fn with_backing(mut self, backing: BackingStoreKind) -> Self {
        self.backing = backing;
        self
    }

    /// Set the reclamation mode
    pub fn with_mode(mut self, mode: CacheMode) -> Self {
        self.mode = mode;
        self
    }

    /// Set the soft retention capacity
    pub fn with_soft_capacity(mut self, soft_capacity: usize) -> Self {
        self.soft_capacity = soft_capacity;
        self
    }

    /// Set the shard count
    pub fn with_shards(mut self, shards: usize) -> Self {
        self.shards = shards;
        self
    }

    /// Check parameter ranges
    pub fn validate(&self) -> Result<()> {
        if self.shards == 0 || self.shards > MAX_SHARDS {
            return Err(CacheError::invalid_config(format!(
                "shards must be in 1..={}, got {}",
                MAX_SHARDS, self.shards
            )));
        }
        if self.mode == CacheMode::Soft && self.soft_capacity == 0 {
            return Err(CacheError::invalid_config(
                "soft_capacity must be greater than 0 in soft mode",
            ));
        }
        Ok(())
    }
}
