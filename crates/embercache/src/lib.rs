//! # embercache
//!
//! Reference cache whose values are evicted once nothing else owns them.
//!
//! ## Architecture
//! - **Handle**: shared-ownership value handle; its final drop notifies observers
//! - **Reclamation queue**: lock-free queue of released references, drained
//!   lazily by every cache operation
//! - **Stores**: hash, identity or sharded backing maps behind one interface
//! - **Soft retention**: bounded LRU of strong handles for soft mode
//!
//! ## Example
//! ```
//! use embercache::{BackingStoreKind, CacheMode, Handle, ReferenceCache};
//!
//! let cache: ReferenceCache<String, Vec<u8>> =
//!     ReferenceCache::new(BackingStoreKind::Hash, CacheMode::Weak);
//!
//! let texture = Handle::new(vec![0u8; 16]);
//! cache.put("texture".to_string(), &texture).unwrap();
//! assert!(cache.get(&"texture".to_string()).is_some());
//!
//! // The cache does not keep values alive
//! drop(texture);
//! assert!(!cache.contains_key(&"texture".to_string()));
//! ```

#![warn(missing_docs)]

mod cache;
mod config;
mod error;
mod handle;
mod key;
mod queue;
mod reference;
mod retention;
mod stats;
mod store;

pub use cache::ReferenceCache;
pub use config::{
    BackingStoreKind, CacheConfig, CacheMode, DEFAULT_SHARDS, DEFAULT_SOFT_CAPACITY, MAX_SHARDS,
};
pub use error::{CacheError, Result};
pub use handle::{Handle, WeakHandle};
pub use key::CacheKey;
pub use stats::{CacheStats, StatsSnapshot};
