//! Backing stores mapping keys to cache references
//!
//! Every store offers the same capability set behind [`ReferenceStore`] and
//! locks internally, so the cache itself is shared by `&self`:
//!
//! - [`HashStore`]: one lock, keys compared by `Eq + Hash`
//! - [`IdentityStore`]: one lock, keys compared by [`CacheKey::identity`]
//! - [`ShardedStore`]: one lock per shard; compound operations on a key
//!   run under that key's shard lock

use std::collections::HashMap;
use std::hash::Hash;

use ahash::RandomState;
use parking_lot::{Mutex, RwLock};

use crate::config::BackingStoreKind;
use crate::error::{CacheError, Result};
use crate::key::CacheKey;

/// Uniform map capability set over a backing store
pub(crate) trait ReferenceStore<K, R>: Send + Sync {
    /// Which strategy this store implements
    fn kind(&self) -> BackingStoreKind;

    /// Insert `reference` under `key`, returning the reference it replaced
    fn insert(&self, key: K, reference: R) -> Result<Option<R>>;

    fn get(&self, key: &K) -> Option<R>;

    fn remove(&self, key: &K) -> Option<R>;

    /// Remove the entry for `key` only if `pred` accepts its reference
    fn remove_if(&self, key: &K, pred: &dyn Fn(&R) -> bool) -> Option<R>;

    fn contains_key(&self, key: &K) -> bool;

    fn len(&self) -> usize;

    /// Visit every entry; the visitor must not call back into the store
    fn for_each(&self, f: &mut dyn FnMut(&K, &R));

    /// Remove and return every reference
    fn drain(&self) -> Vec<R>;
}

/// Build the store selected by `kind`
pub(crate) fn open_store<K, R>(
    kind: BackingStoreKind,
    shards: usize,
) -> Box<dyn ReferenceStore<K, R>>
where
    K: CacheKey,
    R: Clone + Send + Sync + 'static,
{
    match kind {
        BackingStoreKind::Hash => Box::new(HashStore::new()),
        BackingStoreKind::Identity => Box::new(IdentityStore::new()),
        BackingStoreKind::Concurrent => Box::new(ShardedStore::new(shards)),
    }
}

/// Single-lock store with equality semantics
pub(crate) struct HashStore<K, R> {
    map: Mutex<HashMap<K, R, RandomState>>,
}

impl<K, R> HashStore<K, R> {
    pub(crate) fn new() -> Self {
        Self {
            map: Mutex::new(HashMap::with_hasher(RandomState::new())),
        }
    }
}

impl<K, R> ReferenceStore<K, R> for HashStore<K, R>
where
    K: CacheKey,
    R: Clone + Send + Sync,
{
    fn kind(&self) -> BackingStoreKind {
        BackingStoreKind::Hash
    }

    fn insert(&self, key: K, reference: R) -> Result<Option<R>> {
        Ok(self.map.lock().insert(key, reference))
    }

    fn get(&self, key: &K) -> Option<R> {
        self.map.lock().get(key).cloned()
    }

    fn remove(&self, key: &K) -> Option<R> {
        self.map.lock().remove(key)
    }

    fn remove_if(&self, key: &K, pred: &dyn Fn(&R) -> bool) -> Option<R> {
        let mut map = self.map.lock();
        if map.get(key).is_some_and(|r| pred(r)) {
            map.remove(key)
        } else {
            None
        }
    }

    fn contains_key(&self, key: &K) -> bool {
        self.map.lock().contains_key(key)
    }

    fn len(&self) -> usize {
        self.map.lock().len()
    }

    fn for_each(&self, f: &mut dyn FnMut(&K, &R)) {
        for (key, reference) in self.map.lock().iter() {
            f(key, reference);
        }
    }

    fn drain(&self) -> Vec<R> {
        self.map.lock().drain().map(|(_, r)| r).collect()
    }
}

/// Single-lock store keyed by key identity
pub(crate) struct IdentityStore<K, R> {
    map: Mutex<HashMap<u64, (K, R), RandomState>>,
}

impl<K, R> IdentityStore<K, R> {
    pub(crate) fn new() -> Self {
        Self {
            map: Mutex::new(HashMap::with_hasher(RandomState::new())),
        }
    }
}

impl<K, R> ReferenceStore<K, R> for IdentityStore<K, R>
where
    K: CacheKey,
    R: Clone + Send + Sync,
{
    fn kind(&self) -> BackingStoreKind {
        BackingStoreKind::Identity
    }

    fn insert(&self, key: K, reference: R) -> Result<Option<R>> {
        let id = key.identity().ok_or_else(|| {
            CacheError::invalid_argument("key has no identity for an identity-keyed cache")
        })?;
        Ok(self.map.lock().insert(id, (key, reference)).map(|(_, r)| r))
    }

    fn get(&self, key: &K) -> Option<R> {
        let id = key.identity()?;
        self.map.lock().get(&id).map(|(_, r)| r.clone())
    }

    fn remove(&self, key: &K) -> Option<R> {
        let id = key.identity()?;
        self.map.lock().remove(&id).map(|(_, r)| r)
    }

    fn remove_if(&self, key: &K, pred: &dyn Fn(&R) -> bool) -> Option<R> {
        let id = key.identity()?;
        let mut map = self.map.lock();
        if map.get(&id).is_some_and(|(_, r)| pred(r)) {
            map.remove(&id).map(|(_, r)| r)
        } else {
            None
        }
    }

    fn contains_key(&self, key: &K) -> bool {
        match key.identity() {
            Some(id) => self.map.lock().contains_key(&id),
            None => false,
        }
    }

    fn len(&self) -> usize {
        self.map.lock().len()
    }

    fn for_each(&self, f: &mut dyn FnMut(&K, &R)) {
        for (key, reference) in self.map.lock().values() {
            f(key, reference);
        }
    }

    fn drain(&self) -> Vec<R> {
        self.map.lock().drain().map(|(_, (_, r))| r).collect()
    }
}

/// Deterministic key-to-shard mapping using a seeded hash
#[derive(Clone)]
pub(crate) struct ShardSelector {
    shards: usize,
    hasher: RandomState,
}

impl ShardSelector {
    pub(crate) fn new(shards: usize, seed: u64) -> Self {
        Self {
            shards: shards.max(1),
            hasher: RandomState::with_seeds(seed, seed ^ 0x9e37_79b9_7f4a_7c15, 0, 0),
        }
    }

    pub(crate) fn shard_count(&self) -> usize {
        self.shards
    }

    pub(crate) fn shard_for_key<K: Hash + ?Sized>(&self, key: &K) -> usize {
        (self.hasher.hash_one(key) % self.shards as u64) as usize
    }
}

/// Striped store: independent locked maps selected by key hash
pub(crate) struct ShardedStore<K, R> {
    shards: Box<[RwLock<HashMap<K, R, RandomState>>]>,
    selector: ShardSelector,
}

impl<K: Hash, R> ShardedStore<K, R> {
    pub(crate) fn new(shards: usize) -> Self {
        let selector = ShardSelector::new(shards, 0);
        let shards = (0..selector.shard_count())
            .map(|_| RwLock::new(HashMap::with_hasher(RandomState::new())))
            .collect();
        Self { shards, selector }
    }

    fn shard(&self, key: &K) -> &RwLock<HashMap<K, R, RandomState>> {
        &self.shards[self.selector.shard_for_key(key)]
    }
}

impl<K, R> ReferenceStore<K, R> for ShardedStore<K, R>
where
    K: CacheKey,
    R: Clone + Send + Sync,
{
    fn kind(&self) -> BackingStoreKind {
        BackingStoreKind::Concurrent
    }

    fn insert(&self, key: K, reference: R) -> Result<Option<R>> {
        Ok(self.shard(&key).write().insert(key, reference))
    }

    fn get(&self, key: &K) -> Option<R> {
        self.shard(key).read().get(key).cloned()
    }

    fn remove(&self, key: &K) -> Option<R> {
        self.shard(key).write().remove(key)
    }

    fn remove_if(&self, key: &K, pred: &dyn Fn(&R) -> bool) -> Option<R> {
        let mut shard = self.shard(key).write();
        if shard.get(key).is_some_and(|r| pred(r)) {
            shard.remove(key)
        } else {
            None
        }
    }

    fn contains_key(&self, key: &K) -> bool {
        self.shard(key).read().contains_key(key)
    }

    fn len(&self) -> usize {
        self.shards.iter().map(|s| s.read().len()).sum()
    }

    fn for_each(&self, f: &mut dyn FnMut(&K, &R)) {
        for shard in self.shards.iter() {
            for (key, reference) in shard.read().iter() {
                f(key, reference);
            }
        }
    }

    fn drain(&self) -> Vec<R> {
        let mut out = Vec::new();
        for shard in self.shards.iter() {
            out.extend(shard.write().drain().map(|(_, r)| r));
        }
        out
    }
}
