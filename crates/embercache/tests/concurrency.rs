use std::thread;

use embercache::{BackingStoreKind, CacheConfig, CacheMode, Handle, ReferenceCache};

const THREADS: u64 = 8;
const PER_THREAD: u64 = 200;

fn concurrent_cache() -> ReferenceCache<u64, u64> {
    ReferenceCache::with_config(
        CacheConfig::new(BackingStoreKind::Concurrent, CacheMode::Weak).with_shards(8),
    )
    .unwrap()
}

#[test]
fn test_parallel_puts_keep_only_held_values() {
    let cache = concurrent_cache();

    let kept: Vec<Vec<Handle<u64>>> = thread::scope(|s| {
        let workers: Vec<_> = (0..THREADS)
            .map(|t| {
                let cache = &cache;
                s.spawn(move || {
                    let mut kept = Vec::new();
                    for i in 0..PER_THREAD {
                        let key = t * PER_THREAD + i;
                        let value = Handle::new(key);
                        cache.put(key, &value).unwrap();
                        assert_eq!(cache.get(&key).map(|h| *h), Some(key));
                        if i % 2 == 0 {
                            kept.push(value);
                        }
                    }
                    kept
                })
            })
            .collect();
        workers.into_iter().map(|w| w.join().unwrap()).collect()
    });

    let held: usize = kept.iter().map(Vec::len).sum();
    assert_eq!(held as u64, THREADS * PER_THREAD / 2);
    assert_eq!(cache.len(), held);

    for value in kept.iter().flatten() {
        assert!(cache.contains_key(&**value));
    }

    drop(kept);
    assert!(cache.is_empty());
    assert_eq!(cache.stats().reclaimed(), THREADS * PER_THREAD);
}

#[test]
fn test_racing_overwrites_leave_one_entry() {
    let cache = concurrent_cache();
    let values: Vec<Handle<u64>> = (0..THREADS * 50).map(Handle::new).collect();

    thread::scope(|s| {
        for chunk in values.chunks(50) {
            let cache = &cache;
            s.spawn(move || {
                for value in chunk {
                    cache.put(42u64, value).unwrap();
                }
            });
        }
    });

    assert_eq!(cache.len(), 1);
    let current = cache.get(&42).unwrap();
    assert!(values.iter().any(|v| Handle::ptr_eq(v, &current)));

    // Releasing every replaced value leaves the current entry alone
    let survivor = current.clone();
    drop(current);
    drop(values);
    assert!(cache.contains_key(&42));

    drop(survivor);
    assert!(!cache.contains_key(&42));
}

#[test]
fn test_values_released_on_other_threads_are_purged() {
    let cache: ReferenceCache<u64, String> =
        ReferenceCache::new(BackingStoreKind::Hash, CacheMode::Weak);
    let values: Vec<Handle<String>> = (0..64).map(|i| Handle::new(format!("v{}", i))).collect();

    for (i, value) in values.iter().enumerate() {
        cache.put(i as u64, value).unwrap();
    }
    assert_eq!(cache.len(), 64);

    thread::spawn(move || drop(values)).join().unwrap();

    assert_eq!(cache.compact(), 64);
    assert!(cache.is_empty());
}

#[test]
fn test_soft_cache_shared_across_threads() {
    let cache: ReferenceCache<u64, u64> = ReferenceCache::with_config(
        CacheConfig::new(BackingStoreKind::Concurrent, CacheMode::Soft).with_soft_capacity(64),
    )
    .unwrap();

    thread::scope(|s| {
        for t in 0..4u64 {
            let cache = &cache;
            s.spawn(move || {
                for i in 0..100 {
                    let key = t * 100 + i;
                    cache.put(key, &Handle::new(key)).unwrap();
                }
            });
        }
    });

    assert_eq!(cache.retained(), 64);
    assert_eq!(cache.len(), 64);

    cache.reclaim_soft();
    assert!(cache.is_empty());
}

#[test]
fn test_soft_reads_racing_overwrites_do_not_pin_replaced_values() {
    let cache: ReferenceCache<u64, u64> = ReferenceCache::with_config(
        CacheConfig::new(BackingStoreKind::Concurrent, CacheMode::Soft).with_soft_capacity(1024),
    )
    .unwrap();

    for _ in 0..20 {
        thread::scope(|s| {
            let cache = &cache;
            s.spawn(move || {
                for i in 0..2000u64 {
                    cache.put(7u64, &Handle::new(i)).unwrap();
                }
            });
            for _ in 0..3 {
                s.spawn(move || {
                    for _ in 0..2000 {
                        let _ = cache.get(&7);
                    }
                });
            }
        });

        assert_eq!(cache.len(), 1);
        assert_eq!(cache.retained(), 1);
    }
}
