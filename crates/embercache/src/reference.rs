//! Reclaimable references held by the cache

use std::sync::{Arc, Weak};

use crate::handle::{Handle, Probe, Referent};
use crate::queue::{KeySlot, ReclamationQueue};

/// Weak observer of a cached value plus the slot used to find its entry
/// again once the value is released
pub(crate) struct CacheReference<K, V> {
    slot: Arc<KeySlot<K>>,
    target: Weak<Referent<V>>,
}

impl<K, V> CacheReference<K, V>
where
    K: Send + 'static,
{
    pub(crate) fn new(ticket: u64, key: K, value: &Handle<V>) -> Self {
        Self {
            slot: Arc::new(KeySlot::new(ticket, key)),
            target: value.weak_referent(),
        }
    }

    /// Arrange for the slot to reach `queue` when `value` is released
    pub(crate) fn register(&self, value: &Handle<V>, queue: &Arc<ReclamationQueue<K>>) {
        value.referent().attach(Box::new(Registration {
            slot: Arc::clone(&self.slot),
            queue: Arc::downgrade(queue),
        }));
    }

    pub(crate) fn ticket(&self) -> u64 {
        self.slot.ticket()
    }

    /// Strong handle to the value, if it is still owned
    pub(crate) fn get(&self) -> Option<Handle<V>> {
        self.target.upgrade().map(Handle::from_referent)
    }

    /// Detach this reference from its key and queue it as already processed.
    ///
    /// Must run before the reference is discarded: a release notification
    /// arriving later then carries no key and cannot remove the entry that
    /// replaced this one.
    pub(crate) fn invalidate(&self, queue: &ReclamationQueue<K>) {
        self.slot.clear();
        queue.enqueue(Arc::clone(&self.slot));
    }
}

impl<K, V> Clone for CacheReference<K, V> {
    fn clone(&self) -> Self {
        Self {
            slot: Arc::clone(&self.slot),
            target: Weak::clone(&self.target),
        }
    }
}

/// Probe delivering a slot to the owning cache's queue
struct Registration<K> {
    slot: Arc<KeySlot<K>>,
    queue: Weak<ReclamationQueue<K>>,
}

impl<K: Send + 'static> Probe for Registration<K> {
    fn is_live(&self) -> bool {
        self.queue.strong_count() > 0 && self.slot.is_pending()
    }

    fn fire(self: Box<Self>) {
        if let Some(queue) = self.queue.upgrade() {
            queue.enqueue(self.slot);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_release_enqueues_key() {
        let queue = Arc::new(ReclamationQueue::new());
        let value = Handle::new(10u32);
        let reference = CacheReference::new(1, "a", &value);
        reference.register(&value, &queue);

        assert_eq!(reference.get().map(|h| *h), Some(10));
        assert_eq!(queue.len(), 0);

        drop(value);
        assert!(reference.get().is_none());

        let slot = queue.poll().unwrap();
        assert_eq!(slot.ticket(), 1);
        assert_eq!(slot.take_key(), Some("a"));
    }

    #[test]
    fn test_invalidated_reference_carries_no_key() {
        let queue = Arc::new(ReclamationQueue::new());
        let value = Handle::new(10u32);
        let reference = CacheReference::new(2, "a", &value);
        reference.register(&value, &queue);

        reference.invalidate(&queue);
        drop(value);

        // Pre-emptive enqueue happened once; the release did not queue again
        let slot = queue.poll().unwrap();
        assert_eq!(slot.take_key(), None);
        assert!(queue.poll().is_none());
    }

    #[test]
    fn test_release_after_queue_dropped() {
        let queue = Arc::new(ReclamationQueue::new());
        let value = Handle::new(1u8);
        let reference = CacheReference::new(3, 7u32, &value);
        reference.register(&value, &queue);

        drop(queue);
        drop(value);
        assert!(reference.get().is_none());
    }
}
