//! Reclamation queue and per-reference key slots

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crossbeam_queue::SegQueue;
use parking_lot::Mutex;

/// Recovery metadata of one cache reference.
///
/// Holds the key the reference was stored under until it is taken by
/// compaction or cleared by invalidation. A slot reaches the queue at most
/// once.
pub(crate) struct KeySlot<K> {
    ticket: u64,
    key: Mutex<Option<K>>,
    enqueued: AtomicBool,
}

impl<K> KeySlot<K> {
    pub(crate) fn new(ticket: u64, key: K) -> Self {
        Self {
            ticket,
            key: Mutex::new(Some(key)),
            enqueued: AtomicBool::new(false),
        }
    }

    pub(crate) fn ticket(&self) -> u64 {
        self.ticket
    }

    /// Take the key, leaving the slot empty
    pub(crate) fn take_key(&self) -> Option<K> {
        self.key.lock().take()
    }

    /// Forget the key so a later notification for this slot is ignored
    pub(crate) fn clear(&self) {
        self.key.lock().take();
    }

    /// Whether the slot still carries a key and has not been queued
    pub(crate) fn is_pending(&self) -> bool {
        !self.enqueued.load(Ordering::Acquire) && self.key.lock().is_some()
    }

    /// Claim the right to enqueue; true only on the first call
    fn mark_enqueued(&self) -> bool {
        !self.enqueued.swap(true, Ordering::AcqRel)
    }
}

/// Non-blocking multi-producer queue of reclaimed references
pub(crate) struct ReclamationQueue<K> {
    slots: SegQueue<Arc<KeySlot<K>>>,
}

impl<K> ReclamationQueue<K> {
    pub(crate) fn new() -> Self {
        Self {
            slots: SegQueue::new(),
        }
    }

    /// Push a slot unless it has been queued before
    pub(crate) fn enqueue(&self, slot: Arc<KeySlot<K>>) -> bool {
        if slot.mark_enqueued() {
            self.slots.push(slot);
            true
        } else {
            false
        }
    }

    /// Pop the next slot if one is available
    pub(crate) fn poll(&self) -> Option<Arc<KeySlot<K>>> {
        self.slots.pop()
    }

    pub(crate) fn len(&self) -> usize {
        self.slots.len()
    }
}
