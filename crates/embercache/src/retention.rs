//! Soft retention: bounded LRU set of strong handles
//!
//! In soft mode the cache keeps the most recently used values alive even
//! without an external owner. Overflowing the set, or an explicit pressure
//! signal, releases the least recently used handles and makes their values
//! reclaimable.
//!
//! Uses a slab-backed doubly-linked list for O(1) refresh and release.

use std::collections::HashMap;

use ahash::RandomState;

use crate::handle::Handle;

struct Node<V> {
    ticket: u64,
    handle: Handle<V>,
    prev: Option<usize>,
    next: Option<usize>,
}

/// Fixed-capacity LRU of retained handles keyed by reference ticket
pub(crate) struct SoftRetention<V> {
    index: HashMap<u64, usize, RandomState>,
    nodes: Vec<Option<Node<V>>>,
    head: Option<usize>,
    tail: Option<usize>,
    free_list: Vec<usize>,
    capacity: usize,
}

impl<V> SoftRetention<V> {
    pub(crate) fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            index: HashMap::with_capacity_and_hasher(capacity.min(4096), RandomState::new()),
            nodes: Vec::new(),
            head: None,
            tail: None,
            free_list: Vec::new(),
            capacity,
        }
    }

    /// Retain `handle` under `ticket` as the most recently used entry.
    ///
    /// Returns the handle pushed out by the capacity bound, if any. The
    /// caller drops it once no lock is held.
    pub(crate) fn retain(&mut self, ticket: u64, handle: Handle<V>) -> Option<Handle<V>> {
        if let Some(&idx) = self.index.get(&ticket) {
            if let Some(node) = &mut self.nodes[idx] {
                node.handle = handle;
            }
            self.move_to_front(idx);
            return None;
        }

        let evicted = if self.index.len() >= self.capacity {
            self.evict()
        } else {
            None
        };

        let idx = self.alloc_node();
        self.nodes[idx] = Some(Node {
            ticket,
            handle,
            prev: None,
            next: self.head,
        });

        if let Some(head_idx) = self.head {
            if let Some(head) = &mut self.nodes[head_idx] {
                head.prev = Some(idx);
            }
        }

        self.head = Some(idx);
        if self.tail.is_none() {
            self.tail = Some(idx);
        }

        self.index.insert(ticket, idx);
        evicted
    }

    /// Mark `ticket` as most recently used; false if it is not retained
    pub(crate) fn touch(&mut self, ticket: u64) -> bool {
        match self.index.get(&ticket) {
            Some(&idx) => {
                self.move_to_front(idx);
                true
            }
            None => false,
        }
    }

    /// Stop retaining `ticket`, handing its handle back
    pub(crate) fn release(&mut self, ticket: u64) -> Option<Handle<V>> {
        let idx = self.index.remove(&ticket)?;
        self.unlink(idx);
        self.free_node(idx);
        self.nodes[idx].take().map(|node| node.handle)
    }

    /// Release every handle, returning them in no particular order
    pub(crate) fn clear(&mut self) -> Vec<Handle<V>> {
        let released = self
            .nodes
            .drain(..)
            .flatten()
            .map(|node| node.handle)
            .collect();
        self.index.clear();
        self.free_list.clear();
        self.head = None;
        self.tail = None;
        released
    }

    pub(crate) fn len(&self) -> usize {
        self.index.len()
    }

    pub(crate) fn capacity(&self) -> usize {
        self.capacity
    }

    fn move_to_front(&mut self, idx: usize) {
        if self.head == Some(idx) {
            return;
        }

        self.unlink(idx);

        if let Some(node) = &mut self.nodes[idx] {
            node.prev = None;
            node.next = self.head;
        }

        if let Some(head_idx) = self.head {
            if let Some(head) = &mut self.nodes[head_idx] {
                head.prev = Some(idx);
            }
        }

        self.head = Some(idx);
    }

    fn unlink(&mut self, idx: usize) {
        let (prev, next) = match &self.nodes[idx] {
            Some(node) => (node.prev, node.next),
            None => return,
        };

        match prev {
            Some(prev_idx) => {
                if let Some(prev_node) = &mut self.nodes[prev_idx] {
                    prev_node.next = next;
                }
            }
            None => self.head = next,
        }

        match next {
            Some(next_idx) => {
                if let Some(next_node) = &mut self.nodes[next_idx] {
                    next_node.prev = prev;
                }
            }
            None => self.tail = prev,
        }
    }

    fn evict(&mut self) -> Option<Handle<V>> {
        let tail_idx = self.tail?;
        // Unlink before taking the node so the tail pointer moves
        self.unlink(tail_idx);
        let node = self.nodes[tail_idx].take()?;
        self.index.remove(&node.ticket);
        self.free_node(tail_idx);
        Some(node.handle)
    }

    fn alloc_node(&mut self) -> usize {
        if let Some(idx) = self.free_list.pop() {
            idx
        } else {
            let idx = self.nodes.len();
            self.nodes.push(None);
            idx
        }
    }

    fn free_node(&mut self, idx: usize) {
        self.free_list.push(idx);
    }
}
