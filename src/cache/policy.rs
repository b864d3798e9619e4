//! Eviction Policy Module
//!
//! Pluggable strategies deciding which entry leaves the cache first.

use crate::cache::lru::{LruList, Slot};

// == Eviction Policy ==
/// Hooks the store calls as entries are admitted, used, and removed.
///
/// The store owns the entries; a policy only orders their keys. Every
/// admitted key must be either evicted or forgotten exactly once.
pub trait EvictionPolicy: Send + Sync + 'static {
    /// Short name shown in diagnostics.
    fn name(&self) -> &'static str;

    /// Registers a newly inserted key and returns its handle.
    fn admit(&mut self, key: &str) -> Slot;

    /// Records a read of the entry behind `slot`.
    fn touch(&mut self, slot: Slot);

    /// Drops a key that left the cache for reasons other than eviction.
    fn forget(&mut self, slot: Slot);

    /// Picks and removes the next victim.
    fn evict(&mut self) -> Option<String>;

    /// Number of keys tracked.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Forgets every key.
    fn clear(&mut self);
}

// == LRU Policy ==
/// Evicts the least recently used entry.
///
/// Ordering comes from list position, never from timestamps, so entries
/// sharing a timestamp still evict in insertion order.
#[derive(Debug, Default)]
pub struct LruPolicy {
    list: LruList,
}

impl LruPolicy {
    pub fn new() -> Self {
        Self::default()
    }
}

impl EvictionPolicy for LruPolicy {
    fn name(&self) -> &'static str {
        "lru"
    }

    fn admit(&mut self, key: &str) -> Slot {
        self.list.push_front(key)
    }

    fn touch(&mut self, slot: Slot) {
        self.list.move_to_front(slot);
    }

    fn forget(&mut self, slot: Slot) {
        self.list.remove(slot);
    }

    fn evict(&mut self) -> Option<String> {
        self.list.pop_back()
    }

    fn len(&self) -> usize {
        self.list.len()
    }

    fn clear(&mut self) {
        self.list.clear();
    }
}

// == FIFO Policy ==
/// Evicts the oldest inserted entry; reads do not refresh an entry.
#[derive(Debug, Default)]
pub struct FifoPolicy {
    list: LruList,
}

impl FifoPolicy {
    pub fn new() -> Self {
        Self::default()
    }
}

impl EvictionPolicy for FifoPolicy {
    fn name(&self) -> &'static str {
        "fifo"
    }

    fn admit(&mut self, key: &str) -> Slot {
        self.list.push_front(key)
    }

    fn touch(&mut self, _slot: Slot) {}

    fn forget(&mut self, slot: Slot) {
        self.list.remove(slot);
    }

    fn evict(&mut self) -> Option<String> {
        self.list.pop_back()
    }

    fn len(&self) -> usize {
        self.list.len()
    }

    fn clear(&mut self) {
        self.list.clear();
    }
}
