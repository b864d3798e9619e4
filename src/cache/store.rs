//! Cache Store Module
//!
//! In-memory cache index combining a HashMap with a pluggable eviction
//! policy, byte/count bounds and TTL checks. Performs no I/O; the manager
//! mirrors every admission and removal onto disk.

use std::collections::HashMap;
use std::time::Duration;

use chrono::Utc;
use tracing::debug;

use crate::cache::{CacheEntry, CacheStats, CachedResponse, EvictionPolicy, LruPolicy};
use crate::error::{CacheError, Result};

// == Lookup ==
/// Outcome of a single-key lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup {
    /// Fresh entry; it is now the most recently used
    Hit(CachedResponse),
    /// Entry was stale and has been dropped from memory
    Expired,
    Miss,
}

// == Cache Info ==
/// Snapshot row describing one cached entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheInfo {
    pub key: String,
    pub size_bytes: u64,
}

// == Cache Store ==
/// Bounded cache index with eviction and TTL support.
#[derive(Debug)]
pub struct CacheStore<P: EvictionPolicy = LruPolicy> {
    /// Key to entry storage
    entries: HashMap<String, CacheEntry>,
    /// Eviction order
    policy: P,
    /// Sum of `size_bytes` over all entries
    current_size: u64,
    /// Performance statistics
    stats: CacheStats,
    max_size_bytes: u64,
    max_entries: usize,
    ttl: Duration,
}

impl CacheStore<LruPolicy> {
    // == Constructor ==
    /// Creates a new LRU CacheStore with the given bounds and TTL.
    pub fn new(max_size_bytes: u64, max_entries: usize, ttl: Duration) -> Self {
        Self::with_policy(LruPolicy::new(), max_size_bytes, max_entries, ttl)
    }
}

impl<P: EvictionPolicy> CacheStore<P> {
    /// Creates a new CacheStore evicting according to `policy`.
    pub fn with_policy(policy: P, max_size_bytes: u64, max_entries: usize, ttl: Duration) -> Self {
        Self {
            entries: HashMap::new(),
            policy,
            current_size: 0,
            stats: CacheStats::new(),
            max_size_bytes,
            max_entries,
            ttl,
        }
    }

    // == Insert ==
    /// Admits a response under `key`, evicting until it fits.
    ///
    /// An existing entry for `key` is replaced. Returns the keys evicted to
    /// make room so their backing files can be deleted.
    pub fn insert(&mut self, key: String, response: CachedResponse) -> Result<Vec<String>> {
        let size = response.body.len() as u64;

        if size > self.max_size_bytes {
            return Err(CacheError::CacheFull(format!(
                "entry of {} bytes exceeds the {} byte cache budget",
                size, self.max_size_bytes
            )));
        }
        if self.max_entries == 0 {
            return Err(CacheError::CacheFull(
                "cache is configured to hold no entries".to_string(),
            ));
        }

        // Replacing a key releases its old size before bounds are checked
        self.detach(&key);

        let mut evicted = Vec::new();
        while self.current_size + size > self.max_size_bytes || self.entries.len() >= self.max_entries
        {
            match self.evict_one() {
                Some(victim) => evicted.push(victim),
                None => {
                    return Err(CacheError::CacheFull(
                        "eviction made no progress".to_string(),
                    ))
                }
            }
        }

        let slot = self.policy.admit(&key);
        self.entries
            .insert(key.clone(), CacheEntry::new(key, response, slot));
        self.current_size += size;
        self.sync_occupancy();

        Ok(evicted)
    }

    // == Get ==
    /// Looks up `key`, dropping it if stale and refreshing it otherwise.
    ///
    /// Lookup, expiry check and touch all happen under the caller's single
    /// `&mut` borrow, so no other writer can evict the entry in between.
    pub fn get(&mut self, key: &str) -> Lookup {
        let ttl = self.ttl;
        let Some(entry) = self.entries.get_mut(key) else {
            self.stats.record_miss();
            return Lookup::Miss;
        };

        if entry.response.is_expired(ttl) {
            self.detach(key);
            self.stats.record_expiration();
            self.stats.record_miss();
            self.sync_occupancy();
            return Lookup::Expired;
        }

        entry.last_used_at = Utc::now();
        let response = entry.response.clone();
        let slot = entry.slot;
        self.policy.touch(slot);
        self.stats.record_hit();
        Lookup::Hit(response)
    }

    // == Peek ==
    /// Returns the entry without touching recency or statistics.
    pub fn peek(&self, key: &str) -> Option<&CacheEntry> {
        self.entries.get(key)
    }

    /// Returns true when the entry exists and is stale.
    pub fn is_expired(&self, key: &str) -> bool {
        self.entries
            .get(key)
            .is_some_and(|entry| entry.response.is_expired(self.ttl))
    }

    // == Remove ==
    /// Removes an entry by key, returning it if present.
    pub fn remove(&mut self, key: &str) -> Option<CacheEntry> {
        let removed = self.detach(key);
        self.sync_occupancy();
        removed
    }

    /// Removes `key` only if it is still stale, counting it as an expiration.
    pub fn remove_expired(&mut self, key: &str) -> bool {
        if !self.is_expired(key) {
            return false;
        }
        self.detach(key);
        self.stats.record_expiration();
        self.sync_occupancy();
        true
    }

    // == Clear ==
    /// Drops every entry and resets the size counter.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.policy.clear();
        self.current_size = 0;
        self.sync_occupancy();
    }

    // == List ==
    /// Returns a key-sorted snapshot of all entries.
    pub fn list(&self) -> Vec<CacheInfo> {
        let mut items: Vec<CacheInfo> = self
            .entries
            .values()
            .map(|entry| CacheInfo {
                key: entry.key.clone(),
                size_bytes: entry.size_bytes,
            })
            .collect();
        items.sort_by(|a, b| a.key.cmp(&b.key));
        items
    }

    pub fn stats(&self) -> CacheStats {
        self.stats.clone()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Current sum of cached body sizes.
    pub fn current_size(&self) -> u64 {
        self.current_size
    }

    pub fn max_size_bytes(&self) -> u64 {
        self.max_size_bytes
    }

    pub fn max_entries(&self) -> usize {
        self.max_entries
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn policy_name(&self) -> &'static str {
        self.policy.name()
    }

    fn evict_one(&mut self) -> Option<String> {
        let victim = self.policy.evict()?;
        if let Some(entry) = self.entries.remove(&victim) {
            self.current_size -= entry.size_bytes;
        }
        self.stats.record_eviction();
        debug!(key = %victim, "Evicted cache entry");
        Some(victim)
    }

    /// Removes an entry from the map and the policy together.
    fn detach(&mut self, key: &str) -> Option<CacheEntry> {
        let entry = self.entries.remove(key)?;
        self.policy.forget(entry.slot);
        self.current_size -= entry.size_bytes;
        Some(entry)
    }

    fn sync_occupancy(&mut self) {
        self.stats
            .set_occupancy(self.entries.len(), self.current_size);
    }
}
