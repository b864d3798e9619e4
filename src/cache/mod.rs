//! Cache Module
//!
//! In-memory response cache with TTL expiration and pluggable eviction.

mod entry;
mod lru;
mod policy;
mod stats;
mod store;


// Re-export public types
pub use entry::{CacheEntry, CachedResponse};
pub use lru::{LruList, Slot};
pub use policy::{EvictionPolicy, FifoPolicy, LruPolicy};
pub use stats::CacheStats;
pub use store::{CacheInfo, CacheStore, Lookup};

// == Public Constants ==
/// Maximum allowed key length in bytes
pub const MAX_KEY_LENGTH: usize = 2048;

/// Builds the cache key for a request, e.g. `GET:/apps/x`.
pub fn cache_key(method: &str, endpoint: &str) -> String {
    format!("{}:{}", method.to_ascii_uppercase(), endpoint)
}
