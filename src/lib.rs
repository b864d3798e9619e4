//! nexcache - local resilience layer for a remote control-plane API
//!
//! A disk-backed LRU response cache, an offline detector and a durable
//! queue of mutating operations replayed once connectivity returns.

pub mod cache;
pub mod cli;
pub mod config;
pub mod error;
pub mod manager;
pub mod models;
pub mod offline;
pub mod queue;
pub mod storage;
pub mod transport;

pub use cache::{cache_key, CachedResponse, EvictionPolicy, FifoPolicy, LruPolicy};
pub use config::Config;
pub use error::{CacheError, Result};
pub use manager::{CacheManager, Dispatch};
pub use offline::{OfflineDetector, OfflineMode};
pub use queue::{Operation, OperationQueue, SyncReport};
pub use transport::{HttpTransport, Transport, TransportRequest, TransportResponse};
