//! Configuration Module
//!
//! Handles loading and managing cache configuration from environment variables.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Default API base URL probed for reachability and used for replays.
pub const DEFAULT_BASE_URL: &str = "https://service.api.nexlayer.ai";

/// Cache configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// Directory holding one JSON file per cache entry
    pub cache_dir: PathBuf,
    /// Directory holding `pending_operations.json`
    pub config_dir: PathBuf,
    /// Maximum total body bytes held by the cache
    pub max_size_bytes: u64,
    /// Maximum number of entries the cache can hold
    pub max_entries: usize,
    /// Entry TTL in seconds, measured from when the response was cached
    pub ttl: u64,
    /// Base URL of the remote API
    pub base_url: String,
    /// Bearer token attached to replayed and fetched requests
    pub api_token: Option<String>,
    /// Health probe timeout in seconds
    pub network_timeout: u64,
    /// Timeout in seconds for replayed and fetched requests
    pub request_timeout: u64,
    /// Minimum seconds between two reachability probes
    pub offline_debounce: u64,
    /// Minimum seconds between two automatic syncs
    pub auto_sync_interval: u64,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `NEXCACHE_CACHE_DIR` - Cache entry directory (default: ~/.nexlayer/cache)
    /// - `NEXCACHE_CONFIG_DIR` - Queue directory (default: ~/.nexlayer)
    /// - `NEXCACHE_MAX_SIZE_BYTES` - Byte budget (default: 50 MiB)
    /// - `NEXCACHE_MAX_ENTRIES` - Maximum cache entries (default: 1000)
    /// - `NEXCACHE_TTL` - Entry TTL in seconds (default: 300)
    /// - `NEXCACHE_BASE_URL` - Remote API base URL
    /// - `NEXCACHE_API_TOKEN` - Optional bearer token
    /// - `NEXCACHE_NETWORK_TIMEOUT` - Health probe timeout (default: 5)
    /// - `NEXCACHE_REQUEST_TIMEOUT` - Replay/fetch timeout (default: 30)
    /// - `NEXCACHE_OFFLINE_DEBOUNCE` - Probe debounce window (default: 60)
    /// - `NEXCACHE_AUTO_SYNC_INTERVAL` - Auto sync interval (default: 1800)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            cache_dir: env::var("NEXCACHE_CACHE_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.cache_dir),
            config_dir: env::var("NEXCACHE_CONFIG_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.config_dir),
            max_size_bytes: parse_var("NEXCACHE_MAX_SIZE_BYTES").unwrap_or(defaults.max_size_bytes),
            max_entries: parse_var("NEXCACHE_MAX_ENTRIES").unwrap_or(defaults.max_entries),
            ttl: parse_var("NEXCACHE_TTL").unwrap_or(defaults.ttl),
            base_url: env::var("NEXCACHE_BASE_URL").unwrap_or(defaults.base_url),
            api_token: env::var("NEXCACHE_API_TOKEN")
                .ok()
                .filter(|token| !token.is_empty()),
            network_timeout: parse_var("NEXCACHE_NETWORK_TIMEOUT")
                .unwrap_or(defaults.network_timeout),
            request_timeout: parse_var("NEXCACHE_REQUEST_TIMEOUT")
                .unwrap_or(defaults.request_timeout),
            offline_debounce: parse_var("NEXCACHE_OFFLINE_DEBOUNCE")
                .unwrap_or(defaults.offline_debounce),
            auto_sync_interval: parse_var("NEXCACHE_AUTO_SYNC_INTERVAL")
                .unwrap_or(defaults.auto_sync_interval),
        }
    }

    /// Creates a config rooted at `root`, with entries in `root/cache`.
    pub fn rooted_at(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        Self {
            cache_dir: root.join("cache"),
            config_dir: root,
            ..Self::default()
        }
    }

    /// Path of the persisted pending-operation queue.
    pub fn pending_operations_path(&self) -> PathBuf {
        self.config_dir.join("pending_operations.json")
    }

    pub fn ttl_duration(&self) -> Duration {
        Duration::from_secs(self.ttl)
    }

    pub fn network_timeout_duration(&self) -> Duration {
        Duration::from_secs(self.network_timeout)
    }

    pub fn request_timeout_duration(&self) -> Duration {
        Duration::from_secs(self.request_timeout)
    }

    pub fn offline_debounce_duration(&self) -> Duration {
        Duration::from_secs(self.offline_debounce)
    }

    pub fn auto_sync_interval_duration(&self) -> Duration {
        Duration::from_secs(self.auto_sync_interval)
    }
}

fn parse_var<T: std::str::FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|v| v.parse().ok())
}

/// Root directory for all persisted state (`~/.nexlayer`).
fn default_root() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".nexlayer")
}

impl Default for Config {
    fn default() -> Self {
        let root = default_root();
        Self {
            cache_dir: root.join("cache"),
            config_dir: root,
            max_size_bytes: 50 * 1024 * 1024,
            max_entries: 1000,
            ttl: 300,
            base_url: DEFAULT_BASE_URL.to_string(),
            api_token: None,
            network_timeout: 5,
            request_timeout: 30,
            offline_debounce: 60,
            auto_sync_interval: 30 * 60,
        }
    }
}
