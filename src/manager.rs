//! Cache Manager
//!
//! The entry point the rest of a client uses: a bounded, disk-backed
//! response cache plus the offline detector and operation queue.
//!
//! The in-memory index and its files form one unit guarded by a single
//! `RwLock`; every admission, eviction and removal updates both before the
//! lock is released. Offline state and the queue have their own locks.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::cache::{
    cache_key, CacheInfo, CacheStats, CacheStore, CachedResponse, EvictionPolicy, Lookup,
    LruPolicy, MAX_KEY_LENGTH,
};
use crate::config::Config;
use crate::error::{CacheError, Result};
use crate::models::StatusReport;
use crate::offline::{OfflineDetector, OfflineMode};
use crate::queue::{self, Operation, OperationQueue, SyncReport};
use crate::storage::{DiskStore, QueueFile};
use crate::transport::{Transport, TransportRequest, TransportResponse};

// == Dispatch ==
/// What happened to a mutating call handed to [`CacheManager::execute_or_queue`].
#[derive(Debug, Clone, PartialEq)]
pub enum Dispatch {
    /// The remote API answered (with any status)
    Sent(TransportResponse),
    /// The API was unreachable; the call was queued for the next sync
    Queued(Operation),
}

// == Cache Manager ==
pub struct CacheManager<P: EvictionPolicy = LruPolicy> {
    store: RwLock<CacheStore<P>>,
    disk: DiskStore,
    detector: OfflineDetector,
    queue: OperationQueue,
    transport: Arc<dyn Transport>,
    last_sync_attempt: Mutex<Option<Instant>>,
}

impl CacheManager<LruPolicy> {
    // == Constructor ==
    /// Opens an LRU cache over the directories named in `config`.
    pub async fn open(config: &Config, transport: Arc<dyn Transport>) -> Result<Self> {
        Self::open_with_policy(config, transport, LruPolicy::new()).await
    }
}

impl<P: EvictionPolicy> CacheManager<P> {
    /// Opens a cache evicting according to `policy`.
    ///
    /// Entry files left by an earlier process are re-admitted oldest first;
    /// stale or unreadable ones are deleted.
    pub async fn open_with_policy(
        config: &Config,
        transport: Arc<dyn Transport>,
        policy: P,
    ) -> Result<Self> {
        let disk = DiskStore::open(&config.cache_dir).await?;
        let mut store = CacheStore::with_policy(
            policy,
            config.max_size_bytes,
            config.max_entries,
            config.ttl_duration(),
        );
        rehydrate(&mut store, &disk).await;

        let detector = OfflineDetector::new(
            transport.clone(),
            config.network_timeout_duration(),
            config.offline_debounce_duration(),
            config.auto_sync_interval_duration(),
        );
        let queue = OperationQueue::load(
            QueueFile::new(config.pending_operations_path()),
            config.request_timeout_duration(),
        )
        .await;

        Ok(Self {
            store: RwLock::new(store),
            disk,
            detector,
            queue,
            transport,
            last_sync_attempt: Mutex::new(None),
        })
    }

    // == Set ==
    /// Caches a response under `key`, evicting least recently used entries
    /// until it fits.
    ///
    /// If the file cannot be written the entry still lives in memory until it
    /// expires or is evicted, any older file for the key is deleted, and the
    /// write error is returned.
    pub async fn set(
        &self,
        key: &str,
        status_code: u16,
        body: Vec<u8>,
        headers: HashMap<String, Vec<String>>,
    ) -> Result<()> {
        validate_key(key)?;

        let mut store = self.store.write().await;
        let response = CachedResponse::new(status_code, body, headers, store.ttl());
        let evicted = store.insert(key.to_string(), response.clone())?;

        for victim in &evicted {
            if let Err(e) = self.disk.remove(victim).await {
                warn!(key = %victim, error = %e, "Failed to delete evicted cache file");
            }
        }

        if let Err(e) = self.disk.write(key, &response).await {
            warn!(key = %key, error = %e, "Cache entry kept in memory only; disk write failed");
            // A superseded file must not come back on the next open
            if let Err(remove_err) = self.disk.remove(key).await {
                warn!(key = %key, error = %remove_err, "Failed to delete previous cache file");
            }
            return Err(e);
        }
        Ok(())
    }

    // == Get ==
    /// Returns the cached response for `key` if present and fresh.
    ///
    /// A stale entry is removed from memory and disk and reported as a miss.
    pub async fn get(&self, key: &str) -> Result<Option<CachedResponse>> {
        let mut store = self.store.write().await;
        match store.get(key) {
            Lookup::Hit(response) => Ok(Some(response)),
            Lookup::Expired => {
                debug!(key = %key, "Cache entry expired");
                self.disk.remove(key).await?;
                Ok(None)
            }
            Lookup::Miss => Ok(None),
        }
    }

    // == Batch Get ==
    /// Looks up many keys at once without refreshing their recency.
    ///
    /// Fresh entries are collected under one read lock; stale ones are
    /// removed afterwards under the write lock, re-checked in case another
    /// caller replaced them in between.
    pub async fn batch_get(&self, keys: &[&str]) -> HashMap<String, CachedResponse> {
        let mut results = HashMap::with_capacity(keys.len());
        let mut expired = Vec::new();
        {
            let store = self.store.read().await;
            for key in keys {
                if store.is_expired(key) {
                    expired.push(*key);
                } else if let Some(entry) = store.peek(key) {
                    results.insert(key.to_string(), entry.response.clone());
                }
            }
        }

        if !expired.is_empty() {
            let mut store = self.store.write().await;
            for key in expired {
                if store.remove_expired(key) {
                    if let Err(e) = self.disk.remove(key).await {
                        warn!(key = %key, error = %e, "Failed to delete expired cache file");
                    }
                }
            }
        }

        results
    }

    // == Remove ==
    /// Removes `key` from memory and disk; absent keys are ignored.
    pub async fn remove(&self, key: &str) -> Result<()> {
        let mut store = self.store.write().await;
        if store.remove(key).is_some() {
            self.disk.remove(key).await?;
        }
        Ok(())
    }

    // == Clear Cache ==
    /// Deletes every cache file and empties the index.
    ///
    /// The index is emptied even when some files cannot be deleted; those
    /// failures are reported together.
    pub async fn clear_cache(&self) -> Result<()> {
        let mut store = self.store.write().await;
        store.clear();
        let removed = self.disk.clear().await?;
        info!(files = removed, "Cache cleared");
        Ok(())
    }

    // == List Cache ==
    /// Key-sorted snapshot of cached entries.
    pub async fn list_cache(&self) -> Vec<CacheInfo> {
        self.store.read().await.list()
    }

    pub async fn stats(&self) -> CacheStats {
        self.store.read().await.stats()
    }

    /// Sum of cached body sizes.
    pub async fn current_size(&self) -> u64 {
        self.store.read().await.current_size()
    }

    // == Fetch ==
    /// Serves a request from cache, or performs it and caches a 2xx answer.
    ///
    /// A miss while offline, or a call that gets no response, fails with
    /// [`CacheError::Offline`].
    pub async fn fetch(&self, method: &str, endpoint: &str) -> Result<CachedResponse> {
        let key = cache_key(method, endpoint);
        if let Some(response) = self.get(&key).await? {
            return Ok(response);
        }

        if !self.detector.is_online().await {
            return Err(CacheError::Offline("fetch"));
        }

        let response = match self.transport.send(TransportRequest::new(method, endpoint)).await {
            Ok(response) => response,
            Err(CacheError::Transport(e)) => {
                warn!(method = %method, endpoint = %endpoint, error = %e, "Fetch failed, treating API as offline");
                self.detector.report_unreachable().await;
                return Err(CacheError::Offline("fetch"));
            }
            Err(e) => return Err(e),
        };

        if response.is_success() {
            if let Err(e) = self
                .set(&key, response.status_code, response.body.clone(), response.headers.clone())
                .await
            {
                warn!(key = %key, error = %e, "Response not cached");
            }
        }

        let ttl = self.store.read().await.ttl();
        Ok(CachedResponse::new(
            response.status_code,
            response.body,
            response.headers,
            ttl,
        ))
    }

    // == Execute Or Queue ==
    /// Sends a mutating call, or queues it when the API is unreachable.
    ///
    /// A successful call drops the cached GET for the same endpoint.
    pub async fn execute_or_queue(
        &self,
        method: &str,
        endpoint: &str,
        payload: Option<&[u8]>,
    ) -> Result<Dispatch> {
        queue::validate(method, endpoint)?;
        let body = queue::parse_payload(payload)?;

        if !self.detector.is_online().await {
            let op = self.queue.queue_operation(method, endpoint, payload).await?;
            return Ok(Dispatch::Queued(op));
        }

        let request = TransportRequest::new(method, endpoint).with_body(body);
        match self.transport.send(request).await {
            Ok(response) => {
                if response.is_success() {
                    self.remove(&cache_key("GET", endpoint)).await?;
                }
                Ok(Dispatch::Sent(response))
            }
            Err(CacheError::Transport(e)) => {
                warn!(method = %method, endpoint = %endpoint, error = %e, "Call failed, queueing for later sync");
                self.detector.report_unreachable().await;
                let op = self.queue.queue_operation(method, endpoint, payload).await?;
                Ok(Dispatch::Queued(op))
            }
            Err(e) => Err(e),
        }
    }

    // == Offline Operations ==
    pub async fn is_online(&self) -> bool {
        self.detector.is_online().await
    }

    pub async fn mode(&self) -> OfflineMode {
        self.detector.mode().await
    }

    pub async fn enter_strict_offline(&self) {
        self.detector.enter_strict_offline().await
    }

    pub async fn exit_strict_offline(&self) {
        self.detector.exit_strict_offline().await
    }

    /// Reachability check that gives up at `deadline`.
    pub async fn is_online_with_deadline(&self, deadline: Instant) -> bool {
        self.detector.is_online_with_deadline(deadline).await
    }

    pub async fn queue_operation(
        &self,
        method: &str,
        endpoint: &str,
        payload: Option<&[u8]>,
    ) -> Result<Operation> {
        self.queue.queue_operation(method, endpoint, payload).await
    }

    pub async fn pending_operations(&self) -> Vec<Operation> {
        self.queue.pending_operations().await
    }

    pub async fn clear_pending_operations(&self) -> Result<()> {
        self.queue.clear_pending_operations().await
    }

    /// Replays queued operations; fails when offline.
    pub async fn sync_pending_operations(&self) -> Result<SyncReport> {
        *self.last_sync_attempt.lock().await = Some(Instant::now());
        self.queue
            .sync_pending_operations(&self.detector, self.transport.as_ref())
            .await
    }

    /// Syncs only when operations are pending and the auto sync interval has
    /// passed since the last attempt. Being offline is not an error here.
    pub async fn sync_if_due(&self) -> Result<Option<SyncReport>> {
        if self.queue.is_empty().await {
            return Ok(None);
        }

        let interval = self.detector.auto_sync_interval().await;
        {
            let mut last = self.last_sync_attempt.lock().await;
            if last.is_some_and(|at| at.elapsed() < interval) {
                return Ok(None);
            }
            *last = Some(Instant::now());
        }

        match self
            .queue
            .sync_pending_operations(&self.detector, self.transport.as_ref())
            .await
        {
            Ok(report) => Ok(Some(report)),
            Err(CacheError::Offline(_)) => {
                debug!("Auto sync skipped while offline");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    // == Status ==
    /// Best-effort summary of connectivity, queue and cache occupancy.
    pub async fn status(&self) -> StatusReport {
        let online = self.detector.is_online().await;
        let mode = self.detector.mode().await;
        let pending_operations = self.queue.len().await;

        let store = self.store.read().await;
        let stats = store.stats();
        StatusReport {
            online,
            mode,
            pending_operations,
            cache_entries: store.len(),
            cache_bytes: store.current_size(),
            max_entries: store.max_entries(),
            max_size_bytes: store.max_size_bytes(),
            eviction_policy: store.policy_name(),
            hit_rate: stats.hit_rate(),
            stats,
        }
    }
}

fn validate_key(key: &str) -> Result<()> {
    if key.is_empty() {
        return Err(CacheError::InvalidRequest("Key cannot be empty".to_string()));
    }
    if key.len() > MAX_KEY_LENGTH {
        return Err(CacheError::InvalidRequest(format!(
            "Key exceeds maximum length of {} bytes",
            MAX_KEY_LENGTH
        )));
    }
    Ok(())
}

/// Re-admits entry files from an earlier process, oldest first.
async fn rehydrate<P: EvictionPolicy>(store: &mut CacheStore<P>, disk: &DiskStore) {
    let mut entries = match disk.load_all().await {
        Ok(entries) => entries,
        Err(e) => {
            warn!(error = %e, "Could not scan cache directory, starting empty");
            return;
        }
    };
    entries.sort_by_key(|(_, response)| response.cached_at);

    let ttl = store.ttl();
    let mut stale = Vec::new();
    for (key, response) in entries {
        if response.is_expired(ttl) {
            stale.push(key);
            continue;
        }
        match store.insert(key.clone(), response) {
            Ok(evicted) => stale.extend(evicted),
            Err(_) => stale.push(key),
        }
    }

    for key in &stale {
        if let Err(e) = disk.remove(key).await {
            warn!(key = %key, error = %e, "Failed to delete stale cache file");
        }
    }
    if !store.is_empty() || !stale.is_empty() {
        info!(loaded = store.len(), dropped = stale.len(), "Rehydrated cache from disk");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::FifoPolicy;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::time::Duration;
    use tempfile::TempDir;

    /// In-process stand-in for the remote API.
    #[derive(Default)]
    struct FakeApi {
        down: AtomicBool,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl Transport for FakeApi {
        async fn send(&self, request: TransportRequest) -> Result<TransportResponse> {
            if self.down.load(Ordering::SeqCst) {
                return Err(CacheError::Transport("connection refused".to_string()));
            }
            self.calls.fetch_add(1, Ordering::SeqCst);
            let body = format!("{} {}", request.method, request.endpoint);
            Ok(TransportResponse::new(200, body))
        }
    }

    fn config(dir: &TempDir, max_size_bytes: u64, max_entries: usize) -> Config {
        Config {
            max_size_bytes,
            max_entries,
            ..Config::rooted_at(dir.path())
        }
    }

    async fn manager(cfg: &Config) -> (CacheManager, Arc<FakeApi>) {
        let api = Arc::new(FakeApi::default());
        let manager = CacheManager::open(cfg, api.clone()).await.unwrap();
        (manager, api)
    }

    fn keys(items: Vec<CacheInfo>) -> Vec<String> {
        items.into_iter().map(|item| item.key).collect()
    }

    #[tokio::test]
    async fn test_size_bound_scenario() {
        let tmp = TempDir::new().unwrap();
        let (manager, _) = manager(&config(&tmp, 100, 10)).await;

        for key in ["a", "b", "c"] {
            manager.set(key, 200, vec![0; 40], HashMap::new()).await.unwrap();
        }

        assert_eq!(manager.current_size().await, 80);
        assert_eq!(keys(manager.list_cache().await), vec!["b", "c"]);
        assert!(!manager.disk.path_for("a").exists());
        assert!(manager.disk.path_for("b").exists());
    }

    #[tokio::test]
    async fn test_get_refreshes_recency() {
        let tmp = TempDir::new().unwrap();
        let (manager, _) = manager(&config(&tmp, 1_000, 3)).await;

        for key in ["A", "B", "C"] {
            manager.set(key, 200, b"x".to_vec(), HashMap::new()).await.unwrap();
        }
        assert!(manager.get("A").await.unwrap().is_some());
        manager.set("D", 200, b"x".to_vec(), HashMap::new()).await.unwrap();

        assert_eq!(keys(manager.list_cache().await), vec!["A", "C", "D"]);
        assert!(!manager.disk.path_for("B").exists());
    }

    #[tokio::test]
    async fn test_expired_get_removes_file() {
        let tmp = TempDir::new().unwrap();
        let mut cfg = config(&tmp, 1_000, 10);
        cfg.ttl = 0;
        let (manager, _) = manager(&cfg).await;

        manager.set("k", 200, b"v".to_vec(), HashMap::new()).await.unwrap();
        assert!(manager.disk.path_for("k").exists());
        tokio::time::sleep(Duration::from_millis(20)).await;

        assert_eq!(manager.get("k").await.unwrap(), None);
        assert!(!manager.disk.path_for("k").exists());
        assert!(manager.list_cache().await.is_empty());
    }

    #[tokio::test]
    async fn test_batch_get_drops_stale_entries() {
        let tmp = TempDir::new().unwrap();
        let mut cfg = config(&tmp, 1_000, 10);
        cfg.ttl = 0;
        let (manager, _) = manager(&cfg).await;
        manager.set("old", 200, b"1".to_vec(), HashMap::new()).await.unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;

        let results = manager.batch_get(&["old", "missing"]).await;

        assert!(results.is_empty());
        assert!(!manager.disk.path_for("old").exists());
        assert!(manager.list_cache().await.is_empty());
        assert_eq!(manager.stats().await.expirations, 1);
    }

    #[tokio::test]
    async fn test_batch_get_returns_hits() {
        let tmp = TempDir::new().unwrap();
        let (manager, _) = manager(&config(&tmp, 1_000, 10)).await;
        manager.set("a", 200, b"1".to_vec(), HashMap::new()).await.unwrap();
        manager.set("b", 404, b"2".to_vec(), HashMap::new()).await.unwrap();

        let results = manager.batch_get(&["a", "b", "c"]).await;

        assert_eq!(results.len(), 2);
        assert_eq!(results["b"].status_code, 404);
    }

    #[tokio::test]
    async fn test_remove_and_clear() {
        let tmp = TempDir::new().unwrap();
        let (manager, _) = manager(&config(&tmp, 1_000, 10)).await;
        manager.set("a", 200, b"1".to_vec(), HashMap::new()).await.unwrap();
        manager.set("b", 200, b"2".to_vec(), HashMap::new()).await.unwrap();

        manager.remove("a").await.unwrap();
        manager.remove("a").await.unwrap();
        assert!(!manager.disk.path_for("a").exists());

        manager.clear_cache().await.unwrap();
        assert!(manager.list_cache().await.is_empty());
        assert_eq!(manager.current_size().await, 0);
        assert_eq!(std::fs::read_dir(manager.disk.dir()).unwrap().count(), 0);
    }

    /// Puts a directory where the entry's temp file would go, so writes fail.
    fn block_writes(manager: &CacheManager, key: &str) {
        let mut blocked = manager.disk.path_for(key).into_os_string();
        blocked.push(".tmp");
        std::fs::create_dir(blocked).unwrap();
    }

    #[tokio::test]
    async fn test_failed_write_keeps_entry_in_memory() {
        let tmp = TempDir::new().unwrap();
        let cfg = config(&tmp, 1_000, 10);
        {
            let (manager, _) = manager(&cfg).await;
            manager.set("k", 200, b"old".to_vec(), HashMap::new()).await.unwrap();
            block_writes(&manager, "k");

            let result = manager.set("k", 200, b"new".to_vec(), HashMap::new()).await;

            assert!(matches!(result, Err(CacheError::Io { .. })));
            assert_eq!(manager.get("k").await.unwrap().unwrap().body, b"new".to_vec());
            assert_eq!(manager.current_size().await, 3);
            // The superseded version is gone from disk
            assert!(!manager.disk.path_for("k").exists());
        }

        let (manager, _) = manager(&cfg).await;
        assert_eq!(manager.get("k").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_clear_resets_index_despite_failures() {
        let tmp = TempDir::new().unwrap();
        let (manager, _) = manager(&config(&tmp, 1_000, 10)).await;
        manager.set("a", 200, b"1".to_vec(), HashMap::new()).await.unwrap();
        manager.set("b", 200, b"22".to_vec(), HashMap::new()).await.unwrap();
        block_writes(&manager, "c");

        let result = manager.clear_cache().await;

        match result {
            Err(CacheError::ClearIncomplete { failures }) => assert_eq!(failures.len(), 1),
            other => panic!("expected ClearIncomplete, got {:?}", other),
        }
        assert!(manager.list_cache().await.is_empty());
        assert_eq!(manager.current_size().await, 0);
        assert_eq!(manager.stats().await.total_entries, 0);
        assert!(!manager.disk.path_for("a").exists());
        assert!(!manager.disk.path_for("b").exists());
        assert_eq!(manager.get("a").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_set_rejects_bad_keys_and_oversized_bodies() {
        let tmp = TempDir::new().unwrap();
        let (manager, _) = manager(&config(&tmp, 10, 10)).await;

        assert!(matches!(
            manager.set("", 200, Vec::new(), HashMap::new()).await,
            Err(CacheError::InvalidRequest(_))
        ));
        assert!(matches!(
            manager.set("big", 200, vec![0; 11], HashMap::new()).await,
            Err(CacheError::CacheFull(_))
        ));
    }

    #[tokio::test]
    async fn test_reopen_rehydrates_entries() {
        let tmp = TempDir::new().unwrap();
        let cfg = config(&tmp, 1_000, 10);
        {
            let (manager, _) = manager(&cfg).await;
            manager.set("GET:/apps", 200, b"[]".to_vec(), HashMap::new()).await.unwrap();
            tokio::time::sleep(Duration::from_millis(10)).await;
            manager.set("GET:/health", 200, b"ok".to_vec(), HashMap::new()).await.unwrap();
        }

        let smaller = Config {
            max_entries: 1,
            ..cfg
        };
        let (manager, _) = manager(&smaller).await;

        // Oldest entry was evicted on re-admission, and its file removed
        assert_eq!(keys(manager.list_cache().await), vec!["GET:/health"]);
        assert!(!manager.disk.path_for("GET:/apps").exists());
        assert_eq!(
            manager.get("GET:/health").await.unwrap().unwrap().body,
            b"ok".to_vec()
        );
    }

    #[tokio::test]
    async fn test_fifo_policy_manager() {
        let tmp = TempDir::new().unwrap();
        let cfg = config(&tmp, 1_000, 2);
        let manager = CacheManager::open_with_policy(&cfg, Arc::new(FakeApi::default()), FifoPolicy::new())
            .await
            .unwrap();

        manager.set("a", 200, b"1".to_vec(), HashMap::new()).await.unwrap();
        manager.set("b", 200, b"2".to_vec(), HashMap::new()).await.unwrap();
        manager.get("a").await.unwrap();
        manager.set("c", 200, b"3".to_vec(), HashMap::new()).await.unwrap();

        assert_eq!(keys(manager.list_cache().await), vec!["b", "c"]);
        assert_eq!(manager.status().await.eviction_policy, "fifo");
    }

    #[tokio::test]
    async fn test_fetch_caches_success() {
        let tmp = TempDir::new().unwrap();
        let (manager, api) = manager(&config(&tmp, 1_000, 10)).await;

        let first = manager.fetch("GET", "/apps").await.unwrap();
        let second = manager.fetch("GET", "/apps").await.unwrap();

        assert_eq!(first.body, b"GET /apps".to_vec());
        assert_eq!(second.body, first.body);
        // One health probe plus one real call
        assert_eq!(api.calls.load(Ordering::SeqCst), 2);
        assert_eq!(keys(manager.list_cache().await), vec!["GET:/apps"]);
    }

    #[tokio::test]
    async fn test_fetch_offline_miss_errors() {
        let tmp = TempDir::new().unwrap();
        let (manager, api) = manager(&config(&tmp, 1_000, 10)).await;
        api.down.store(true, Ordering::SeqCst);

        let result = manager.fetch("GET", "/apps").await;

        assert!(matches!(result, Err(CacheError::Offline("fetch"))));
        assert_eq!(manager.mode().await, OfflineMode::AutoOffline);
    }

    #[tokio::test]
    async fn test_fetch_transport_failure_marks_offline() {
        let tmp = TempDir::new().unwrap();
        let (manager, api) = manager(&config(&tmp, 1_000, 10)).await;
        manager.fetch("GET", "/a").await.unwrap();

        // Still inside the debounce window, so the detector believes online
        api.down.store(true, Ordering::SeqCst);
        let result = manager.fetch("GET", "/b").await;

        assert!(matches!(result, Err(CacheError::Offline("fetch"))));
        assert_eq!(manager.mode().await, OfflineMode::AutoOffline);

        let dispatch = manager.execute_or_queue("POST", "/b", None).await.unwrap();
        assert!(matches!(dispatch, Dispatch::Queued(_)));
    }

    #[tokio::test]
    async fn test_expired_deadline_leaves_mode_alone() {
        let tmp = TempDir::new().unwrap();
        let (manager, api) = manager(&config(&tmp, 1_000, 10)).await;

        assert!(!manager.is_online_with_deadline(Instant::now()).await);
        assert_eq!(manager.mode().await, OfflineMode::Online);

        assert!(manager.is_online().await);
        assert_eq!(api.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_execute_or_queue_offline_then_sync() {
        let tmp = TempDir::new().unwrap();
        let mut cfg = config(&tmp, 1_000, 10);
        cfg.offline_debounce = 0;
        let (manager, api) = manager(&cfg).await;
        api.down.store(true, Ordering::SeqCst);

        let dispatch = manager
            .execute_or_queue("POST", "/apps/x/deploy", Some(b"{\"v\":1}".as_slice()))
            .await
            .unwrap();
        assert!(matches!(dispatch, Dispatch::Queued(_)));
        assert_eq!(manager.pending_operations().await.len(), 1);

        assert!(matches!(
            manager.sync_pending_operations().await,
            Err(CacheError::Offline("sync"))
        ));

        api.down.store(false, Ordering::SeqCst);
        let report = manager.sync_pending_operations().await.unwrap();
        assert_eq!(report.succeeded, 1);
        assert!(manager.pending_operations().await.is_empty());
    }

    #[tokio::test]
    async fn test_execute_invalidates_cached_get() {
        let tmp = TempDir::new().unwrap();
        let (manager, _) = manager(&config(&tmp, 1_000, 10)).await;
        manager.fetch("GET", "/apps/x").await.unwrap();

        let dispatch = manager.execute_or_queue("PUT", "/apps/x", None).await.unwrap();

        assert!(matches!(dispatch, Dispatch::Sent(ref r) if r.status_code == 200));
        assert!(manager.list_cache().await.is_empty());
    }

    #[tokio::test]
    async fn test_sync_if_due_respects_interval() {
        let tmp = TempDir::new().unwrap();
        let (manager, api) = manager(&config(&tmp, 1_000, 10)).await;

        assert_eq!(manager.sync_if_due().await.unwrap(), None);

        manager.queue_operation("POST", "/apps/a", None).await.unwrap();
        let report = manager.sync_if_due().await.unwrap().unwrap();
        assert_eq!(report.succeeded, 1);

        manager.queue_operation("POST", "/apps/b", None).await.unwrap();
        assert_eq!(manager.sync_if_due().await.unwrap(), None);
        assert_eq!(manager.pending_operations().await.len(), 1);
        assert_eq!(api.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_status_in_strict_offline() {
        let tmp = TempDir::new().unwrap();
        let (manager, api) = manager(&config(&tmp, 1_000, 10)).await;
        manager.queue_operation("DELETE", "/apps/a", None).await.unwrap();

        manager.enter_strict_offline().await;
        let status = manager.status().await;

        assert!(!status.online);
        assert_eq!(status.mode, OfflineMode::StrictOffline);
        assert_eq!(status.pending_operations, 1);
        assert_eq!(api.calls.load(Ordering::SeqCst), 0);
    }
}
