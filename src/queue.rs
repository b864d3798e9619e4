//! Operation Queue
//!
//! Durable FIFO of mutating requests deferred while the API is unreachable,
//! and the replay that drains it once connectivity returns.

use std::collections::HashSet;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{CacheError, Result};
use crate::offline::OfflineDetector;
use crate::storage::QueueFile;
use crate::transport::{Transport, TransportRequest, IDEMPOTENCY_KEY_HEADER};

// == Operation ==
/// A deferred mutating request. Immutable once queued.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Operation {
    /// Idempotency key sent with every replay of this operation
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,
    pub method: String,
    pub endpoint: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
}

impl Operation {
    pub fn new(
        method: impl Into<String>,
        endpoint: impl Into<String>,
        payload: Option<serde_json::Value>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            method: method.into().to_ascii_uppercase(),
            endpoint: endpoint.into(),
            payload,
            created_at: Utc::now(),
        }
    }

    fn to_request(&self, timeout: Duration) -> TransportRequest {
        TransportRequest::new(self.method.clone(), self.endpoint.clone())
            .with_body(self.payload.clone())
            .with_header(IDEMPOTENCY_KEY_HEADER, self.id.to_string())
            .with_timeout(timeout)
    }
}

// == Sync Report ==
/// Outcome of one replay pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    /// Operations attempted in this pass
    pub attempted: usize,
    /// Operations that returned 2xx and were dropped
    pub succeeded: usize,
    /// Operations kept for the next sync
    pub retained: usize,
}

// == Operation Queue ==
pub struct OperationQueue {
    file: QueueFile,
    pending: Mutex<Vec<Operation>>,
    /// Held for the whole of a sync so replays never overlap
    sync_lock: Mutex<()>,
    request_timeout: Duration,
}

impl OperationQueue {
    // == Load ==
    /// Opens the queue persisted in `file`.
    ///
    /// A corrupt file is logged and treated as an empty queue.
    pub async fn load(file: QueueFile, request_timeout: Duration) -> Self {
        let mut pending = file.load().await;
        pending.sort_by_key(|op| op.created_at);
        if !pending.is_empty() {
            info!(count = pending.len(), "Loaded pending operations");
        }

        Self {
            file,
            pending: Mutex::new(pending),
            sync_lock: Mutex::new(()),
            request_timeout,
        }
    }

    // == Queue Operation ==
    /// Appends an operation and rewrites the queue file before returning.
    pub async fn queue_operation(
        &self,
        method: &str,
        endpoint: &str,
        payload: Option<&[u8]>,
    ) -> Result<Operation> {
        validate(method, endpoint)?;
        let payload = parse_payload(payload)?;

        let operation = Operation::new(method, endpoint, payload);

        let mut pending = self.pending.lock().await;
        pending.push(operation.clone());
        if let Err(e) = self.file.save(&pending).await {
            // Keep memory and disk in agreement: an unpersisted op is not queued
            pending.pop();
            return Err(e);
        }

        info!(method = %operation.method, endpoint = %operation.endpoint, id = %operation.id, "Queued operation for later sync");
        Ok(operation)
    }

    // == Pending Operations ==
    /// Returns a copy of the queue in FIFO order.
    pub async fn pending_operations(&self) -> Vec<Operation> {
        self.pending.lock().await.clone()
    }

    pub async fn len(&self) -> usize {
        self.pending.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.pending.lock().await.is_empty()
    }

    // == Clear ==
    /// Drops every pending operation and persists the empty queue.
    pub async fn clear_pending_operations(&self) -> Result<()> {
        let mut pending = self.pending.lock().await;
        pending.clear();
        self.file.save(&pending).await?;
        info!("Cleared pending operations");
        Ok(())
    }

    // == Sync ==
    /// Replays pending operations in FIFO order.
    ///
    /// Fails without touching the queue when `detector` reports offline.
    /// Successful (2xx) operations are dropped; failed ones stay queued with
    /// no backoff or retry limit. Operations queued while the sync runs are
    /// kept untouched.
    pub async fn sync_pending_operations(
        &self,
        detector: &OfflineDetector,
        transport: &dyn Transport,
    ) -> Result<SyncReport> {
        let _single_flight = self.sync_lock.lock().await;

        if !detector.is_online().await {
            return Err(CacheError::Offline("sync"));
        }

        let snapshot = self.pending_operations().await;
        let mut report = SyncReport {
            attempted: snapshot.len(),
            ..SyncReport::default()
        };
        let mut done: HashSet<Uuid> = HashSet::new();

        for op in &snapshot {
            match transport.send(op.to_request(self.request_timeout)).await {
                Ok(response) if response.is_success() => {
                    debug!(id = %op.id, status = response.status_code, "Replayed operation");
                    done.insert(op.id);
                }
                Ok(response) => {
                    warn!(method = %op.method, endpoint = %op.endpoint, status = response.status_code, "Replay rejected, keeping operation");
                }
                Err(e) => {
                    warn!(method = %op.method, endpoint = %op.endpoint, error = %e, "Replay failed, keeping operation");
                }
            }
        }
        report.succeeded = done.len();

        let mut pending = self.pending.lock().await;
        pending.retain(|op| !done.contains(&op.id));
        report.retained = pending.len();
        self.file.save(&pending).await?;

        info!(
            attempted = report.attempted,
            succeeded = report.succeeded,
            retained = report.retained,
            "Sync finished"
        );
        Ok(report)
    }
}

/// Decodes a raw JSON payload; empty input means no payload.
pub(crate) fn parse_payload(payload: Option<&[u8]>) -> Result<Option<serde_json::Value>> {
    payload
        .filter(|bytes| !bytes.is_empty())
        .map(|bytes| serde_json::from_slice::<serde_json::Value>(bytes))
        .transpose()
        .map_err(|e| CacheError::InvalidRequest(format!("payload is not valid JSON: {}", e)))
}

pub(crate) fn validate(method: &str, endpoint: &str) -> Result<()> {
    if method.trim().is_empty() || !method.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(CacheError::InvalidRequest(format!(
            "invalid method '{}'",
            method
        )));
    }
    if !endpoint.starts_with('/') {
        return Err(CacheError::InvalidRequest(format!(
            "endpoint '{}' must start with '/'",
            endpoint
        )));
    }
    Ok(())
}
