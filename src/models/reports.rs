//! Report DTOs for the `cache` commands
//!
//! Each report serializes to JSON for `--json` output and implements
//! `Display` for the default human-readable output.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::cache::{CacheInfo, CacheStats};
use crate::offline::OfflineMode;
use crate::queue::{Operation, SyncReport};

/// Output of `cache list`
#[derive(Debug, Clone, Serialize)]
pub struct ListReport {
    pub items: Vec<ListItem>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ListItem {
    pub key: String,
    pub size: u64,
}

impl ListReport {
    pub fn new(items: Vec<CacheInfo>) -> Self {
        Self {
            items: items
                .into_iter()
                .map(|info| ListItem {
                    key: info.key,
                    size: info.size_bytes,
                })
                .collect(),
        }
    }
}

impl fmt::Display for ListReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.items.is_empty() {
            return writeln!(f, "Cache is empty");
        }
        writeln!(f, "Found {} cached items:", self.items.len())?;
        for item in &self.items {
            writeln!(f)?;
            writeln!(f, "Key: {}", item.key)?;
            writeln!(f, "  Size: {} bytes", item.size)?;
        }
        Ok(())
    }
}

/// Output of `cache pending`
#[derive(Debug, Clone, Serialize)]
pub struct PendingReport {
    pub operations: Vec<PendingItem>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PendingItem {
    pub id: String,
    pub method: String,
    pub endpoint: String,
    pub created_at: DateTime<Utc>,
    pub has_payload: bool,
}

impl PendingReport {
    pub fn new(operations: Vec<Operation>) -> Self {
        Self {
            operations: operations
                .into_iter()
                .map(|op| PendingItem {
                    id: op.id.to_string(),
                    method: op.method,
                    endpoint: op.endpoint,
                    created_at: op.created_at,
                    has_payload: op.payload.is_some(),
                })
                .collect(),
        }
    }
}

impl fmt::Display for PendingReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.operations.is_empty() {
            return writeln!(f, "No pending operations");
        }
        writeln!(f, "Found {} pending operations:", self.operations.len())?;
        for (i, op) in self.operations.iter().enumerate() {
            writeln!(f)?;
            writeln!(f, "{}. {} {}", i + 1, op.method, op.endpoint)?;
            writeln!(f, "   Created: {}", op.created_at.to_rfc3339())?;
            if op.has_payload {
                writeln!(f, "   Has payload: yes")?;
            }
        }
        Ok(())
    }
}

/// Output of `cache sync`
#[derive(Debug, Clone, Serialize)]
pub struct SyncSummary {
    #[serde(flatten)]
    pub report: SyncReport,
}

impl fmt::Display for SyncSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let report = &self.report;
        if report.attempted == 0 {
            return writeln!(f, "No pending operations to synchronize");
        }
        if report.retained == 0 {
            writeln!(
                f,
                "Successfully synchronized {} pending operations",
                report.succeeded
            )
        } else {
            writeln!(
                f,
                "Synchronized {} of {} operations; {} remain queued",
                report.succeeded, report.attempted, report.retained
            )
        }
    }
}

/// Output of `cache status`
#[derive(Debug, Clone, Serialize)]
pub struct StatusReport {
    pub online: bool,
    pub mode: OfflineMode,
    pub pending_operations: usize,
    pub cache_entries: usize,
    pub cache_bytes: u64,
    pub max_entries: usize,
    pub max_size_bytes: u64,
    pub eviction_policy: &'static str,
    pub stats: CacheStats,
    pub hit_rate: f64,
}

impl fmt::Display for StatusReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Network Status: {}",
            if self.online { "Online" } else { "Offline" }
        )?;
        writeln!(f, "Operation Mode: {}", self.mode)?;
        writeln!(f, "Pending Operations: {}", self.pending_operations)?;
        writeln!(
            f,
            "Cache: {}/{} entries, {}/{} bytes ({})",
            self.cache_entries,
            self.max_entries,
            self.cache_bytes,
            self.max_size_bytes,
            self.eviction_policy
        )
    }
}
