//! `cache` subcommand runner
//!
//! Each subcommand maps onto one manager call and renders its report as
//! text or JSON.

use serde::Serialize;
use tracing::debug;

use crate::cache::EvictionPolicy;
use crate::cli::CacheCommand;
use crate::error::Result;
use crate::manager::CacheManager;
use crate::models::{ListReport, PendingReport, SyncSummary};

/// Runs `command` and returns what should be printed to stdout.
pub async fn run<P: EvictionPolicy>(
    manager: &CacheManager<P>,
    command: CacheCommand,
    json: bool,
) -> Result<String> {
    debug!(?command, "Running cache command");

    match command {
        CacheCommand::Clear => {
            manager.clear_cache().await?;
            if json {
                render_json(&serde_json::json!({ "cleared": true }))
            } else {
                Ok("Cache cleared successfully\n".to_string())
            }
        }
        CacheCommand::List => {
            let report = ListReport::new(manager.list_cache().await);
            render(&report, json)
        }
        CacheCommand::Sync => {
            let report = manager.sync_pending_operations().await?;
            render(&SyncSummary { report }, json)
        }
        CacheCommand::Pending => {
            let report = PendingReport::new(manager.pending_operations().await);
            render(&report, json)
        }
        CacheCommand::Status => render(&manager.status().await, json),
    }
}

fn render<T: Serialize + std::fmt::Display>(report: &T, json: bool) -> Result<String> {
    if json {
        render_json(report)
    } else {
        Ok(report.to_string())
    }
}

fn render_json<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    let mut out = serde_json::to_string_pretty(value)?;
    out.push('\n');
    Ok(out)
}
