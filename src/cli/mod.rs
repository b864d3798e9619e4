//! CLI module for nexcache
//!
//! Provides the `cache` command family:
//! - `clear`: delete every cached response
//! - `list`: show cached keys and sizes
//! - `sync`: replay queued operations
//! - `pending`: show queued operations
//! - `status`: connectivity, queue and cache summary

pub mod cache;

use clap::{Parser, Subcommand};

/// nexcache - offline-tolerant response cache for the Nexlayer API
#[derive(Parser, Debug)]
#[command(name = "nexcache")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Stay in strict offline mode for this invocation
    #[arg(long, global = true)]
    pub offline: bool,

    /// Print reports as JSON
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Manage the local cache and offline queue
    #[command(subcommand)]
    Cache(CacheCommand),
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheCommand {
    /// Clear all cached data
    Clear,

    /// List all cached items
    List,

    /// Synchronize pending offline operations
    Sync,

    /// List pending offline operations
    Pending,

    /// Show offline mode status
    Status,
}
