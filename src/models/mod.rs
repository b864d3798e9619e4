//! Report models for the `cache` command family
//!
//! DTOs rendered as text or JSON by the CLI.

pub mod reports;

pub use reports::{ListItem, ListReport, PendingItem, PendingReport, StatusReport, SyncSummary};
