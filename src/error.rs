//! Error types for the resilience cache
//!
//! Provides unified error handling using thiserror.

use std::path::PathBuf;

use thiserror::Error;

// == Cache Error Enum ==
/// Unified error type for the cache, queue and transport layers.
#[derive(Error, Debug)]
pub enum CacheError {
    /// Filesystem failure on a single path
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// JSON encoding or decoding failure
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Invalid arguments supplied by the caller
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Eviction could not make room for a new entry
    #[error("Cache full: {0}")]
    CacheFull(String),

    /// The remote API is unreachable or strict offline mode is active
    #[error("cannot {0} while offline")]
    Offline(&'static str),

    /// The transport failed to complete a request
    #[error("Transport error: {0}")]
    Transport(String),

    /// Some cache files could not be deleted during a clear
    #[error("Failed to remove {} cache file(s): {}", .failures.len(), .failures.join("; "))]
    ClearIncomplete { failures: Vec<String> },
}

impl CacheError {
    /// Wraps an I/O error with the path it occurred on.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        CacheError::Io {
            path: path.into(),
            source,
        }
    }
}

impl From<reqwest::Error> for CacheError {
    fn from(err: reqwest::Error) -> Self {
        CacheError::Transport(err.to_string())
    }
}

// == Result Type Alias ==
/// Convenience Result type for the cache.
pub type Result<T> = std::result::Result<T, CacheError>;
