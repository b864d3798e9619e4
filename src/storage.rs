//! Persistence Store
//!
//! Maps cache keys to JSON files on disk and keeps the pending-operation
//! queue in a single JSON file. Every write goes to a sibling `.tmp` file
//! that is renamed over the target, so a crash never leaves a truncated file.

use std::ffi::OsString;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tokio::fs;
use tracing::{debug, warn};

use crate::cache::CachedResponse;
use crate::error::{CacheError, Result};
use crate::queue::Operation;

const ENTRY_EXTENSION: &str = "json";
const TMP_SUFFIX: &str = ".tmp";

/// On-disk form of a cache entry: the response plus the key it belongs to.
#[derive(Serialize)]
struct PersistedEntryRef<'a> {
    key: &'a str,
    #[serde(flatten)]
    response: &'a CachedResponse,
}

#[derive(Deserialize)]
struct PersistedEntry {
    key: String,
    #[serde(flatten)]
    response: CachedResponse,
}

// == Disk Store ==
/// One JSON file per cache entry, named by the SHA-256 of its key.
#[derive(Debug, Clone)]
pub struct DiskStore {
    dir: PathBuf,
}

impl DiskStore {
    /// Opens (creating if needed) the cache directory.
    pub async fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)
            .await
            .map_err(|e| CacheError::io(&dir, e))?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Returns the file backing `key`.
    pub fn path_for(&self, key: &str) -> PathBuf {
        let digest = Sha256::digest(key.as_bytes());
        self.dir
            .join(format!("{}.{}", hex::encode(digest), ENTRY_EXTENSION))
    }

    // == Write ==
    /// Persists a response under `key`, replacing any previous file.
    pub async fn write(&self, key: &str, response: &CachedResponse) -> Result<()> {
        let data = serde_json::to_vec(&PersistedEntryRef { key, response })?;
        write_atomic(&self.path_for(key), &data).await
    }

    // == Remove ==
    /// Deletes the file backing `key`; a missing file is not an error.
    pub async fn remove(&self, key: &str) -> Result<()> {
        let path = self.path_for(key);
        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(CacheError::io(path, e)),
        }
    }

    // == Load All ==
    /// Reads every entry file, deleting leftovers that cannot be used.
    ///
    /// Temporary files, undecodable files and files whose name does not match
    /// their key's digest are removed with a warning.
    pub async fn load_all(&self) -> Result<Vec<(String, CachedResponse)>> {
        let mut dir = fs::read_dir(&self.dir)
            .await
            .map_err(|e| CacheError::io(&self.dir, e))?;
        let mut loaded = Vec::new();

        while let Some(item) = dir
            .next_entry()
            .await
            .map_err(|e| CacheError::io(&self.dir, e))?
        {
            let path = item.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some(ENTRY_EXTENSION) {
                if is_tmp(&path) {
                    debug!(path = %path.display(), "Removing interrupted write");
                    discard(&path).await;
                }
                continue;
            }

            match read_entry(&path).await {
                Ok(entry) if self.path_for(&entry.key) == path => {
                    loaded.push((entry.key, entry.response));
                }
                Ok(entry) => {
                    warn!(path = %path.display(), key = %entry.key, "Cache file name does not match its key, removing");
                    discard(&path).await;
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Unreadable cache file, removing");
                    discard(&path).await;
                }
            }
        }

        Ok(loaded)
    }

    // == Clear ==
    /// Deletes every file in the cache directory.
    ///
    /// Keeps going past individual failures, including stray directories,
    /// and reports them together. Returns the number of files removed.
    pub async fn clear(&self) -> Result<usize> {
        let mut dir = match fs::read_dir(&self.dir).await {
            Ok(dir) => dir,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(CacheError::io(&self.dir, e)),
        };

        let mut removed = 0;
        let mut failures = Vec::new();
        loop {
            let item = match dir.next_entry().await {
                Ok(Some(item)) => item,
                Ok(None) => break,
                Err(e) => {
                    failures.push(format!("{}: {}", self.dir.display(), e));
                    break;
                }
            };
            let path = item.path();
            // Directories are not ours to delete; removing one fails and is reported
            match fs::remove_file(&path).await {
                Ok(()) => removed += 1,
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => failures.push(format!("{}: {}", path.display(), e)),
            }
        }

        if failures.is_empty() {
            Ok(removed)
        } else {
            Err(CacheError::ClearIncomplete { failures })
        }
    }
}

async fn read_entry(path: &Path) -> Result<PersistedEntry> {
    let data = fs::read(path).await.map_err(|e| CacheError::io(path, e))?;
    Ok(serde_json::from_slice(&data)?)
}

// == Queue File ==
/// The single JSON array holding all pending operations.
#[derive(Debug, Clone)]
pub struct QueueFile {
    path: PathBuf,
}

impl QueueFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    // == Load ==
    /// Reads the queue; a missing or malformed file yields an empty queue.
    pub async fn load(&self) -> Vec<Operation> {
        let data = match fs::read(&self.path).await {
            Ok(data) => data,
            Err(e) if e.kind() == ErrorKind::NotFound => return Vec::new(),
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Failed to read pending operations");
                return Vec::new();
            }
        };

        // Older writers stored an empty queue as `null`
        match serde_json::from_slice::<Option<Vec<Operation>>>(&data) {
            Ok(ops) => ops.unwrap_or_default(),
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Pending operations file is corrupt, starting with an empty queue");
                Vec::new()
            }
        }
    }

    // == Save ==
    /// Rewrites the whole queue file.
    pub async fn save(&self, operations: &[Operation]) -> Result<()> {
        let data = serde_json::to_vec_pretty(operations)?;
        write_atomic(&self.path, &data).await
    }
}

// == Atomic Write ==
/// Writes `data` to `path.tmp` then renames it over `path`.
async fn write_atomic(path: &Path, data: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .await
            .map_err(|e| CacheError::io(parent, e))?;
    }

    let tmp = tmp_path(path);
    if let Err(e) = fs::write(&tmp, data).await {
        discard(&tmp).await;
        return Err(CacheError::io(tmp, e));
    }
    if let Err(e) = fs::rename(&tmp, path).await {
        discard(&tmp).await;
        return Err(CacheError::io(path, e));
    }
    Ok(())
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name: OsString = path.as_os_str().to_owned();
    name.push(TMP_SUFFIX);
    PathBuf::from(name)
}

fn is_tmp(path: &Path) -> bool {
    path.to_str().is_some_and(|p| p.ends_with(TMP_SUFFIX))
}

async fn discard(path: &Path) {
    if let Err(e) = fs::remove_file(path).await {
        if e.kind() != ErrorKind::NotFound {
            debug!(path = %path.display(), error = %e, "Failed to remove file");
        }
    }
}
