// Release cache: the last fetched release list, persisted as JSON

use crate::constants::RELEASES_TTL_SECS;
use crate::error::CacheError;
use crate::lock::FileLock;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

/// Snapshot of the upstream release list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseCache {
    /// Unix seconds of the live fetch that produced this record.
    pub fetched: i64,
    /// Release tags, already filtered and sorted ascending.
    pub releases: Vec<String>,
}

impl ReleaseCache {
    pub fn new(fetched: i64, releases: Vec<String>) -> Self {
        Self { fetched, releases }
    }

    pub fn load(path: &Path) -> Result<Self, CacheError> {
        let text = fs::read(path).map_err(|source| {
            if source.kind() == ErrorKind::NotFound {
                CacheError::NotFound {
                    path: path.to_path_buf(),
                }
            } else {
                CacheError::Unreadable {
                    path: path.to_path_buf(),
                    source,
                }
            }
        })?;

        serde_json::from_slice(&text).map_err(|source| CacheError::Corrupt {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Replace the record on disk. The body goes to a sibling temp file first and is
    /// renamed over the old record, under an exclusive lock on `<path>.lock`.
    pub fn save(&self, path: &Path) -> Result<(), CacheError> {
        let write_failed = |source| CacheError::WriteFailed {
            path: path.to_path_buf(),
            source,
        };

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(write_failed)?;
        }

        let _lock = FileLock::acquire(&sibling(path, "lock")).map_err(write_failed)?;

        let body = serde_json::to_vec(self).map_err(|e| write_failed(e.into()))?;
        let temp_path = sibling(path, "tmp");
        if let Err(e) = fs::write(&temp_path, &body).and_then(|_| fs::rename(&temp_path, path)) {
            let _ = fs::remove_file(&temp_path);
            return Err(write_failed(e));
        }

        Ok(())
    }

    pub fn is_fresh(&self, now: i64) -> bool {
        self.fetched.saturating_add(RELEASES_TTL_SECS) >= now
    }
}

/// Current time as Unix seconds.
pub fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or_default()
}

fn sibling(path: &Path, extension: &str) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".");
    name.push(extension);
    path.with_file_name(name)
}
