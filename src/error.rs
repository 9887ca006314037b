// Error types for the cache, fetch and install pipelines

use std::io;
use std::path::PathBuf;

use reqwest::StatusCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("release cache not found at {}", path.display())]
    NotFound { path: PathBuf },

    #[error("failed to read release cache {}", path.display())]
    Unreadable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("release cache {} is corrupt", path.display())]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to write release cache {}", path.display())]
    WriteFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request to {url} failed")]
    Network {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("status {status} received from {url}")]
    RemoteStatus { url: String, status: StatusCode },

    #[error("unexpected response body from {url}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("release listing did not end within {limit} pages")]
    PageLimit { limit: u32 },

    #[error(transparent)]
    Cache(#[from] CacheError),
}

#[derive(Debug, Error)]
pub enum InstallError {
    #[error("'{0}' is not a release version")]
    InvalidVersion(String),

    #[error("no prebuilt archives for {os}/{arch}")]
    UnsupportedPlatform { os: String, arch: String },

    #[error("download of {url} failed")]
    Network {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("status {status} received from {url}")]
    RemoteStatus { url: String, status: StatusCode },

    #[error("checksum mismatch: expected sha256:{expected}, got sha256:{actual}")]
    ChecksumMismatch { expected: String, actual: String },

    #[error("failed to decompress archive")]
    Decompress {
        #[source]
        source: io::Error,
    },

    #[error("refusing to extract unsafe entry {}", path.display())]
    UnsafeEntry { path: PathBuf },

    #[error("archive has no single root directory (staged at {})", staging.display())]
    MissingRoot { staging: PathBuf },

    #[error("filesystem operation failed on {}", path.display())]
    Filesystem {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("another install holds the lock {}", path.display())]
    Locked { path: PathBuf },
}

impl InstallError {
    pub fn fs(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Filesystem {
            path: path.into(),
            source,
        }
    }
}
