//! Streaming archive download.
//!
//! The body is written chunk by chunk to a file next to the install directory
//! and hashed on the way, so the archive is never held in memory.

use crate::error::InstallError;
use crate::ui;
use futures::StreamExt;
use log::debug;
use reqwest::Client;
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// A completed download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Downloaded {
    pub bytes: u64,
    /// Hex sha256 of the archive as received.
    pub sha256: String,
}

/// Download `url` into `dest`. When `expected_sha256` is given (bare hex or
/// `sha256:<hex>`), a different digest fails with `ChecksumMismatch`.
pub async fn download_archive(
    client: &Client,
    url: &str,
    dest: &Path,
    expected_sha256: Option<&str>,
) -> Result<Downloaded, InstallError> {
    debug!("Downloading {} to {}", url, dest.display());
    let network = |source| InstallError::Network {
        url: url.to_string(),
        source,
    };

    let response = client.get(url).send().await.map_err(network)?;
    let status = response.status();
    if !status.is_success() {
        return Err(InstallError::RemoteStatus {
            url: url.to_string(),
            status,
        });
    }

    let name = url.rsplit('/').next().unwrap_or(url);
    let pb = ui::download_bar(response.content_length(), &format!("Downloading {}", name));

    let result = async {
        let mut file = File::create(dest).map_err(|e| InstallError::fs(dest, e))?;
        let mut hasher = Sha256::new();
        let mut stream = response.bytes_stream();
        let mut bytes = 0u64;

        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(network)?;
            hasher.update(&chunk);
            file.write_all(&chunk)
                .map_err(|e| InstallError::fs(dest, e))?;
            bytes += chunk.len() as u64;
            pb.set_position(bytes);
        }
        file.sync_all().map_err(|e| InstallError::fs(dest, e))?;

        Ok(Downloaded {
            bytes,
            sha256: hex::encode(hasher.finalize()),
        })
    }
    .await;
    ui::clear_bar(&pb);
    let downloaded = result?;

    debug!(
        "Downloaded {} bytes, sha256:{}",
        downloaded.bytes, downloaded.sha256
    );

    if let Some(expected) = expected_sha256 {
        let expected = expected.trim();
        let expected = expected.strip_prefix("sha256:").unwrap_or(expected);
        if !expected.eq_ignore_ascii_case(&downloaded.sha256) {
            return Err(InstallError::ChecksumMismatch {
                expected: expected.to_lowercase(),
                actual: downloaded.sha256,
            });
        }
    }

    Ok(downloaded)
}
