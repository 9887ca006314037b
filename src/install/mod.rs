// Install module: download a release archive and swap it into the install directory

pub mod archive;
pub mod download;
pub mod platform;
pub mod staging;

use crate::config::Config;
use crate::error::InstallError;
use crate::http;
use crate::lock::FileLock;
use crate::releases::GoVersion;
use log::{debug, info, warn};
use platform::Platform;
use reqwest::Client;
use staging::StagedPaths;
use std::fs;
use std::io;
use std::path::PathBuf;

/// What a finished install put in place.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallOutcome {
    pub version: String,
    pub install_dir: PathBuf,
    pub platform: Platform,
    pub bytes: u64,
    pub sha256: String,
    pub entries: usize,
}

pub struct Installer {
    client: Client,
    download_url: String,
    install_dir: PathBuf,
    platform: Option<Platform>,
}

impl Installer {
    pub fn new(config: &Config) -> anyhow::Result<Self> {
        Ok(Self {
            client: http::client(config)?,
            download_url: config.download_url.clone(),
            install_dir: config.install_dir.clone(),
            platform: None,
        })
    }

    /// Download archives for `platform` instead of the running one.
    #[cfg(test)]
    fn with_platform(mut self, platform: Platform) -> Self {
        self.platform = Some(platform);
        self
    }

    /// Install `version` (`1.21.0` or `go1.21.0`) into the install directory.
    ///
    /// The archive is downloaded and extracted beside the target, and the
    /// target is only replaced once extraction finished. On any error the
    /// previous install is left as it was.
    pub async fn install(
        &self,
        version: &str,
        sha256: Option<&str>,
    ) -> Result<InstallOutcome, InstallError> {
        let version = normalize_version(version)?;
        let platform = match self.platform {
            Some(platform) => platform,
            None => Platform::current()?,
        };

        let paths = StagedPaths::new(&self.install_dir)?;
        fs::create_dir_all(paths.parent()).map_err(|e| InstallError::fs(paths.parent(), e))?;

        let _lock = FileLock::try_acquire(&paths.lock)
            .map_err(|e| InstallError::fs(&paths.lock, e))?
            .ok_or_else(|| InstallError::Locked {
                path: paths.lock.clone(),
            })?;
        staging::cleanup_temp_dirs(&paths)?;

        let result = self.stage_and_promote(&version, platform, &paths, sha256).await;

        if let Err(e) = staging::cleanup_temp_dirs(&paths) {
            warn!("Failed to clean up after install: {}", e);
        }
        if let Ok(outcome) = &result {
            info!(
                "Installed {} ({}) into {}",
                outcome.version,
                outcome.platform,
                outcome.install_dir.display()
            );
        }
        result
    }

    async fn stage_and_promote(
        &self,
        version: &str,
        platform: Platform,
        paths: &StagedPaths,
        sha256: Option<&str>,
    ) -> Result<InstallOutcome, InstallError> {
        let url = platform.archive_url(&self.download_url, version);
        let downloaded =
            download::download_archive(&self.client, &url, &paths.download, sha256).await?;

        let format = platform.archive_format();
        let archive_path = paths.download.clone();
        let staging_dir = paths.staging.clone();
        let entries = tokio::task::spawn_blocking(move || {
            archive::extract(format, &archive_path, &staging_dir)
        })
        .await
        .map_err(|e| InstallError::fs(&paths.staging, io::Error::other(e)))??;
        debug!("Extracted {} entries into {}", entries, paths.staging.display());

        let root = staging::find_root(&paths.staging)?;
        staging::promote(paths, &root)?;

        Ok(InstallOutcome {
            version: version.to_string(),
            install_dir: paths.install_dir.clone(),
            platform,
            bytes: downloaded.bytes,
            sha256: downloaded.sha256,
            entries,
        })
    }
}

/// Accept `1.21.0` or `go1.21.0` and return the release tag form.
pub fn normalize_version(input: &str) -> Result<String, InstallError> {
    let trimmed = input.trim();
    let tag = if trimmed.starts_with("go") {
        trimmed.to_string()
    } else {
        format!("go{}", trimmed)
    };

    match GoVersion::parse(&tag) {
        Some(_) => Ok(tag),
        None => Err(InstallError::InvalidVersion(input.to_string())),
    }
}
