// Config module for resolving where goup keeps its state and which endpoints it talks to

use crate::constants;
use anyhow::Context;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Resolved runtime configuration, built once in `main` and handed to every component.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Directory holding `releases.json`, lock files and `tpl/`.
    pub home: PathBuf,
    /// Toolchain installation directory, replaced wholesale on install.
    pub install_dir: PathBuf,
    pub releases_url: String,
    pub download_url: String,
    pub http_timeout: Duration,
    pub max_pages: u32,
    pub retries: u32,
    pub github_token: Option<String>,
}

/// Optional `goup.toml` next to the executable.
#[derive(Debug, Default, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
struct FileConfig {
    home: Option<PathBuf>,
    install_dir: Option<PathBuf>,
    releases_url: Option<String>,
    download_url: Option<String>,
    http_timeout: Option<u64>,
    max_pages: Option<u32>,
    retries: Option<u32>,
}

impl Config {
    /// Defaults, then `goup.toml` in the program directory, then `GOUP_*` environment variables.
    pub fn load() -> anyhow::Result<Self> {
        let program_dir = program_dir()?;
        let file = read_file_config(&program_dir.join(constants::CONFIG_FILE))?;
        Self::resolve(program_dir, file, |key| std::env::var(key).ok())
    }

    fn resolve(
        program_dir: PathBuf,
        file: FileConfig,
        env: impl Fn(&str) -> Option<String>,
    ) -> anyhow::Result<Self> {
        let env = |key: &str| env(key).filter(|value| !value.trim().is_empty());

        let home = env("GOUP_HOME")
            .map(PathBuf::from)
            .or(file.home)
            .unwrap_or(program_dir);
        let install_dir = env("GOUP_INSTALL_DIR")
            .map(PathBuf::from)
            .or(file.install_dir)
            .unwrap_or_else(|| PathBuf::from(constants::DEFAULT_INSTALL_DIR));
        let releases_url = env("GOUP_RELEASES_URL")
            .or(file.releases_url)
            .unwrap_or_else(|| constants::DEFAULT_RELEASES_URL.to_string());
        let download_url = env("GOUP_DOWNLOAD_URL")
            .or(file.download_url)
            .unwrap_or_else(|| constants::DEFAULT_DOWNLOAD_URL.to_string());

        let http_timeout = match env("GOUP_HTTP_TIMEOUT") {
            Some(value) => parse_number("GOUP_HTTP_TIMEOUT", &value)?,
            None => file
                .http_timeout
                .unwrap_or(constants::DEFAULT_HTTP_TIMEOUT_SECS),
        };
        let max_pages = match env("GOUP_MAX_PAGES") {
            Some(value) => parse_number("GOUP_MAX_PAGES", &value)?,
            None => file.max_pages.unwrap_or(constants::DEFAULT_MAX_PAGES),
        };
        let retries = match env("GOUP_RETRIES") {
            Some(value) => parse_number("GOUP_RETRIES", &value)?,
            None => file.retries.unwrap_or(constants::DEFAULT_RETRIES),
        };

        Ok(Self {
            home,
            install_dir,
            releases_url: releases_url.trim_end_matches('/').to_string(),
            download_url: download_url.trim_end_matches('/').to_string(),
            http_timeout: Duration::from_secs(http_timeout),
            max_pages,
            retries,
            github_token: env("GITHUB_TOKEN"),
        })
    }

    pub fn releases_path(&self) -> PathBuf {
        self.home.join(constants::RELEASES_FILE)
    }

    pub fn template_dir(&self) -> PathBuf {
        self.home.join(constants::TEMPLATE_DIR)
    }
}

/// Directory of the running executable with symlinks resolved, so state travels with the tool.
pub fn program_dir() -> anyhow::Result<PathBuf> {
    let exe = std::env::current_exe().context("Failed to locate the running executable")?;
    let exe = exe
        .canonicalize()
        .with_context(|| format!("Failed to resolve {}", exe.display()))?;
    exe.parent()
        .map(Path::to_path_buf)
        .ok_or_else(|| anyhow::anyhow!("Executable {} has no parent directory", exe.display()))
}

fn read_file_config(path: &Path) -> anyhow::Result<FileConfig> {
    match std::fs::read_to_string(path) {
        Ok(text) => {
            toml::from_str(&text).with_context(|| format!("Invalid config file {}", path.display()))
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(FileConfig::default()),
        Err(e) => Err(e).with_context(|| format!("Failed to read {}", path.display())),
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> anyhow::Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| anyhow::anyhow!("{} must be a non-negative integer, got '{}'", key, value))
}
