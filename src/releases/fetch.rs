// Release fetcher: cached listing of upstream Go release tags

use crate::config::Config;
use crate::constants::{RETRY_BASE_DELAY_MS, RETRY_MAX_DELAY_SECS};
use crate::error::{CacheError, FetchError};
use crate::http;
use crate::releases::cache::{ReleaseCache, unix_now};
use crate::releases::version::{self, GoVersion};
use log::{debug, info, warn};
use reqwest::Client;
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// One entry of a listing page. Only the tag name matters.
#[derive(Debug, Deserialize)]
struct Tag {
    name: String,
}

pub struct ReleaseFetcher {
    client: Client,
    releases_url: String,
    cache_path: PathBuf,
    token: Option<String>,
    max_pages: u32,
    retries: u32,
    retry_delay: Duration,
}

impl ReleaseFetcher {
    pub fn new(config: &Config) -> anyhow::Result<Self> {
        Ok(Self {
            client: http::client(config)?,
            releases_url: config.releases_url.clone(),
            cache_path: config.releases_path(),
            token: config.github_token.clone(),
            max_pages: config.max_pages,
            retries: config.retries,
            retry_delay: Duration::from_millis(RETRY_BASE_DELAY_MS),
        })
    }

    #[cfg(test)]
    fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    /// Sorted, deduplicated releases. A fresh cache answers without touching the
    /// network unless `refresh` is set; otherwise the whole listing is fetched and
    /// the cache replaced.
    pub async fn fetch(&self, refresh: bool) -> Result<Vec<GoVersion>, FetchError> {
        self.fetch_at(refresh, unix_now()).await
    }

    async fn fetch_at(&self, refresh: bool, now: i64) -> Result<Vec<GoVersion>, FetchError> {
        if !refresh {
            if let Some(cache) = self.cached()? {
                if cache.is_fresh(now) {
                    debug!(
                        "Using cached release list from {} ({} entries)",
                        self.cache_path.display(),
                        cache.releases.len()
                    );
                    return Ok(version::parse_releases(&cache.releases));
                }
                debug!("Cached release list is stale (fetched at {})", cache.fetched);
            }
        }

        let names = self.fetch_all_names().await?;
        let mut releases = version::parse_releases(&names);
        version::sort_releases(&mut releases);
        info!(
            "Fetched {} tags, {} releases",
            names.len(),
            releases.len()
        );

        ReleaseCache::new(now, version::release_names(&releases)).save(&self.cache_path)?;
        Ok(releases)
    }

    /// Load the cache record; a missing or corrupt record only means "no cache".
    fn cached(&self) -> Result<Option<ReleaseCache>, FetchError> {
        match ReleaseCache::load(&self.cache_path) {
            Ok(cache) => Ok(Some(cache)),
            Err(CacheError::NotFound { path }) => {
                debug!("No release cache at {}", path.display());
                Ok(None)
            }
            Err(e @ CacheError::Corrupt { .. }) => {
                warn!("{}, fetching a fresh release list", e);
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Walk the listing from page 0 until an empty page.
    async fn fetch_all_names(&self) -> Result<Vec<String>, FetchError> {
        let mut names = Vec::new();

        for page in 0..self.max_pages {
            let tags = self.fetch_page(page).await?;
            if tags.is_empty() {
                debug!("Release listing ended at page {}", page);
                return Ok(names);
            }
            names.extend(tags.into_iter().map(|tag| tag.name));
        }

        Err(FetchError::PageLimit {
            limit: self.max_pages,
        })
    }

    async fn fetch_page(&self, page: u32) -> Result<Vec<Tag>, FetchError> {
        let url = self.page_url(page);
        let mut attempt = 0;

        loop {
            match self.fetch_page_once(&url).await {
                Err(FetchError::Network { url, source })
                    if attempt < self.retries && http::is_transient(&source) =>
                {
                    let delay = self.backoff(attempt);
                    attempt += 1;
                    warn!(
                        "Request to {} failed ({}), retrying in {:?} ({}/{})",
                        url, source, delay, attempt, self.retries
                    );
                    tokio::time::sleep(delay).await;
                }
                result => return result,
            }
        }
    }

    /// Doubling delay before retry `attempt + 1`, capped.
    fn backoff(&self, attempt: u32) -> Duration {
        let factor = 2u32.checked_pow(attempt).unwrap_or(u32::MAX);
        self.retry_delay
            .saturating_mul(factor)
            .min(Duration::from_secs(RETRY_MAX_DELAY_SECS))
    }

    async fn fetch_page_once(&self, url: &str) -> Result<Vec<Tag>, FetchError> {
        debug!("GET {}", url);
        let network = |source| FetchError::Network {
            url: url.to_string(),
            source,
        };

        let request = self
            .client
            .get(url)
            .header("Accept", "application/vnd.github+json");
        let response = http::with_token(request, self.token.as_deref())
            .send()
            .await
            .map_err(network)?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::RemoteStatus {
                url: url.to_string(),
                status,
            });
        }

        let body = response.bytes().await.map_err(network)?;
        serde_json::from_slice(&body).map_err(|source| FetchError::Decode {
            url: url.to_string(),
            source,
        })
    }

    fn page_url(&self, page: u32) -> String {
        let separator = if self.releases_url.contains('?') { '&' } else { '?' };
        format!("{}{}page={}", self.releases_url, separator, page)
    }
}
