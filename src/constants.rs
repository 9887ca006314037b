// Constants module for shared names, endpoints and defaults

/// Seconds a cached release list stays valid.
pub const RELEASES_TTL_SECS: i64 = 3600;

pub const RELEASES_FILE: &str = "releases.json";
pub const CONFIG_FILE: &str = "goup.toml";
pub const TEMPLATE_DIR: &str = "tpl";

pub const DEFAULT_RELEASES_URL: &str = "https://api.github.com/repos/golang/go/tags";
pub const DEFAULT_DOWNLOAD_URL: &str = "https://dl.google.com/go";

#[cfg(windows)]
pub const DEFAULT_INSTALL_DIR: &str = r"C:\Program Files\Go";
#[cfg(not(windows))]
pub const DEFAULT_INSTALL_DIR: &str = "/usr/local/go";

pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 300;
pub const DEFAULT_MAX_PAGES: u32 = 100;
pub const DEFAULT_RETRIES: u32 = 2;

/// Base delay before the first retry of a failed page request.
pub const RETRY_BASE_DELAY_MS: u64 = 500;

/// Upper bound for the backoff between retries.
pub const RETRY_MAX_DELAY_SECS: u64 = 30;
