use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

// =============================================================================
// Fetch tuning constants
// =============================================================================

/// Number of items requested per page from the GitHub API (API maximum)
pub const PER_PAGE: usize = 100;

/// Maximum number of per-user starred-list fetches in flight at once
pub const MAX_CONCURRENT_FETCHES: usize = 10;

/// Total attempts for a single page on transient failures (network, 5xx)
pub const FETCH_MAX_ATTEMPTS: u32 = 3;

/// Base delay for exponential backoff between transient-failure retries
pub const FETCH_BACKOFF_BASE_MS: u64 = 250;

/// Upper bound on how long to suspend when GitHub reports a rate limit
pub const RATE_LIMIT_MAX_WAIT_SECS: u64 = 120;

/// Default lifetime of a cache entry when serving, in days.
/// The cache itself defaults to no expiry (TTL = infinity) when no
/// lifetime is configured.
pub const DEFAULT_CACHE_TTL_DAYS: u64 = 7;

/// Runtime settings for the HTTP server
#[derive(Debug, Clone)]
pub struct Settings {
    /// Address the HTTP server binds to
    pub bind: SocketAddr,
    /// Path to the SQLite cache database
    pub db_path: PathBuf,
    /// Default GitHub API token, overridable per request
    pub token: Option<String>,
    /// Cache entry lifetime; `None` keeps entries forever
    pub cache_ttl: Option<Duration>,
}

/// Returns the path to the data directory for stargazer.
/// Uses $XDG_DATA_HOME/stargazer if XDG_DATA_HOME is set,
/// otherwise falls back to ~/.local/share/stargazer,
/// or ./stargazer if neither is available.
pub fn data_dir() -> PathBuf {
    data_dir_with_env(std::env::var("XDG_DATA_HOME").ok(), dirs::home_dir())
}

/// Returns the path to the cache database file.
pub fn db_path() -> PathBuf {
    data_dir().join("stars.db")
}

fn data_dir_with_env(xdg_data_home: Option<String>, home_dir: Option<PathBuf>) -> PathBuf {
    let data_dir = xdg_data_home
        .map(PathBuf::from)
        .or_else(|| home_dir.map(|home| home.join(".local/share")))
        .unwrap_or_else(|| PathBuf::from("."));

    data_dir.join("stargazer")
}
