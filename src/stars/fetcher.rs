//! Paginated, rate-limited GitHub API client

use std::time::{Duration, SystemTime, UNIX_EPOCH};

#[cfg(test)]
use mockall::automock;

use indexmap::IndexSet;
use reqwest::StatusCode;
use reqwest::header::HeaderMap;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::config::{FETCH_BACKOFF_BASE_MS, FETCH_MAX_ATTEMPTS, PER_PAGE, RATE_LIMIT_MAX_WAIT_SECS};
use crate::stars::error::FetchError;

/// Default base URL for the GitHub API
pub const DEFAULT_BASE_URL: &str = "https://api.github.com";

const API_VERSION: &str = "2022-11-28";

/// Trait for fetching star relationships from the upstream API
#[cfg_attr(test, automock)]
#[async_trait::async_trait]
pub trait StarFetcher: Send + Sync {
    /// Users who starred `owner/repo`, in API return order
    async fn fetch_stargazers(&self, owner: &str, repo: &str) -> Result<Vec<String>, FetchError>;

    /// Repositories starred by `user`, as "owner/repo" full names
    async fn fetch_starred(&self, user: &str) -> Result<Vec<String>, FetchError>;
}

#[derive(Debug, Deserialize)]
struct StargazerEntry {
    login: String,
}

#[derive(Debug, Deserialize)]
struct StarredRepo {
    full_name: String,
}

/// GitHub API client
///
/// Pages through list endpoints until a page comes back shorter than the
/// requested page size. A rate-limit response suspends until the advertised
/// reset time and retries the same page exactly once; transient failures are
/// retried with bounded exponential backoff.
pub struct GitHubClient {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
    per_page: usize,
    backoff_base_ms: u64,
}

impl GitHubClient {
    /// Creates a new client against a custom base URL.
    /// `token` is sent as a bearer token when present; anonymous requests
    /// are allowed but get a much lower rate-limit ceiling.
    pub fn new(base_url: &str, token: Option<String>) -> Self {
        Self {
            client: reqwest::Client::builder()
                .user_agent("stargazer")
                .build()
                .expect("Failed to create HTTP client"),
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
            per_page: PER_PAGE,
            backoff_base_ms: FETCH_BACKOFF_BASE_MS,
        }
    }

    #[cfg(test)]
    fn with_per_page(mut self, per_page: usize) -> Self {
        self.per_page = per_page;
        self
    }

    #[cfg(test)]
    fn with_backoff_base(mut self, backoff_base_ms: u64) -> Self {
        self.backoff_base_ms = backoff_base_ms;
        self
    }

    /// Fetch one page, handling auth, rate limits and transient retries
    async fn get_json<T: DeserializeOwned>(&self, url: &str, resource: &str) -> Result<T, FetchError> {
        let mut attempt: u32 = 0;
        let mut rate_limit_waited = false;

        loop {
            let mut request = self
                .client
                .get(url)
                .header("Accept", "application/vnd.github+json")
                .header("X-GitHub-Api-Version", API_VERSION);
            if let Some(token) = &self.token {
                request = request.bearer_auth(token);
            }

            let response = match request.send().await {
                Ok(response) => response,
                Err(e) => {
                    attempt += 1;
                    if attempt >= FETCH_MAX_ATTEMPTS {
                        return Err(FetchError::FetchFailed {
                            resource: resource.to_string(),
                            cause: e.to_string(),
                        });
                    }
                    let delay = self.backoff_delay(attempt);
                    warn!("Request to {} failed ({}), retrying in {:?}", url, e, delay);
                    sleep(delay).await;
                    continue;
                }
            };

            let status = response.status();

            if status == StatusCode::NOT_FOUND {
                return Err(FetchError::NotFound(resource.to_string()));
            }

            if status == StatusCode::UNAUTHORIZED {
                return Err(FetchError::Unauthorized);
            }

            if is_rate_limited(status, response.headers()) {
                let reset_at = rate_limit_reset(response.headers());
                if rate_limit_waited {
                    return Err(FetchError::RateLimited { reset_at });
                }
                let wait = wait_until(reset_at);
                warn!("Rate limited by GitHub, waiting {:?} before retrying {}", wait, url);
                sleep(wait).await;
                rate_limit_waited = true;
                continue;
            }

            if status.is_server_error() {
                attempt += 1;
                if attempt >= FETCH_MAX_ATTEMPTS {
                    return Err(FetchError::FetchFailed {
                        resource: resource.to_string(),
                        cause: format!("upstream status {status}"),
                    });
                }
                let delay = self.backoff_delay(attempt);
                warn!("GitHub returned {} for {}, retrying in {:?}", status, url, delay);
                sleep(delay).await;
                continue;
            }

            if !status.is_success() {
                warn!("GitHub API returned status {}: {}", status, url);
                return Err(FetchError::InvalidResponse(format!(
                    "Unexpected status: {status}"
                )));
            }

            return response.json().await.map_err(|e| {
                warn!("Failed to parse GitHub response: {}", e);
                FetchError::InvalidResponse(e.to_string())
            });
        }
    }

    fn backoff_delay(&self, attempt: u32) -> Duration {
        Duration::from_millis(self.backoff_base_ms << (attempt - 1))
    }
}

#[async_trait::async_trait]
impl StarFetcher for GitHubClient {
    async fn fetch_stargazers(&self, owner: &str, repo: &str) -> Result<Vec<String>, FetchError> {
        let resource = format!("{owner}/{repo}");
        let mut users: IndexSet<String> = IndexSet::new();
        let mut page: u32 = 1;

        loop {
            let url = format!(
                "{}/repos/{}/{}/stargazers?per_page={}&page={}",
                self.base_url, owner, repo, self.per_page, page
            );
            let entries: Vec<StargazerEntry> = self.get_json(&url, &resource).await?;
            let count = entries.len();
            for entry in entries {
                users.insert(entry.login);
            }
            if count < self.per_page {
                break;
            }
            page += 1;
        }

        debug!("Fetched {} stargazers for {}", users.len(), resource);
        Ok(users.into_iter().collect())
    }

    async fn fetch_starred(&self, user: &str) -> Result<Vec<String>, FetchError> {
        let mut repos: IndexSet<String> = IndexSet::new();
        let mut page: u32 = 1;

        loop {
            let url = format!(
                "{}/users/{}/starred?per_page={}&page={}",
                self.base_url, user, self.per_page, page
            );
            let entries: Vec<StarredRepo> = self.get_json(&url, user).await?;
            let count = entries.len();
            for entry in entries {
                repos.insert(entry.full_name);
            }
            if count < self.per_page {
                break;
            }
            page += 1;
        }

        debug!("Fetched {} starred repos for {}", repos.len(), user);
        Ok(repos.into_iter().collect())
    }
}

fn is_rate_limited(status: StatusCode, headers: &HeaderMap) -> bool {
    if status == StatusCode::TOO_MANY_REQUESTS {
        return true;
    }
    // GitHub signals primary rate limits as 403 with a zeroed quota header
    status == StatusCode::FORBIDDEN && header_u64(headers, "x-ratelimit-remaining") == Some(0)
}

/// Epoch-seconds timestamp at which the rate limit window resets
fn rate_limit_reset(headers: &HeaderMap) -> Option<u64> {
    header_u64(headers, "x-ratelimit-reset")
        .or_else(|| header_u64(headers, "retry-after").map(|secs| now_epoch_secs() + secs))
}

fn wait_until(reset_at: Option<u64>) -> Duration {
    let secs = reset_at
        .map(|reset| reset.saturating_sub(now_epoch_secs()))
        .unwrap_or(1)
        .min(RATE_LIMIT_MAX_WAIT_SECS);
    Duration::from_secs(secs)
}

fn header_u64(headers: &HeaderMap, name: &str) -> Option<u64> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse().ok())
}

fn now_epoch_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system time before UNIX epoch")
        .as_secs()
}
