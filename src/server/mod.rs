//! HTTP API layer
//!
//! Exposes the star-neighbour computation as a small REST surface, mirroring
//! the upstream-facing pieces onto shared state:
//!
//! - `GET /repos/{owner}/{repo}/starneighbours` — ranked neighbour list
//! - `GET /healthz` — liveness probe

pub mod routes;
pub mod types;

use std::sync::Arc;

use axum::{Router, routing::get};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::config::Settings;
use crate::stars::cache::StarCache;
use crate::stars::fetcher::DEFAULT_BASE_URL;

/// Shared state for request handlers
pub struct ApiState {
    /// Star-list cache, shared across requests
    pub cache: StarCache,
    /// GitHub API base URL (overridable for tests)
    pub base_url: String,
    /// Default token; a request's `gh_token` query parameter takes precedence
    pub token: Option<String>,
}

/// Creates the router with all routes
pub fn create_router(state: Arc<ApiState>) -> Router {
    Router::new()
        .route(
            "/repos/{owner}/{repo}/starneighbours",
            get(routes::get_star_neighbours),
        )
        .route("/healthz", get(routes::health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Opens the cache and serves the API until the process is stopped
pub async fn run(settings: Settings) -> anyhow::Result<()> {
    if let Some(parent) = settings.db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let cache = StarCache::new(&settings.db_path, settings.cache_ttl)?;
    let state = Arc::new(ApiState {
        cache,
        base_url: DEFAULT_BASE_URL.to_string(),
        token: settings.token,
    });

    let listener = tokio::net::TcpListener::bind(settings.bind).await?;
    info!("Listening on {}", listener.local_addr()?);
    axum::serve(listener, create_router(state)).await?;

    Ok(())
}
