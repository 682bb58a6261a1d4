//! Request handlers

use std::sync::{Arc, LazyLock};
use std::time::{SystemTime, UNIX_EPOCH};

use axum::{
    Json,
    extract::{Path, Query, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use regex::Regex;
use tracing::error;

use crate::server::ApiState;
use crate::server::types::{ApiError, HealthResponse, TokenQuery};
use crate::stars::error::FetchError;
use crate::stars::fetcher::GitHubClient;
use crate::stars::neighbors::compute_neighbors;
use crate::stars::types::NeighborRecord;

static NAME_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_.-]+$").expect("valid pattern"));

/// GET /repos/{owner}/{repo}/starneighbours
///
/// Returns the repositories sharing at least one stargazer with the target,
/// most shared stargazers first. An optional `gh_token` query parameter
/// overrides the configured token for this request.
pub async fn get_star_neighbours(
    State(state): State<Arc<ApiState>>,
    Path((owner, repo)): Path<(String, String)>,
    Query(query): Query<TokenQuery>,
) -> Result<Json<Vec<NeighborRecord>>, Response> {
    if !NAME_PATTERN.is_match(&owner) {
        return Err(bad_request(
            "Invalid owner, should only contain letters, numbers, _, - and .",
        ));
    }
    if !NAME_PATTERN.is_match(&repo) {
        return Err(bad_request(
            "Invalid repository, should only contain letters, numbers, _, - and .",
        ));
    }

    let token = query.gh_token.or_else(|| state.token.clone());
    let fetcher = GitHubClient::new(&state.base_url, token);

    let records = compute_neighbors(&fetcher, &state.cache, &owner, &repo)
        .await
        .map_err(fetch_error_response)?;

    Ok(Json(records))
}

/// GET /healthz
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}

fn bad_request(message: &str) -> Response {
    (StatusCode::BAD_REQUEST, Json(ApiError::new(message))).into_response()
}

fn fetch_error_response(err: FetchError) -> Response {
    match err {
        FetchError::NotFound(resource) => (
            StatusCode::NOT_FOUND,
            Json(ApiError::new(format!(
                "Repository or user not found: {resource}"
            ))),
        )
            .into_response(),
        FetchError::Unauthorized => (
            StatusCode::UNAUTHORIZED,
            Json(ApiError::new("Invalid credentials")),
        )
            .into_response(),
        FetchError::RateLimited { reset_at } => {
            let mut response = (
                StatusCode::TOO_MANY_REQUESTS,
                Json(ApiError::new("GitHub rate limit exceeded")),
            )
                .into_response();
            if let Some(reset_at) = reset_at {
                let now = SystemTime::now()
                    .duration_since(UNIX_EPOCH)
                    .map(|d| d.as_secs())
                    .unwrap_or(0);
                let secs = reset_at.saturating_sub(now);
                if let Ok(value) = header::HeaderValue::from_str(&secs.to_string()) {
                    response.headers_mut().insert(header::RETRY_AFTER, value);
                }
            }
            response
        }
        FetchError::FetchFailed { .. } | FetchError::InvalidResponse(_) => {
            error!("Upstream failure: {}", err);
            (
                StatusCode::BAD_GATEWAY,
                Json(ApiError::new("Unexpected upstream error")),
            )
                .into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("rust-lang", true)]
    #[case("user.name_1-x", true)]
    #[case("", false)]
    #[case("bad/name", false)]
    #[case("spa ce", false)]
    fn name_pattern_matches_expected(#[case] name: &str, #[case] expected: bool) {
        assert_eq!(NAME_PATTERN.is_match(name), expected);
    }

    #[rstest]
    #[case(FetchError::NotFound("a/b".to_string()), StatusCode::NOT_FOUND)]
    #[case(FetchError::Unauthorized, StatusCode::UNAUTHORIZED)]
    #[case(FetchError::RateLimited { reset_at: None }, StatusCode::TOO_MANY_REQUESTS)]
    #[case(
        FetchError::FetchFailed { resource: "a/b".to_string(), cause: "x".to_string() },
        StatusCode::BAD_GATEWAY
    )]
    #[case(FetchError::InvalidResponse("x".to_string()), StatusCode::BAD_GATEWAY)]
    fn fetch_errors_map_to_expected_status(
        #[case] err: FetchError,
        #[case] expected: StatusCode,
    ) {
        assert_eq!(fetch_error_response(err).status(), expected);
    }

    #[test]
    fn rate_limit_response_carries_retry_after() {
        let reset_at = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_secs()
            + 30;
        let response = fetch_error_response(FetchError::RateLimited {
            reset_at: Some(reset_at),
        });

        let retry_after = response
            .headers()
            .get(header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap();
        assert!(retry_after <= 30);
    }
}
