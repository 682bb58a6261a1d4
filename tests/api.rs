//! End-to-end tests for the HTTP API against a mocked GitHub upstream

use std::sync::Arc;

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode};
use mockito::{Matcher, ServerGuard};
use serde_json::{Value, json};
use tempfile::TempDir;
use tower::ServiceExt;

use stargazer::server::{ApiState, create_router};
use stargazer::stars::cache::StarCache;

fn test_router(upstream_url: &str, temp_dir: &TempDir) -> Router {
    let db_path = temp_dir.path().join("test.db");
    let cache = StarCache::new(&db_path, None).unwrap();
    create_router(Arc::new(ApiState {
        cache,
        base_url: upstream_url.to_string(),
        token: None,
    }))
}

async fn get(router: Router, uri: &str) -> (StatusCode, Value) {
    let response = router
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = serde_json::from_slice(&bytes).unwrap();
    (status, body)
}

async fn mock_stargazers(server: &mut ServerGuard, owner: &str, repo: &str, logins: &[&str]) {
    let body: Vec<Value> = logins.iter().map(|l| json!({"login": l})).collect();
    server
        .mock("GET", format!("/repos/{owner}/{repo}/stargazers").as_str())
        .match_query(Matcher::Any)
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(Value::Array(body).to_string())
        .create_async()
        .await;
}

async fn mock_starred(server: &mut ServerGuard, user: &str, repos: &[&str]) {
    let body: Vec<Value> = repos.iter().map(|r| json!({"full_name": r})).collect();
    server
        .mock("GET", format!("/users/{user}/starred").as_str())
        .match_query(Matcher::Any)
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(Value::Array(body).to_string())
        .create_async()
        .await;
}

#[tokio::test]
async fn starneighbours_returns_ranked_records() {
    let mut server = mockito::Server::new_async().await;
    let temp_dir = TempDir::new().unwrap();

    mock_stargazers(&mut server, "acme", "alpha", &["u1", "u2"]).await;
    mock_starred(&mut server, "u1", &["acme/alpha", "acme/beta"]).await;
    mock_starred(&mut server, "u2", &["acme/alpha", "acme/beta", "acme/gamma"]).await;

    let router = test_router(&server.url(), &temp_dir);
    let (status, body) = get(router, "/repos/acme/alpha/starneighbours").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!([
            {"repo": "acme/beta", "stargazers": ["u1", "u2"]},
            {"repo": "acme/gamma", "stargazers": ["u2"]}
        ])
    );
}

#[tokio::test]
async fn starneighbours_of_unstarred_repo_is_empty() {
    let mut server = mockito::Server::new_async().await;
    let temp_dir = TempDir::new().unwrap();

    mock_stargazers(&mut server, "acme", "quiet", &[]).await;

    let router = test_router(&server.url(), &temp_dir);
    let (status, body) = get(router, "/repos/acme/quiet/starneighbours").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!([]));
}

#[tokio::test]
async fn missing_repo_maps_to_404_and_is_not_cached() {
    let mut server = mockito::Server::new_async().await;
    let temp_dir = TempDir::new().unwrap();

    let upstream = server
        .mock("GET", "/repos/acme/ghost/stargazers")
        .match_query(Matcher::Any)
        .with_status(404)
        .with_body(r#"{"message": "Not Found"}"#)
        .expect(2)
        .create_async()
        .await;

    let router = test_router(&server.url(), &temp_dir);

    let (status, body) = get(router.clone(), "/repos/acme/ghost/starneighbours").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Repository or user not found: acme/ghost");

    // A failed lookup leaves no cache entry, so the next request hits
    // upstream again.
    let (status, _) = get(router, "/repos/acme/ghost/starneighbours").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    upstream.assert_async().await;
}

#[tokio::test]
async fn second_request_is_served_from_cache() {
    let mut server = mockito::Server::new_async().await;
    let temp_dir = TempDir::new().unwrap();

    let stargazers = server
        .mock("GET", "/repos/acme/alpha/stargazers")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"[{"login":"u1"}]"#)
        .expect(1)
        .create_async()
        .await;
    let starred = server
        .mock("GET", "/users/u1/starred")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"[{"full_name":"acme/beta"}]"#)
        .expect(1)
        .create_async()
        .await;

    let router = test_router(&server.url(), &temp_dir);

    let (_, first) = get(router.clone(), "/repos/acme/alpha/starneighbours").await;
    let (_, second) = get(router, "/repos/acme/alpha/starneighbours").await;

    assert_eq!(first, second);
    stargazers.assert_async().await;
    starred.assert_async().await;
}

#[tokio::test]
async fn invalid_owner_is_rejected_without_hitting_upstream() {
    let server = mockito::Server::new_async().await;
    let temp_dir = TempDir::new().unwrap();

    let router = test_router(&server.url(), &temp_dir);
    let (status, body) = get(router, "/repos/bad%20owner/repo/starneighbours").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"].as_str().unwrap().contains("Invalid owner"));
}

#[tokio::test]
async fn bad_credentials_map_to_401() {
    let mut server = mockito::Server::new_async().await;
    let temp_dir = TempDir::new().unwrap();

    server
        .mock("GET", "/repos/acme/alpha/stargazers")
        .match_query(Matcher::Any)
        .with_status(401)
        .with_body(r#"{"message": "Bad credentials"}"#)
        .create_async()
        .await;

    let router = test_router(&server.url(), &temp_dir);
    let (status, body) = get(router, "/repos/acme/alpha/starneighbours?gh_token=wrong").await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Invalid credentials");
}

#[tokio::test]
async fn healthz_reports_ok() {
    let server = mockito::Server::new_async().await;
    let temp_dir = TempDir::new().unwrap();

    let router = test_router(&server.url(), &temp_dir);
    let (status, body) = get(router, "/healthz").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"status": "ok"}));
}
