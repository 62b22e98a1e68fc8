use std::sync::Arc;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

use job_server::config::ServerConfig;
use job_server::scheduler::{DispatchCoordinator, Job};
use job_server::server::{router, AppState};
use job_server::storage::MemorySink;
use tokio_util::sync::CancellationToken;

/// Helper to create a router over a fresh coordinator
fn create_test_app(items: &[&str]) -> (Router, Arc<DispatchCoordinator>) {
    let coordinator = Arc::new(DispatchCoordinator::new(
        items.iter().copied().map(Job::from).collect(),
        CancellationToken::new(),
    ));
    let state = AppState::new(
        &ServerConfig::default(),
        coordinator.clone(),
        Arc::new(MemorySink::new()),
    );
    (router(state), coordinator)
}

async fn get(app: Router, uri: &str) -> (StatusCode, String, String) {
    let response = app
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let content_type = response
        .headers()
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_string();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    (status, content_type, String::from_utf8(body.to_vec()).unwrap())
}

#[tokio::test]
async fn test_stats_json_empty_ledger() {
    let (app, _coord) = create_test_app(&["A", "B", "C"]);
    let (status, content_type, body) = get(app, "/api/stats").await;

    assert_eq!(status, StatusCode::OK);
    assert!(content_type.contains("application/json"));

    let json: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(json["pending"], 3);
    assert_eq!(json["initial"], 3);
    assert_eq!(json["unique_contributors"], 0);
    assert_eq!(json["connected_workers"], 0);
    assert!(json["top_contributors"].as_array().unwrap().is_empty());
    assert!(json["activity"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_stats_json_reflects_dispatch() {
    let (app, coord) = create_test_app(&["A", "B", "C"]);
    coord.assign_next("9.9.9.9:1");
    coord.advance("9.9.9.9:1", chrono::NaiveDate::from_ymd_opt(2024, 5, 6).unwrap());

    let (_, _, body) = get(app, "/api/stats").await;
    let json: Value = serde_json::from_str(&body).unwrap();

    assert_eq!(json["pending"], 1);
    assert_eq!(json["unique_contributors"], 1);
    assert_eq!(json["connected_workers"], 1);
    assert_eq!(json["top_contributors"][0]["address"], "9.9.9.9:1");
    assert_eq!(json["top_contributors"][0]["contributions"], 1);
    assert_eq!(json["activity"][0]["label"], "05/06/24");
    assert_eq!(json["activity"][0]["count"], 1);
}

#[tokio::test]
async fn test_stats_page_is_html() {
    let (app, coord) = create_test_app(&["A", "B"]);
    coord.assign_next("127.0.0.1:5555");
    coord.advance("127.0.0.1:5555", chrono::NaiveDate::from_ymd_opt(2024, 5, 6).unwrap());

    let (status, content_type, body) = get(app, "/stats").await;
    assert_eq!(status, StatusCode::OK);
    assert!(content_type.contains("text/html"));
    assert!(body.contains("Contribution Statistics"));
    assert!(body.contains("Queue size:</strong> 0/2"));
    assert!(body.contains("<li>127.0.0.1:5555 - 1 contribution(s)</li>"));
}

#[tokio::test]
async fn test_stats_does_not_mutate_state() {
    let (app, coord) = create_test_app(&["A"]);
    get(app.clone(), "/stats").await;
    get(app, "/api/stats").await;

    assert_eq!(coord.pending(), 1);
    assert!(!coord.is_drained());
}

#[tokio::test]
async fn test_unknown_route_is_404() {
    let (app, _coord) = create_test_app(&["A"]);
    let (status, _, _) = get(app, "/jobs").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
