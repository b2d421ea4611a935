//! Integration tests for health endpoints and the static frontend.

mod helpers;

use axum::http::StatusCode;

use helpers::{INDEX_HTML, TestApp};

#[tokio::test]
async fn test_liveness() {
    let app = TestApp::new().await;
    let response = app.request("GET", "/healthz", None).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(&response.bytes[..], b"OK");
}

#[tokio::test]
async fn test_health_reports_components() {
    let app = TestApp::new().await;
    app.upload("A-101.pdf", "application/pdf", b"%PDF", &[]).await;

    let response = app.request("GET", "/api/health", None).await;
    assert_eq!(response.status, StatusCode::OK);

    let data = response.data();
    assert_eq!(data["status"], "ok");
    assert_eq!(data["metadata"]["backend"], "memory");
    assert_eq!(data["metadata"]["healthy"], true);
    assert_eq!(data["default_storage"], "memory");
    assert_eq!(data["storage"]["memory"], true);
    assert_eq!(data["file_count"], 1);
}

#[tokio::test]
async fn test_unknown_api_path_is_json_404() {
    let app = TestApp::new().await;
    let response = app.request("GET", "/api/nope", None).await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert_eq!(response.json()["error"], "NOT_FOUND");
}

#[tokio::test]
async fn test_frontend_served_at_root() {
    let app = TestApp::new().await;
    let response = app.request("GET", "/", None).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(&response.bytes[..], INDEX_HTML.as_bytes());
}

#[tokio::test]
async fn test_unknown_page_falls_back_to_index() {
    let app = TestApp::new().await;
    let response = app.request("GET", "/documents/A-101", None).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(&response.bytes[..], INDEX_HTML.as_bytes());
}
