mod support;

use std::sync::atomic::Ordering;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::json;

use support::TestApp;

fn health_request() -> Request<Body> {
    Request::builder()
        .uri("/_health/db")
        .body(Body::empty())
        .expect("request")
}

#[tokio::test]
async fn healthy_database_returns_no_content() {
    let app = TestApp::new();
    let (status, body) = app.send(health_request()).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert!(body.is_null());
}

#[tokio::test]
async fn database_outage_is_service_unavailable() {
    let app = TestApp::new();
    app.repos.database_down.store(true, Ordering::SeqCst);

    let (status, body) = app.send(health_request()).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body, json!({ "error": "Service temporarily unavailable" }));
}
