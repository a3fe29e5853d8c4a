mod support;

use axum::http::StatusCode;
use serde_json::json;

use support::{TestApp, authed, json_request};

#[tokio::test]
async fn todo_lifecycle() {
    let app = TestApp::new();
    let token = app.login_as("planner").await;

    let (status, created) = app
        .send(json_request(
            "POST",
            "/api/todos",
            &json!({ "content": "  buy milk " }),
            Some(&token),
        ))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["content"], "buy milk");
    assert_eq!(created["is_completed"], false);

    let uri = format!("/api/todos/{}", created["id"].as_str().expect("id"));

    let (status, updated) = app
        .send(json_request(
            "PUT",
            &uri,
            &json!({ "content": "buy oat milk", "is_completed": true }),
            Some(&token),
        ))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["content"], "buy oat milk");
    assert_eq!(updated["is_completed"], true);

    let (status, fetched) = app.send(authed("GET", &uri, &token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["is_completed"], true);

    let (status, body) = app.send(authed("DELETE", &uri, &token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "message": "Todo deleted successfully" }));

    let (status, body) = app.send(authed("GET", &uri, &token)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, json!({ "error": "Todo not found" }));
}

#[tokio::test]
async fn empty_todo_is_rejected() {
    let app = TestApp::new();
    let token = app.login_as("lazy").await;

    let (status, _) = app
        .send(json_request(
            "POST",
            "/api/todos",
            &json!({ "content": "   " }),
            Some(&token),
        ))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn todos_are_listed_per_user() {
    let app = TestApp::new();
    let alice = app.login_as("alice").await;
    let bob = app.login_as("bob_b").await;

    for content in ["first", "second"] {
        let (status, _) = app
            .send(json_request(
                "POST",
                "/api/todos",
                &json!({ "content": content }),
                Some(&alice),
            ))
            .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let (_, listed) = app.send(authed("GET", "/api/todos", &alice)).await;
    assert_eq!(listed.as_array().expect("array").len(), 2);

    let (_, listed) = app.send(authed("GET", "/api/todos", &bob)).await;
    assert_eq!(listed, json!([]));

    let (_, created) = app
        .send(json_request(
            "POST",
            "/api/todos",
            &json!({ "content": "alice only" }),
            Some(&alice),
        ))
        .await;
    let uri = format!("/api/todos/{}", created["id"].as_str().expect("id"));
    let (status, _) = app.send(authed("DELETE", &uri, &bob)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
