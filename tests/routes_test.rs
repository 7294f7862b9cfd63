//! REST surface tests, driven through the router without a socket.

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, StatusCode},
};
use serde_json::{Value, json};
use social_realtime::prelude::*;
use social_realtime::routes::{self, AppState};
use std::sync::Arc;
use tower::ServiceExt;

fn test_state() -> AppState {
    let hub = NotificationHub::new(Arc::new(ConnectionRegistry::new()));
    let store: Arc<dyn NotificationStore> = Arc::new(InMemoryNotificationStore::new());
    let notifier = Notifier::new(hub.clone(), Arc::clone(&store), PushFormat::Message);
    AppState::new(hub, store, notifier)
}

async fn call(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn empty(method: &str, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

#[tokio::test]
async fn test_create_then_list_notifications() {
    let app = routes::router(test_state());

    let (status, created) = call(
        &app,
        post_json(
            "/notifications",
            json!({ "type": "comment", "from": "b", "to": "a", "message": "Comentó tu post", "relatedPostId": "p1" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["type"], "comment");
    assert_eq!(created["read"], false);
    assert_eq!(created["relatedPostId"], "p1");

    let (status, listed) = call(&app, empty("GET", "/users/a/notifications")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listed.as_array().unwrap().len(), 1);
    assert_eq!(listed[0]["id"], created["id"]);

    let (_, other) = call(&app, empty("GET", "/users/b/notifications")).await;
    assert!(other.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_create_rejects_missing_message() {
    let app = routes::router(test_state());

    let (status, body) = call(
        &app,
        post_json(
            "/notifications",
            json!({ "type": "like", "from": "b", "to": "a", "message": "  " }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "message is required");
}

#[tokio::test]
async fn test_create_rejects_malformed_body_with_json_error() {
    let app = routes::router(test_state());

    let (status, body) = call(
        &app,
        post_json(
            "/notifications",
            json!({ "type": "like", "from": "b", "message": "Le dio like a tu post" }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    let message = body["message"].as_str().unwrap_or_default();
    assert!(message.starts_with("Invalid request body"), "got {:?}", body);

    let (status, body) = call(&app, post_json("/notifications", json!({ "type": 7 }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"].is_string());
}

#[tokio::test]
async fn test_mark_read_flow() {
    let app = routes::router(test_state());
    let (_, created) = call(
        &app,
        post_json(
            "/notifications",
            json!({ "type": "follow", "from": "b", "to": "a", "message": "Empezó a seguirte" }),
        ),
    )
    .await;
    let id = created["id"].as_str().unwrap().to_owned();

    let (status, _) = call(&app, empty("PATCH", &format!("/users/b/notifications/{}/read", id))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = call(&app, empty("PATCH", "/users/a/notifications/not-an-id/read")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Invalid notification id");

    let (status, _) = call(&app, empty("PATCH", &format!("/users/a/notifications/{}/read", id))).await;
    assert_eq!(status, StatusCode::OK);

    let (_, listed) = call(&app, empty("GET", "/users/a/notifications")).await;
    assert_eq!(listed[0]["read"], true);
}

#[tokio::test]
async fn test_delete_flow() {
    let app = routes::router(test_state());
    let (_, created) = call(
        &app,
        post_json(
            "/notifications",
            json!({ "type": "like", "from": "b", "to": "a", "message": "Le dio like a tu post" }),
        ),
    )
    .await;
    let id = created["id"].as_str().unwrap().to_owned();

    let (status, _) = call(&app, empty("DELETE", &format!("/users/a/notifications/{}", id))).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = call(&app, empty("DELETE", &format!("/users/a/notifications/{}", id))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, listed) = call(&app, empty("GET", "/users/a/notifications")).await;
    assert!(listed.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_health_reports_connection_count() {
    let app = routes::router(test_state());

    let (status, body) = call(&app, empty("GET", "/health")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "status": "ok", "connections": 0 }));
}

#[tokio::test]
async fn test_upgrade_without_handshake_is_rejected() {
    let app = routes::router(test_state());

    let (status, _) = call(&app, empty("GET", "/ws/some-user")).await;

    assert!(status.is_client_error());
}
