//! HTTP surface: the WebSocket upgrade plus the notification endpoints that
//! sibling services and clients call.

use crate::error::ApiError;
use crate::notification::{NewNotification, Notification, NotificationId, Notifier};
use crate::store::NotificationStore;
use crate::ws::handler::PushOnly;
use crate::ws::service::NotificationHub;
use crate::ws::types::UserId;
use crate::ws::upgrade::upgrade_handler;
use axum::{
    Json, Router,
    extract::{FromRef, Path, State, rejection::JsonRejection},
    http::StatusCode,
    routing::{delete, get, patch, post},
};
use serde_json::{Value, json};
use std::sync::Arc;
use tracing::info;

/// Shared state for every route.
#[derive(Clone)]
pub struct AppState {
    pub hub: NotificationHub,
    pub store: Arc<dyn NotificationStore>,
    pub notifier: Notifier,
}

impl AppState {
    /// Wires a hub and a store together behind one notifier.
    pub fn new(hub: NotificationHub, store: Arc<dyn NotificationStore>, notifier: Notifier) -> Self {
        Self { hub, store, notifier }
    }
}

impl FromRef<AppState> for NotificationHub {
    fn from_ref(state: &AppState) -> Self {
        state.hub.clone()
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/ws/{user_id}", get(upgrade_handler::<PushOnly>))
        .route("/users/{user_id}/notifications", get(list_notifications))
        .route(
            "/users/{user_id}/notifications/{notification_id}/read",
            patch(mark_notification_read),
        )
        .route(
            "/users/{user_id}/notifications/{notification_id}",
            delete(delete_notification),
        )
        .route("/notifications", post(create_notification))
        .route("/health", get(health))
        .with_state(state)
}

async fn list_notifications(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<Vec<Notification>>, ApiError> {
    let records = state.store.list_for(&UserId::from(user_id)).await?;
    Ok(Json(records))
}

async fn mark_notification_read(
    State(state): State<AppState>,
    Path((user_id, notification_id)): Path<(String, String)>,
) -> Result<Json<Value>, ApiError> {
    let id = parse_notification_id(&notification_id)?;
    if state.store.mark_read(&UserId::from(user_id), id).await? {
        Ok(Json(json!({ "message": "Notification marked as read" })))
    } else {
        Err(ApiError::NotFound(
            "Notification not found for this user".to_owned(),
        ))
    }
}

async fn delete_notification(
    State(state): State<AppState>,
    Path((user_id, notification_id)): Path<(String, String)>,
) -> Result<Json<Value>, ApiError> {
    let id = parse_notification_id(&notification_id)?;
    if state.store.delete(&UserId::from(user_id), id).await? {
        Ok(Json(json!({ "message": "Notification deleted" })))
    } else {
        Err(ApiError::NotFound(
            "Notification not found for this user".to_owned(),
        ))
    }
}

/// Producer endpoint: push live (best-effort) and persist.
async fn create_notification(
    State(state): State<AppState>,
    payload: Result<Json<NewNotification>, JsonRejection>,
) -> Result<(StatusCode, Json<Notification>), ApiError> {
    let Json(new) = payload?;
    if new.from.as_str().is_empty() || new.to.as_str().is_empty() {
        return Err(ApiError::BadRequest("from and to are required".to_owned()));
    }
    if new.message.trim().is_empty() {
        return Err(ApiError::BadRequest("message is required".to_owned()));
    }

    let notification = state.notifier.notify(new).await?;
    info!(id = %notification.id, to = %notification.to, "Notification created");
    Ok((StatusCode::CREATED, Json(notification)))
}

async fn health(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "connections": state.hub.registry().len(),
    }))
}

fn parse_notification_id(raw: &str) -> Result<NotificationId, ApiError> {
    raw.parse()
        .map_err(|_| ApiError::BadRequest("Invalid notification id".to_owned()))
}
