//! Provides the Axum handlers for upgrading `GET /ws/{user_id}` to a WebSocket.

use crate::ws::handler::InboundHandler;
use crate::ws::service::NotificationHub;
use crate::ws::types::UserId;
use axum::{
    extract::{Path, State, ws::WebSocketUpgrade},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use std::future::Future;
use tracing::{instrument, warn};

/// Upgrades the request and registers the socket under the user id taken from
/// the path.
///
/// The id is not checked against any credential here. Deployments that need
/// that binding should route through
/// [`authenticated_upgrade_handler`](crate::auth::authenticated_upgrade_handler)
/// instead.
///
/// ```rust,no_run
/// # use axum::{Router, routing::get};
/// # use std::sync::Arc;
/// # use social_realtime::prelude::*;
/// let hub = NotificationHub::new(Arc::new(ConnectionRegistry::new()));
/// let app: Router = Router::new()
///     .route("/ws/{user_id}", get(upgrade_handler::<PushOnly>))
///     .with_state(hub);
/// ```
pub async fn upgrade_handler<H: InboundHandler>(
    ws: WebSocketUpgrade,
    State(hub): State<NotificationHub<H>>,
    Path(user_id): Path<String>,
) -> Response {
    upgrade_with(ws, hub, UserId::from(user_id), |_| async { Ok(()) }).await
}

/// Runs `validator` for the requested user id and, if it passes, upgrades the
/// connection and hands it to the hub.
///
/// A failed validation answers with the validator's status code and creates no
/// state. A failed handshake is logged by the transport callback and likewise
/// leaves the registry untouched.
#[instrument(skip_all, fields(user_id = %user_id))]
pub async fn upgrade_with<H, V, F>(
    ws: WebSocketUpgrade,
    hub: NotificationHub<H>,
    user_id: UserId,
    validator: V,
) -> Response
where
    H: InboundHandler,
    V: FnOnce(UserId) -> F,
    F: Future<Output = Result<(), StatusCode>>,
{
    if let Err(status_code) = validator(user_id.clone()).await {
        warn!(
            "WebSocket connection rejected by validator with status: {}",
            status_code
        );
        return status_code.into_response();
    }

    let failed_user = user_id.clone();
    ws.on_failed_upgrade(move |e| {
        warn!(user_id = %failed_user, "WebSocket handshake failed: {}", e);
    })
    .on_upgrade(move |socket| async move {
        hub.handle_socket(socket, user_id).await;
    })
}
