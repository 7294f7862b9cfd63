//! Optional credential binding for the upgrade path.
//!
//! By default a socket is registered under whatever user id appears in the
//! request path. With this module, the state validates a bearer token (from the
//! `Authorization` header or a `token` query parameter) and the upgrade is only
//! accepted when the token's user matches the path.
//!
//! ## Example
//!
//! ```rust,no_run
//! # use async_trait::async_trait;
//! # use axum::{Router, extract::FromRef, routing::get};
//! # use std::sync::Arc;
//! # use social_realtime::prelude::*;
//! # use social_realtime::auth::{TokenValidator, authenticated_upgrade_handler};
//! #[derive(Clone)]
//! struct ServerState {
//!     hub: NotificationHub,
//! }
//!
//! impl FromRef<ServerState> for NotificationHub {
//!     fn from_ref(state: &ServerState) -> Self {
//!         state.hub.clone()
//!     }
//! }
//!
//! #[async_trait]
//! impl TokenValidator for ServerState {
//!     type Error = std::io::Error;
//!
//!     async fn validate_token(&self, token: &str) -> Result<UserId, Self::Error> {
//!         // Decode a JWT, query a session table, ...
//! #       Ok(UserId::from(token))
//!     }
//! }
//!
//! let state = ServerState { hub: NotificationHub::new(Arc::new(ConnectionRegistry::new())) };
//! let app: Router = Router::new()
//!     .route("/ws/{user_id}", get(authenticated_upgrade_handler::<PushOnly>))
//!     .with_state(state);
//! ```

use crate::ws::handler::InboundHandler;
use crate::ws::service::NotificationHub;
use crate::ws::types::UserId;
use crate::ws::upgrade::upgrade_with;
use async_trait::async_trait;
use axum::{
    extract::{FromRequestParts, Path, Query, State, ws::WebSocketUpgrade},
    http::{HeaderMap, StatusCode, request::Parts},
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use tracing::warn;

/// Implemented by the router state to turn a token into the user it belongs to.
#[async_trait]
pub trait TokenValidator {
    /// The error type returned on validation failure.
    type Error: std::error::Error + Send + Sync + 'static;

    async fn validate_token(&self, token: &str) -> Result<UserId, Self::Error>;
}

/// The authenticated caller. Rejects with `401 Unauthorized` when no valid
/// token is present.
#[derive(Debug, Clone)]
pub struct WsAuth(pub UserId);

/// The query parameter struct used internally for token extraction.
#[derive(Deserialize)]
struct WebSocketAuthQuery {
    token: String,
}

impl<S> FromRequestParts<S> for WsAuth
where
    S: TokenValidator + Send + Sync + 'static,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let token = match get_token_from_headers(&parts.headers) {
            Some(t) => Some(t),
            None => match Query::<WebSocketAuthQuery>::from_request_parts(parts, state).await {
                Ok(Query(q)) => Some(q.token),
                Err(_) => None,
            },
        };

        let Some(token) = token else {
            return Err(StatusCode::UNAUTHORIZED.into_response());
        };

        match state.validate_token(&token).await {
            Ok(user_id) => Ok(WsAuth(user_id)),
            Err(e) => {
                warn!("WebSocket token rejected: {}", e);
                Err(StatusCode::UNAUTHORIZED.into_response())
            }
        }
    }
}

/// Accepts the upgrade only when the caller is the user named in the path.
pub fn bind_identity(caller: &UserId, requested: &UserId) -> Result<(), StatusCode> {
    if caller == requested {
        Ok(())
    } else {
        Err(StatusCode::FORBIDDEN)
    }
}

/// Like [`upgrade_handler`](crate::ws::upgrade::upgrade_handler), but requires a
/// valid token whose user matches the path.
pub async fn authenticated_upgrade_handler<H: InboundHandler>(
    ws: WebSocketUpgrade,
    State(hub): State<NotificationHub<H>>,
    Path(user_id): Path<String>,
    WsAuth(caller): WsAuth,
) -> Response {
    upgrade_with(ws, hub, UserId::from(user_id), move |requested| async move {
        bind_identity(&caller, &requested)
    })
    .await
}

/// A private helper function to extract a bearer token from the Authorization header.
fn get_token_from_headers(headers: &HeaderMap) -> Option<String> {
    headers
        .get("Authorization")
        .and_then(|header| header.to_str().ok())
        .and_then(|header_val| {
            header_val
                .strip_prefix("Bearer ")
                .map(|token| token.to_owned())
        })
}
