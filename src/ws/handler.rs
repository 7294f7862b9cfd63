// social-realtime/src/ws/handler.rs

//! Defines the `InboundHandler` trait, the seam for anything that wants to react
//! to connection events or to frames sent by the client.
//!
//! The notification channel is push-only, so the default implementation
//! ignores inbound content entirely. Liveness detection lives in
//! [`crate::ws::liveness`] and does not depend on what a handler does here.

use crate::ws::types::{Connection, ConnectionId, DisconnectReason, UserId};
use async_trait::async_trait;
use axum::extract::ws::Message;

/// A context object passed to handler methods.
#[derive(Debug, Clone)]
pub struct ConnectionContext {
    /// The unique ID of the connection.
    pub conn_id: ConnectionId,
    /// The user the connection is registered under.
    pub user_id: UserId,
    /// A handle for writing back to this client.
    pub connection: Connection,
}

#[async_trait]
pub trait InboundHandler: Send + Sync + 'static {
    /// Called once the connection has been registered.
    async fn on_connect(&self, _context: &ConnectionContext) {
        // Default is a no-op
    }

    /// Called for every data frame the client sends. Control frames are
    /// handled by the transport and never reach this method.
    async fn on_frame(&self, _message: Message, _context: &ConnectionContext) {
        // Default is a no-op
    }

    /// Called after the liveness watch ends, before the entry is removed.
    async fn on_disconnect(&self, _reason: &DisconnectReason, _context: &ConnectionContext) {
        // Default is a no-op
    }
}

/// The handler used by the notification service: inbound frames are discarded.
#[derive(Debug, Default, Clone, Copy)]
pub struct PushOnly;

#[async_trait]
impl InboundHandler for PushOnly {}
