// social-realtime/src/ws/service.rs

//! The primary `NotificationHub`: live delivery to registered users and the
//! lifecycle of every accepted connection.

use crate::ws::{
    handler::{ConnectionContext, InboundHandler, PushOnly},
    liveness,
    registry::ConnectionRegistry,
    types::{Connection, DisconnectReason, UserId},
};
use axum::extract::ws::{Message, WebSocket};
use futures_util::{
    Sink,
    future::join_all,
    stream::{Stream, StreamExt},
};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Outcome of a single live delivery attempt.
///
/// Purely informational: delivery is best-effort and never an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// The payload was written to the user's connection.
    Delivered,
    /// The user has no registered connection. Nothing was written.
    Offline,
    /// The write failed. The failure has been logged.
    Failed,
}

/// Pushes payloads to connected users and owns the per-connection lifecycle.
///
/// The hub is constructed once at startup around an explicitly owned
/// [`ConnectionRegistry`] and shared with every handler that needs it.
#[derive(Debug)]
pub struct NotificationHub<H: InboundHandler = PushOnly> {
    registry: Arc<ConnectionRegistry>,
    handler: Arc<H>,
}

impl<H: InboundHandler> Clone for NotificationHub<H> {
    fn clone(&self) -> Self {
        Self {
            registry: Arc::clone(&self.registry),
            handler: Arc::clone(&self.handler),
        }
    }
}

impl NotificationHub<PushOnly> {
    /// Creates a push-only hub over `registry`.
    pub fn new(registry: Arc<ConnectionRegistry>) -> Self {
        Self::with_handler(registry, PushOnly)
    }
}

impl<H: InboundHandler> NotificationHub<H> {
    /// Creates a hub that forwards lifecycle events and inbound frames to `handler`.
    pub fn with_handler(registry: Arc<ConnectionRegistry>, handler: H) -> Self {
        Self {
            registry,
            handler: Arc::new(handler),
        }
    }

    pub fn registry(&self) -> &Arc<ConnectionRegistry> {
        &self.registry
    }

    /// Writes `payload` as one text frame to `user_id`'s connection, if any.
    ///
    /// The connection handle is copied out of the registry before writing, so
    /// the registry is never locked during I/O. Failures are logged and
    /// swallowed; a missing connection is a silent no-op.
    #[instrument(skip(self, payload), fields(user_id = %user_id))]
    pub async fn send(&self, user_id: &UserId, payload: &str) -> Delivery {
        let Some(connection) = self.registry.lookup(user_id) else {
            debug!("User is not connected, skipping live delivery");
            return Delivery::Offline;
        };

        match connection.send_text(payload).await {
            Ok(()) => {
                debug!(conn_id = %connection.id(), "Delivered message");
                Delivery::Delivered
            }
            Err(e) => {
                warn!(
                    conn_id = %connection.id(),
                    "Failed to send message, client likely disconnected: {}",
                    e
                );
                Delivery::Failed
            }
        }
    }

    /// Writes `payload` to every registered connection.
    ///
    /// Each write is independent and best-effort. Returns how many succeeded.
    #[instrument(skip_all)]
    pub async fn broadcast(&self, payload: &str) -> usize {
        let targets = self.registry.snapshot();
        if targets.is_empty() {
            return 0;
        }

        debug!(count = targets.len(), "Broadcasting message to clients");
        let results = join_all(targets.iter().map(|(user_id, connection)| async move {
            match connection.send_text(payload).await {
                Ok(()) => true,
                Err(e) => {
                    warn!(%user_id, conn_id = %connection.id(), "Failed to send broadcast message: {}", e);
                    false
                }
            }
        }))
        .await;

        results.into_iter().filter(|delivered| *delivered).count()
    }

    /// Entry point for an upgraded socket. Returns when the peer is gone.
    pub async fn handle_socket(&self, socket: WebSocket, user_id: UserId) {
        let (sink, stream) = socket.split();
        self.run_connection(user_id, sink, stream).await;
    }

    /// Registers the connection, watches it for liveness, and tears it down.
    ///
    /// Teardown (deregistration, then closing the transport) runs exactly once,
    /// including when a handler panics while the connection is open.
    #[instrument(skip_all, fields(user_id = %user_id, conn_id))]
    pub async fn run_connection<Si, St>(&self, user_id: UserId, sink: Si, stream: St) -> DisconnectReason
    where
        Si: Sink<Message, Error = axum::Error> + Send + 'static,
        St: Stream<Item = Result<Message, axum::Error>> + Send + Unpin,
    {
        let connection = Connection::new(sink);
        tracing::Span::current().record("conn_id", &tracing::field::display(connection.id()));

        let guard = RegistrationGuard::new(Arc::clone(&self.registry), user_id.clone(), connection.clone());
        self.registry.register(user_id.clone(), connection.clone());

        let context = ConnectionContext {
            conn_id: connection.id(),
            user_id,
            connection,
        };

        info!("Client connected.");
        self.handler.on_connect(&context).await;

        let handler = &*self.handler;
        let ctx = &context;
        let reason = liveness::watch(stream, move |message| handler.on_frame(message, ctx)).await;

        info!(%reason, "Client disconnected. Cleaning up...");
        self.handler.on_disconnect(&reason, &context).await;
        guard.release().await;

        reason
    }
}

/// Scoped registration of one connection.
///
/// `release` is the normal exit path. If the guard is dropped without being
/// released (a panic or a cancelled task), `Drop` deregisters synchronously
/// and closes the transport on a spawned task.
struct RegistrationGuard {
    registry: Arc<ConnectionRegistry>,
    user_id: UserId,
    connection: Connection,
    armed: bool,
}

impl RegistrationGuard {
    fn new(registry: Arc<ConnectionRegistry>, user_id: UserId, connection: Connection) -> Self {
        Self {
            registry,
            user_id,
            connection,
            armed: true,
        }
    }

    async fn release(mut self) {
        self.armed = false;
        self.registry
            .deregister_connection(&self.user_id, self.connection.id());
        if let Err(e) = self.connection.close().await {
            debug!("Connection already closed: {}", e);
        }
    }
}

impl Drop for RegistrationGuard {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }

        warn!(user_id = %self.user_id, conn_id = %self.connection.id(), "Connection task ended abnormally");
        self.registry
            .deregister_connection(&self.user_id, self.connection.id());

        if let Ok(runtime) = tokio::runtime::Handle::try_current() {
            let connection = self.connection.clone();
            runtime.spawn(async move {
                let _ = connection.close().await;
            });
        }
    }
}
