// social-realtime/src/ws/types.rs

//! Core types shared by the registry, the delivery path and the lifecycle manager.

use axum::extract::ws::{Message, Utf8Bytes};
use futures_util::{Sink, SinkExt};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::pin::Pin;
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

/// A unique identifier for a single WebSocket connection.
pub type ConnectionId = Uuid;

/// The string key a connection is registered under.
///
/// In practice this is the hex form of a 24-character document id, but the
/// registry treats it as an arbitrary opaque string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for UserId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for UserId {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

/// The type-erased writing half of a connection.
///
/// Erasing the concrete sink lets the registry hold axum `WebSocket` halves in
/// production and in-memory channels in tests.
pub type BoxedSink = Pin<Box<dyn Sink<Message, Error = axum::Error> + Send>>;

/// A type alias for the connection's writing half, protected by a Mutex so that
/// writes from concurrent tasks are serialized in arrival order.
pub type WsSink = Arc<Mutex<BoxedSink>>;

/// A cheap, cloneable handle to a live connection.
///
/// Cloning shares the underlying sink; it never opens a second transport.
#[derive(Clone)]
pub struct Connection {
    id: ConnectionId,
    sink: WsSink,
}

impl Connection {
    /// Wraps any message sink as a new connection with a fresh id.
    pub fn new<S>(sink: S) -> Self
    where
        S: Sink<Message, Error = axum::Error> + Send + 'static,
    {
        let sink: BoxedSink = Box::pin(sink);
        Self {
            id: ConnectionId::new_v4(),
            sink: Arc::new(Mutex::new(sink)),
        }
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// Writes a single frame. The sink lock is held only for this one write.
    pub async fn send(&self, message: Message) -> Result<(), axum::Error> {
        self.sink.lock().await.send(message).await
    }

    /// Writes `text` as one text frame.
    pub async fn send_text(&self, text: &str) -> Result<(), axum::Error> {
        self.send(Message::Text(Utf8Bytes::from(text))).await
    }

    /// Flushes and closes the writing half.
    pub async fn close(&self) -> Result<(), axum::Error> {
        self.sink.lock().await.close().await
    }
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("id", &self.id)
            .finish()
    }
}

/// Why a connection's liveness watch ended.
#[derive(Debug)]
pub enum DisconnectReason {
    /// The peer sent a close frame.
    CloseFrame,
    /// The stream ended without a close frame.
    EndOfStream,
    /// Reading from the transport failed.
    Error(axum::Error),
}

impl fmt::Display for DisconnectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DisconnectReason::CloseFrame => f.write_str("peer sent close frame"),
            DisconnectReason::EndOfStream => f.write_str("stream ended"),
            DisconnectReason::Error(e) => write!(f, "read error: {}", e),
        }
    }
}

/// In-memory connections for tests: the receiver observes every frame written
/// to the connection and yields `None` once the connection is closed.
#[cfg(test)]
pub(crate) fn channel_connection() -> (Connection, futures::channel::mpsc::UnboundedReceiver<Message>) {
    let (tx, rx) = futures::channel::mpsc::unbounded();
    (Connection::new(tx.sink_map_err(axum::Error::new)), rx)
}
