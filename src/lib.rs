//! # Social Realtime
//!
//! Real-time notification fan-out for the social backend. Likes, comments and
//! follows are pushed to connected users over WebSockets while the same event
//! is persisted as a notification record.
//!
//! ## Core Features
//!
//! - **`ConnectionRegistry`**: one live connection per user id, explicitly owned.
//! - **`NotificationHub`**: best-effort targeted delivery and broadcast, plus the
//!   register → watch → deregister lifecycle of every socket.
//! - **`Notifier`**: the producer boundary. Push if connected, persist always.
//! - **Credential binding (Optional)**: a `WsAuth` extractor that ties the
//!   upgrade path to a validated token.
//!
//! ---

// The `ws` module contains all WebSocket-related logic.
pub mod ws;

pub mod config;
pub mod error;
pub mod notification;
pub mod routes;
pub mod store;
pub mod telemetry;

// It will only be part of the crate if the "auth" feature is enabled.
#[cfg(feature = "auth")]
pub mod auth;

/// Public prelude for convenience.
///
/// `use social_realtime::prelude::*;`
pub mod prelude {
    pub use crate::ws::{
        handler::{ConnectionContext, InboundHandler, PushOnly},
        registry::ConnectionRegistry,
        service::{Delivery, NotificationHub},
        types::{Connection, UserId},
        upgrade::upgrade_handler,
    };

    pub use crate::notification::{NewNotification, Notification, NotificationKind, Notifier, PushFormat};
    pub use crate::store::{InMemoryNotificationStore, NotificationStore};

    // Re-export the WsAuth extractor if the feature is enabled.
    #[cfg(feature = "auth")]
    pub use crate::auth::WsAuth;
}
