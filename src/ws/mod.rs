//! WebSocket delivery: the connection registry, the notification hub, and the
//! upgrade endpoint that feeds it.

pub mod handler;
pub mod liveness;
pub mod registry;
pub mod service;
pub mod types;
pub mod upgrade;
