// social-realtime/src/ws/registry.rs

//! The connection registry: which users are reachable in real time, and through
//! which connection.

use crate::ws::types::{Connection, ConnectionId, UserId};
use dashmap::DashMap;
use std::fmt;
use tracing::{debug, warn};

/// Maps each user id to the single connection currently registered for it.
///
/// Every operation is one atomic map operation. Handles are cloned out of the
/// map before any I/O happens, so no map guard is ever held across an `.await`.
#[derive(Default)]
pub struct ConnectionRegistry {
    connections: DashMap<UserId, Connection>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces the entry for `user_id`.
    ///
    /// A displaced connection is closed on a spawned task once the swap has
    /// completed, so a stalled peer never holds up its replacement. Closing
    /// errors are logged and otherwise ignored.
    pub fn register(&self, user_id: UserId, connection: Connection) {
        let new_id = connection.id();
        let displaced = self.connections.insert(user_id.clone(), connection);

        let Some(old) = displaced else {
            return;
        };
        if old.id() == new_id {
            return;
        }
        debug!(%user_id, old_conn = %old.id(), new_conn = %new_id, "Replacing existing connection");

        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                runtime.spawn(async move {
                    if let Err(e) = old.close().await {
                        warn!(%user_id, conn_id = %old.id(), "Failed to close displaced connection: {}", e);
                    }
                });
            }
            Err(_) => warn!(%user_id, conn_id = %old.id(), "No runtime to close displaced connection"),
        }
    }

    /// Removes the entry for `user_id`, if any.
    pub fn deregister(&self, user_id: &UserId) {
        self.connections.remove(user_id);
    }

    /// Removes the entry for `user_id` only if it is still `conn_id`.
    ///
    /// Returns `true` if an entry was removed. A connection that has already
    /// been replaced leaves its successor untouched.
    pub fn deregister_connection(&self, user_id: &UserId, conn_id: ConnectionId) -> bool {
        self.connections
            .remove_if(user_id, |_, current| current.id() == conn_id)
            .is_some()
    }

    /// Returns the connection currently registered for `user_id`.
    pub fn lookup(&self, user_id: &UserId) -> Option<Connection> {
        self.connections
            .get(user_id)
            .map(|entry| entry.value().clone())
    }

    pub fn contains(&self, user_id: &UserId) -> bool {
        self.connections.contains_key(user_id)
    }

    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }

    /// A point-in-time copy of every registered entry.
    pub fn snapshot(&self) -> Vec<(UserId, Connection)> {
        self.connections
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect()
    }
}

impl fmt::Debug for ConnectionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionRegistry")
            .field("connections_count", &self.connections.len())
            .finish()
    }
}
