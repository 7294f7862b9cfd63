//! Persistence boundary for notification records.

use crate::error::StoreError;
use crate::notification::{Notification, NotificationId};
use crate::ws::types::UserId;
use async_trait::async_trait;
use dashmap::DashMap;
use std::fmt;

/// Durable storage for notification records.
///
/// Implementations must scope `mark_read` and `delete` to the recipient: a
/// record addressed to someone else is reported as not found.
#[async_trait]
pub trait NotificationStore: Send + Sync + 'static {
    async fn insert(&self, notification: Notification) -> Result<(), StoreError>;

    /// All records addressed to `user_id`, newest first.
    async fn list_for(&self, user_id: &UserId) -> Result<Vec<Notification>, StoreError>;

    /// Flips the record to read. Returns `false` if no such record exists for `user_id`.
    async fn mark_read(&self, user_id: &UserId, id: NotificationId) -> Result<bool, StoreError>;

    /// Returns `false` if no such record exists for `user_id`.
    async fn delete(&self, user_id: &UserId, id: NotificationId) -> Result<bool, StoreError>;
}

/// Process-local store, keyed by record id.
#[derive(Default)]
pub struct InMemoryNotificationStore {
    records: DashMap<NotificationId, Notification>,
}

impl InMemoryNotificationStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[async_trait]
impl NotificationStore for InMemoryNotificationStore {
    async fn insert(&self, notification: Notification) -> Result<(), StoreError> {
        self.records.insert(notification.id, notification);
        Ok(())
    }

    async fn list_for(&self, user_id: &UserId) -> Result<Vec<Notification>, StoreError> {
        let mut records: Vec<Notification> = self
            .records
            .iter()
            .filter(|entry| &entry.value().to == user_id)
            .map(|entry| entry.value().clone())
            .collect();
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(records)
    }

    async fn mark_read(&self, user_id: &UserId, id: NotificationId) -> Result<bool, StoreError> {
        match self.records.get_mut(&id) {
            Some(mut entry) if &entry.to == user_id => {
                entry.read = true;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn delete(&self, user_id: &UserId, id: NotificationId) -> Result<bool, StoreError> {
        Ok(self
            .records
            .remove_if(&id, |_, record| &record.to == user_id)
            .is_some())
    }
}

impl fmt::Debug for InMemoryNotificationStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InMemoryNotificationStore")
            .field("records_count", &self.records.len())
            .finish()
    }
}
