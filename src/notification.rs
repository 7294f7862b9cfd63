//! Notification records and the producer that pushes them live and persists
//! them.

use crate::error::StoreError;
use crate::store::NotificationStore;
use crate::ws::service::{Delivery, NotificationHub};
use crate::ws::types::UserId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, error, instrument};
use uuid::Uuid;

pub type NotificationId = Uuid;

/// The event a notification describes. Serialized as its bare tag.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum NotificationKind {
    Like,
    Comment,
    Follow,
    Other(String),
}

impl NotificationKind {
    pub fn as_str(&self) -> &str {
        match self {
            NotificationKind::Like => "like",
            NotificationKind::Comment => "comment",
            NotificationKind::Follow => "follow",
            NotificationKind::Other(tag) => tag,
        }
    }
}

impl From<String> for NotificationKind {
    fn from(tag: String) -> Self {
        match tag.as_str() {
            "like" => NotificationKind::Like,
            "comment" => NotificationKind::Comment,
            "follow" => NotificationKind::Follow,
            _ => NotificationKind::Other(tag),
        }
    }
}

impl From<NotificationKind> for String {
    fn from(kind: NotificationKind) -> Self {
        kind.as_str().to_owned()
    }
}

impl fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A durable notification record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: NotificationId,
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    pub from: UserId,
    pub to: UserId,
    pub message: String,
    pub read: bool,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub related_post_id: Option<String>,
}

/// What a producer supplies; id, read flag and timestamp are assigned on creation.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewNotification {
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    pub from: UserId,
    pub to: UserId,
    pub message: String,
    #[serde(default)]
    pub related_post_id: Option<String>,
}

impl NewNotification {
    pub fn like(from: UserId, to: UserId, post_id: impl Into<String>) -> Self {
        Self {
            kind: NotificationKind::Like,
            from,
            to,
            message: "Le dio like a tu post".to_owned(),
            related_post_id: Some(post_id.into()),
        }
    }

    pub fn comment(from: UserId, to: UserId, post_id: impl Into<String>) -> Self {
        Self {
            kind: NotificationKind::Comment,
            from,
            to,
            message: "Comentó tu post".to_owned(),
            related_post_id: Some(post_id.into()),
        }
    }

    pub fn follow(from: UserId, to: UserId) -> Self {
        Self {
            kind: NotificationKind::Follow,
            from,
            to,
            message: "Empezó a seguirte".to_owned(),
            related_post_id: None,
        }
    }

    fn into_record(self) -> Notification {
        Notification {
            id: NotificationId::new_v4(),
            kind: self.kind,
            from: self.from,
            to: self.to,
            message: self.message,
            read: false,
            created_at: Utc::now(),
            related_post_id: self.related_post_id,
        }
    }
}

/// Shape of the live payload pushed to the recipient.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PushFormat {
    /// The human-readable message, verbatim.
    #[default]
    Message,
    /// A small JSON object: `{"type": ..., "postId": ...}`.
    Event,
}

impl FromStr for PushFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "message" | "text" => Ok(PushFormat::Message),
            "event" | "json" => Ok(PushFormat::Event),
            other => Err(other.to_owned()),
        }
    }
}

impl PushFormat {
    pub fn payload(&self, notification: &Notification) -> String {
        match self {
            PushFormat::Message => notification.message.clone(),
            PushFormat::Event => serde_json::json!({
                "type": notification.kind,
                "postId": notification.related_post_id,
            })
            .to_string(),
        }
    }
}

/// Pushes a notification to its recipient, if connected, then persists it.
///
/// Persisting never depends on the push: an offline recipient or a failed
/// write still produces a stored record.
#[derive(Clone)]
pub struct Notifier {
    hub: NotificationHub,
    store: Arc<dyn NotificationStore>,
    format: PushFormat,
}

impl Notifier {
    pub fn new(hub: NotificationHub, store: Arc<dyn NotificationStore>, format: PushFormat) -> Self {
        Self { hub, store, format }
    }

    pub fn format(&self) -> PushFormat {
        self.format
    }

    #[instrument(skip_all, fields(kind = %new.kind, from = %new.from, to = %new.to))]
    pub async fn notify(&self, new: NewNotification) -> Result<Notification, StoreError> {
        let notification = new.into_record();

        if notification.from != notification.to {
            let delivery = self
                .hub
                .send(&notification.to, &self.format.payload(&notification))
                .await;
            debug!(?delivery, "Live push attempted");
        } else {
            debug!("Sender and recipient are the same user, skipping live push");
        }

        match self.store.insert(notification.clone()).await {
            Ok(()) => {
                debug!(id = %notification.id, "Notification stored");
                Ok(notification)
            }
            Err(e) => {
                error!("Failed to store notification: {}", e);
                Err(e)
            }
        }
    }

    /// Pushes `payload` to every connected user without persisting anything.
    pub async fn announce(&self, payload: &str) -> usize {
        self.hub.broadcast(payload).await
    }

    /// Live push only, for callers that persist on their own.
    pub async fn push(&self, to: &UserId, payload: &str) -> Delivery {
        self.hub.send(to, payload).await
    }
}

impl fmt::Debug for Notifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Notifier")
            .field("hub", &self.hub)
            .field("format", &self.format)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryNotificationStore;
    use crate::ws::registry::ConnectionRegistry;
    use crate::ws::types::channel_connection;
    use axum::extract::ws::Message;
    use futures::StreamExt;

    fn notifier(format: PushFormat) -> (Notifier, Arc<InMemoryNotificationStore>) {
        let hub = NotificationHub::new(Arc::new(ConnectionRegistry::new()));
        let store = Arc::new(InMemoryNotificationStore::new());
        (Notifier::new(hub, store.clone(), format), store)
    }

    #[tokio::test]
    async fn test_like_is_pushed_and_stored() {
        let (notifier, store) = notifier(PushFormat::Message);
        let (conn, mut rx) = channel_connection();
        notifier.hub.registry().register(UserId::from("A"), conn);

        let stored = notifier
            .notify(NewNotification::like(UserId::from("B"), UserId::from("A"), "post-1"))
            .await
            .unwrap();

        match rx.next().await {
            Some(Message::Text(t)) => assert_eq!(t.as_str(), "Le dio like a tu post"),
            other => panic!("unexpected frame: {:?}", other),
        }

        let records = store.list_for(&UserId::from("A")).await.unwrap();
        assert_eq!(records, vec![stored.clone()]);
        assert_eq!(stored.kind, NotificationKind::Like);
        assert_eq!(stored.from, UserId::from("B"));
        assert!(!stored.read);
    }

    #[tokio::test]
    async fn test_offline_recipient_still_gets_record() {
        let (notifier, store) = notifier(PushFormat::Message);

        notifier
            .notify(NewNotification::like(UserId::from("B"), UserId::from("A"), "post-1"))
            .await
            .unwrap();

        let records = store.list_for(&UserId::from("A")).await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].message, "Le dio like a tu post");
        assert!(!records[0].read);
    }

    #[tokio::test]
    async fn test_self_notification_is_stored_not_pushed() {
        let (notifier, store) = notifier(PushFormat::Message);
        let (conn, mut rx) = channel_connection();
        notifier.hub.registry().register(UserId::from("A"), conn);

        notifier
            .notify(NewNotification::comment(UserId::from("A"), UserId::from("A"), "post-1"))
            .await
            .unwrap();
        notifier.push(&UserId::from("A"), "marker").await;

        match rx.next().await {
            Some(Message::Text(t)) => assert_eq!(t.as_str(), "marker"),
            other => panic!("unexpected frame: {:?}", other),
        }
        assert_eq!(store.list_for(&UserId::from("A")).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_event_format_pushes_json() {
        let (notifier, _store) = notifier(PushFormat::Event);
        let (conn, mut rx) = channel_connection();
        notifier.hub.registry().register(UserId::from("A"), conn);

        notifier
            .notify(NewNotification::like(UserId::from("B"), UserId::from("A"), "post-9"))
            .await
            .unwrap();

        let Some(Message::Text(t)) = rx.next().await else {
            panic!("expected a text frame");
        };
        let value: serde_json::Value = serde_json::from_str(t.as_str()).unwrap();
        assert_eq!(value, serde_json::json!({ "type": "like", "postId": "post-9" }));
    }

    #[test]
    fn test_kind_serializes_as_tag() {
        let record = NewNotification::follow(UserId::from("B"), UserId::from("A")).into_record();
        let value = serde_json::to_value(&record).unwrap();

        assert_eq!(value["type"], "follow");
        assert_eq!(value["read"], false);
        assert!(value.get("relatedPostId").is_none());
        assert!(value.get("createdAt").is_some());

        let custom: NotificationKind = serde_json::from_str("\"mention\"").unwrap();
        assert_eq!(custom, NotificationKind::Other("mention".to_owned()));
    }

    #[test]
    fn test_push_format_parsing() {
        assert_eq!("event".parse::<PushFormat>(), Ok(PushFormat::Event));
        assert_eq!(" Message ".parse::<PushFormat>(), Ok(PushFormat::Message));
        assert!("xml".parse::<PushFormat>().is_err());
    }
}
