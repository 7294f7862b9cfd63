// social-realtime/src/ws/liveness.rs

//! Read-for-liveness: the only reason the server reads from a notification
//! socket is to notice when the peer goes away.

use crate::ws::types::DisconnectReason;
use axum::extract::ws::Message;
use futures_util::stream::{Stream, StreamExt};
use std::future::Future;
use tracing::trace;

/// Suspends until the peer closes, the stream ends, or a read fails.
///
/// Data frames are passed to `on_frame` as they arrive; liveness does not
/// depend on what the callback does with them. Ping and pong frames are
/// answered by the transport and skipped here.
pub async fn watch<St, F, Fut>(mut stream: St, mut on_frame: F) -> DisconnectReason
where
    St: Stream<Item = Result<Message, axum::Error>> + Unpin,
    F: FnMut(Message) -> Fut,
    Fut: Future<Output = ()>,
{
    while let Some(next) = stream.next().await {
        match next {
            Ok(Message::Close(_)) => return DisconnectReason::CloseFrame,
            Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => trace!("Control frame from client"),
            Ok(message) => on_frame(message).await,
            Err(e) => return DisconnectReason::Error(e),
        }
    }
    DisconnectReason::EndOfStream
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn test_close_frame_ends_watch() {
        let frames = stream::iter(vec![
            Ok(Message::Text("ignored".into())),
            Ok(Message::Close(None)),
            Ok(Message::Text("never read".into())),
        ]);
        let counter = AtomicUsize::new(0);
        let seen = &counter;

        let reason = watch(frames, move |_| async move {
            seen.fetch_add(1, Ordering::SeqCst);
        })
        .await;

        assert!(matches!(reason, DisconnectReason::CloseFrame));
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_end_of_stream_ends_watch() {
        let frames = stream::iter(Vec::<Result<Message, axum::Error>>::new());
        let reason = watch(frames, |_| async {}).await;
        assert!(matches!(reason, DisconnectReason::EndOfStream));
    }

    #[tokio::test]
    async fn test_read_error_ends_watch() {
        let err = axum::Error::new(std::io::Error::new(
            std::io::ErrorKind::ConnectionReset,
            "reset",
        ));
        let frames = stream::iter(vec![Ok(Message::Ping("p".into())), Err(err)]);
        let reason = watch(frames, |_| async {}).await;
        assert!(matches!(reason, DisconnectReason::Error(_)));
    }
}
