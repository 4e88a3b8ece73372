//! In-process transport between the content script and the background.
//!
//! Requests travel over a bounded `mpsc` queue, each with its own `oneshot`
//! reply slot. The background answers requests one at a time, in arrival
//! order.

use std::sync::Arc;

use closet_core::{Messenger, MessagingError, Request, Response};
use tokio::sync::{mpsc, oneshot};

use crate::router::Background;
use crate::storage::Storage;

/// A request plus the slot its reply goes into.
pub struct Envelope {
    pub request: Request,
    pub reply: oneshot::Sender<Response>,
}

/// Page-side handle onto the background queue.
#[derive(Clone)]
pub struct ChannelMessenger {
    tx: mpsc::Sender<Envelope>,
}

/// Creates a connected messenger and the receiving end for [`serve`].
#[must_use]
pub fn channel(capacity: usize) -> (ChannelMessenger, mpsc::Receiver<Envelope>) {
    let (tx, rx) = mpsc::channel(capacity);
    (ChannelMessenger { tx }, rx)
}

impl Messenger for ChannelMessenger {
    async fn send(&self, request: Request) -> Result<Response, MessagingError> {
        let action = request.action();
        let (reply, response) = oneshot::channel();
        self.tx
            .send(Envelope { request, reply })
            .await
            .map_err(|_| MessagingError::Disconnected)?;
        response.await.map_err(|_| MessagingError::NoReply { action })
    }
}

/// Answers queued requests until every [`ChannelMessenger`] is dropped.
pub async fn serve<S: Storage>(
    background: Arc<Background<S>>,
    mut requests: mpsc::Receiver<Envelope>,
) {
    while let Some(Envelope { request, reply }) = requests.recv().await {
        let action = request.action();
        tracing::debug!(action, "handling request");
        let response = background.handle(request).await;
        if reply.send(response).is_err() {
            tracing::debug!(action, "requester went away before the reply");
        }
    }
    tracing::debug!("message channel closed");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::LocalStore;

    #[tokio::test]
    async fn requests_round_trip_through_the_background() {
        let background = Arc::new(Background::new(Arc::new(LocalStore::in_memory()), None));
        let (messenger, requests) = channel(8);
        let server = tokio::spawn(serve(background, requests));

        let response = messenger.send(Request::GetProducts).await.unwrap();
        assert!(response.success);
        assert_eq!(response.products, Some(Vec::new()));

        drop(messenger);
        server.await.unwrap();
    }

    #[tokio::test]
    async fn closed_queue_is_disconnected() {
        let (messenger, requests) = channel(1);
        drop(requests);

        let err = messenger.send(Request::GetUser).await.unwrap_err();
        assert!(matches!(err, MessagingError::Disconnected));
    }

    #[tokio::test]
    async fn dropped_reply_is_reported_with_action() {
        let (messenger, mut requests) = channel(1);
        tokio::spawn(async move {
            if let Some(envelope) = requests.recv().await {
                drop(envelope.reply);
            }
        });

        let err = messenger.send(Request::ClearAll).await.unwrap_err();
        assert!(matches!(err, MessagingError::NoReply { action: "clearAll" }));
    }
}
