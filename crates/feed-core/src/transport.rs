//! The seam between the pipeline and whatever talks to relays.
//!
//! A transport accepts one filter and hands back a single merged channel of
//! raw events from every relay it reads from, plus a cancellation token that
//! tears the subscription down. Duplicates across relays are expected on
//! this channel; [`crate::stream::SubscriptionStream`] removes them.

use async_trait::async_trait;
use nostr_sdk::{Event, Filter};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::error::TransportError;

/// An event as delivered by one relay.
#[derive(Debug, Clone)]
pub struct RelayEvent {
    pub relay_url: String,
    pub event: Event,
}

/// Raw merged multi-relay event channel for one subscription.
pub struct RelayStream {
    receiver: mpsc::Receiver<RelayEvent>,
    cancel: CancellationToken,
}

impl RelayStream {
    pub fn new(receiver: mpsc::Receiver<RelayEvent>, cancel: CancellationToken) -> Self {
        Self { receiver, cancel }
    }

    /// Create a connected sender/stream pair sharing a fresh token.
    pub fn channel(capacity: usize) -> (mpsc::Sender<RelayEvent>, Self) {
        let (tx, rx) = mpsc::channel(capacity);
        (tx, Self::new(rx, CancellationToken::new()))
    }

    /// Token that cancels the subscription feeding this stream.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Wait for the next raw event.
    ///
    /// Returns `None` once every sender is gone or the subscription has been
    /// cancelled.
    pub async fn recv(&mut self) -> Option<RelayEvent> {
        if self.cancel.is_cancelled() {
            return None;
        }
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => None,
            item = self.receiver.recv() => item,
        }
    }
}

/// Something that can open a subscription for a filter.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn subscribe(&self, filter: Filter) -> Result<RelayStream, TransportError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use nostr_sdk::{EventBuilder, Keys};

    fn relay_event(relay: &str) -> RelayEvent {
        let event = EventBuilder::text_note("hello")
            .sign_with_keys(&Keys::generate())
            .unwrap();
        RelayEvent {
            relay_url: relay.to_string(),
            event,
        }
    }

    #[tokio::test]
    async fn recv_ends_when_senders_drop() {
        let (tx, mut stream) = RelayStream::channel(4);
        tx.send(relay_event("wss://a")).await.unwrap();
        drop(tx);

        assert!(stream.recv().await.is_some());
        assert!(stream.recv().await.is_none());
    }

    #[tokio::test]
    async fn recv_ends_on_cancel() {
        let (tx, mut stream) = RelayStream::channel(4);
        tx.send(relay_event("wss://a")).await.unwrap();
        stream.cancel_token().cancel();

        assert!(stream.recv().await.is_none());
        drop(tx);
    }
}
