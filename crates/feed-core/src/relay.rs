//! Relay pool transport backed by nostr-sdk.

use async_trait::async_trait;
use nostr_sdk::{Client, Filter, Keys, RelayPoolNotification, SubscriptionId};
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::TransportError;
use crate::transport::{RelayEvent, RelayStream, Transport};

/// Merge channel capacity. Relay workers block on a full channel rather
/// than drop events.
const MERGE_CAPACITY: usize = 1024;

/// A nostr-sdk client connected to a fixed set of read relays.
#[derive(Clone)]
pub struct RelayClient {
    client: Client,
    relays: Vec<String>,
}

impl RelayClient {
    /// Create a client for the given keys and connect to `relay_urls`.
    pub async fn connect(keys: Keys, relay_urls: Vec<String>) -> Result<Self, TransportError> {
        if relay_urls.is_empty() {
            return Err(TransportError::NoRelays);
        }

        let client = Client::new(keys);
        for relay_url in &relay_urls {
            client
                .add_read_relay(relay_url.as_str())
                .await
                .map_err(|e| TransportError::AddRelay {
                    url: relay_url.clone(),
                    source: Box::new(e),
                })?;
        }

        client.connect().await;
        info!("Relay client connected to {} relay(s)", relay_urls.len());

        Ok(Self {
            client,
            relays: relay_urls,
        })
    }

    /// Subscriptions still open on the pool.
    pub async fn open_subscriptions(&self) -> usize {
        self.client.subscriptions().await.len()
    }

    pub async fn disconnect(&self) {
        info!(
            "Disconnecting from {} relay(s), {} subscription(s) open",
            self.relays.len(),
            self.open_subscriptions().await
        );
        self.client.disconnect().await;
    }
}

#[async_trait]
impl Transport for RelayClient {
    async fn subscribe(&self, filter: Filter) -> Result<RelayStream, TransportError> {
        // Take the receiver before subscribing so no early event is missed.
        let notifications = self.client.notifications();

        let output = self
            .client
            .subscribe(filter, None)
            .await
            .map_err(|e| TransportError::Subscribe(Box::new(e)))?;
        let sub_id = output.val;
        debug!("Subscribed as {} on {} relay(s)", sub_id, output.success.len());

        let (tx, rx) = mpsc::channel(MERGE_CAPACITY);
        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let client = self.client.clone();

        tokio::spawn(async move {
            forward(notifications, &sub_id, tx, token).await;
            client.unsubscribe(&sub_id).await;
            debug!("Subscription {} closed", sub_id);
        });

        Ok(RelayStream::new(rx, cancel))
    }
}

/// Move events for `sub_id` from the pool notifications into the merge
/// channel. Returns once the token is cancelled, the consumer drops its
/// receiver, or the pool shuts down.
async fn forward(
    mut notifications: broadcast::Receiver<RelayPoolNotification>,
    sub_id: &SubscriptionId,
    tx: mpsc::Sender<RelayEvent>,
    token: CancellationToken,
) {
    loop {
        let notification = tokio::select! {
            _ = token.cancelled() => break,
            _ = tx.closed() => break,
            n = notifications.recv() => n,
        };

        match notification {
            Ok(RelayPoolNotification::Event {
                relay_url,
                subscription_id,
                event,
            }) => {
                if subscription_id != *sub_id {
                    continue;
                }
                let item = RelayEvent {
                    relay_url: relay_url.to_string(),
                    event: *event,
                };
                if tx.send(item).await.is_err() {
                    break;
                }
            }
            Ok(RelayPoolNotification::Shutdown) => {
                info!("Relay pool shut down");
                break;
            }
            Ok(_) => {}
            Err(RecvError::Lagged(skipped)) => {
                warn!("Notification receiver lagged, {} notification(s) skipped", skipped);
            }
            Err(RecvError::Closed) => break,
        }
    }
}
