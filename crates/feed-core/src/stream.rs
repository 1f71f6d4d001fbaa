//! Deduplicated view over a merged relay subscription.
//!
//! The same event normally arrives once per relay that stores it. This
//! stream yields each event id once, in first-arrival order, and otherwise
//! never ends on its own: it finishes only when the transport closes every
//! relay channel or the subscription is cancelled.
//!
//! The seen-id set grows for the lifetime of the subscription and is never
//! evicted. That is fine for an interactive session; a long-running daemon
//! would need a bound.

use std::collections::HashSet;

use nostr_sdk::{Event, EventId};
use tracing::trace;

use crate::transport::RelayStream;

/// Tracks seen event ids.
#[derive(Debug, Default)]
pub struct EventDedup {
    seen: HashSet<EventId>,
}

impl EventDedup {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if the event is new (not seen before).
    pub fn check_and_insert(&mut self, id: EventId) -> bool {
        self.seen.insert(id)
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}

pub struct SubscriptionStream {
    inner: RelayStream,
    dedup: EventDedup,
    duplicates: u64,
}

impl SubscriptionStream {
    pub fn new(inner: RelayStream) -> Self {
        Self {
            inner,
            dedup: EventDedup::new(),
            duplicates: 0,
        }
    }

    /// Next event not seen before on this subscription.
    pub async fn next(&mut self) -> Option<Event> {
        while let Some(item) = self.inner.recv().await {
            if self.dedup.check_and_insert(item.event.id) {
                return Some(item.event);
            }
            self.duplicates += 1;
            trace!("Duplicate {} from {}", item.event.id, item.relay_url);
        }
        None
    }

    /// Stop the underlying subscription. Pending and later calls to
    /// [`next`](Self::next) return `None`.
    pub fn cancel(&self) {
        self.inner.cancel_token().cancel();
    }

    /// Number of distinct events yielded so far.
    pub fn seen(&self) -> usize {
        self.dedup.len()
    }

    pub fn duplicates(&self) -> u64 {
        self.duplicates
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::RelayEvent;
    use nostr_sdk::{EventBuilder, Keys};

    fn note(keys: &Keys, content: &str) -> Event {
        EventBuilder::text_note(content).sign_with_keys(keys).unwrap()
    }

    fn from(relay: &str, event: &Event) -> RelayEvent {
        RelayEvent {
            relay_url: relay.to_string(),
            event: event.clone(),
        }
    }

    #[test]
    fn dedup_check_and_insert() {
        let keys = Keys::generate();
        let a = note(&keys, "a");
        let b = note(&keys, "b");

        let mut dedup = EventDedup::new();
        assert!(dedup.check_and_insert(a.id));
        assert!(!dedup.check_and_insert(a.id));
        assert!(dedup.check_and_insert(b.id));
        assert_eq!(dedup.len(), 2);
    }

    #[tokio::test]
    async fn same_event_from_two_relays_yields_once() {
        let keys = Keys::generate();
        let first = note(&keys, "first");
        let second = note(&keys, "second");

        let (tx, raw) = RelayStream::channel(8);
        tx.send(from("wss://one", &first)).await.unwrap();
        tx.send(from("wss://two", &first)).await.unwrap();
        tx.send(from("wss://two", &second)).await.unwrap();
        tx.send(from("wss://one", &second)).await.unwrap();
        drop(tx);

        let mut stream = SubscriptionStream::new(raw);
        assert_eq!(stream.next().await.map(|e| e.id), Some(first.id));
        assert_eq!(stream.next().await.map(|e| e.id), Some(second.id));
        assert!(stream.next().await.is_none());
        assert_eq!(stream.seen(), 2);
        assert_eq!(stream.duplicates(), 2);
    }

    #[tokio::test]
    async fn cancel_ends_stream() {
        let keys = Keys::generate();
        let (tx, raw) = RelayStream::channel(8);
        tx.send(from("wss://one", &note(&keys, "x"))).await.unwrap();

        let mut stream = SubscriptionStream::new(raw);
        stream.cancel();
        assert!(stream.next().await.is_none());
        drop(tx);
    }

    #[tokio::test]
    async fn waits_for_late_events() {
        let keys = Keys::generate();
        let late = note(&keys, "late");
        let (tx, raw) = RelayStream::channel(8);

        let sent = late.clone();
        tokio::spawn(async move {
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
            tx.send(from("wss://slow", &sent)).await.unwrap();
        });

        let mut stream = SubscriptionStream::new(raw);
        assert_eq!(stream.next().await.map(|e| e.id), Some(late.id));
        assert!(stream.next().await.is_none());
    }
}
