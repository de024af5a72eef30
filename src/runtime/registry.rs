//! Downstream subscriber registry.
//!
//! Each subscriber owns a bounded channel. Fan-out uses `try_send` only, so a
//! slow consumer can never stall the hub: a full or closed channel gets the
//! subscriber removed instead.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::domain::{IndexSnapshot, SubscriberId};

/// Registered delivery endpoint. Only the registry holds the sender.
#[derive(Debug)]
struct Subscriber {
    delivery_channel: mpsc::Sender<Arc<IndexSnapshot>>,
    joined_at: DateTime<Utc>,
}

/// Receiving half handed to a downstream subscriber.
#[derive(Debug)]
pub struct Subscription {
    id: SubscriberId,
    receiver: mpsc::Receiver<Arc<IndexSnapshot>>,
}

impl Subscription {
    #[must_use]
    pub fn id(&self) -> SubscriberId {
        self.id
    }

    /// Wait for the next snapshot. `None` once the registry dropped us.
    pub async fn recv(&mut self) -> Option<Arc<IndexSnapshot>> {
        self.receiver.recv().await
    }

    /// Non-blocking receive.
    pub fn try_recv(&mut self) -> Option<Arc<IndexSnapshot>> {
        self.receiver.try_recv().ok()
    }
}

/// Result of one fan-out.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BroadcastOutcome {
    pub delivered: usize,
    pub dropped: usize,
}

/// Registry of active subscribers.
///
/// Backed by a sharded concurrent map so that joins and leaves only contend
/// with fan-out on a single shard, never on the whole registry.
#[derive(Debug)]
pub struct SubscriptionRegistry {
    subscribers: DashMap<SubscriberId, Subscriber>,
    next_id: AtomicU64,
    capacity: usize,
}

impl SubscriptionRegistry {
    /// Create a registry whose per-subscriber channels hold `capacity`
    /// snapshots. A zero capacity is treated as one.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            subscribers: DashMap::new(),
            next_id: AtomicU64::new(1),
            capacity: capacity.max(1),
        }
    }

    /// Register a new subscriber. It only sees snapshots broadcast after
    /// this call returns.
    pub fn subscribe(&self) -> Subscription {
        let id = SubscriberId::new(self.next_id.fetch_add(1, Ordering::Relaxed));
        let (tx, rx) = mpsc::channel(self.capacity);
        let joined_at = Utc::now();

        self.subscribers.insert(
            id,
            Subscriber {
                delivery_channel: tx,
                joined_at,
            },
        );
        info!(subscriber_id = %id, capacity = self.capacity, "Subscriber joined");

        Subscription { id, receiver: rx }
    }

    /// Remove a subscriber. Returns whether it was registered.
    pub fn unsubscribe(&self, id: SubscriberId) -> bool {
        match self.subscribers.remove(&id) {
            Some((_, sub)) => {
                let connected_for = Utc::now() - sub.joined_at;
                info!(
                    subscriber_id = %id,
                    connected_secs = connected_for.num_seconds(),
                    "Subscriber left"
                );
                true
            }
            None => false,
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.subscribers.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.subscribers.is_empty()
    }

    #[must_use]
    pub fn contains(&self, id: SubscriberId) -> bool {
        self.subscribers.contains_key(&id)
    }

    /// Deliver `snapshot` to every registered subscriber. Never fails.
    pub fn broadcast(&self, snapshot: &Arc<IndexSnapshot>) -> BroadcastOutcome {
        let mut outcome = BroadcastOutcome::default();
        let mut evicted = Vec::new();

        for entry in self.subscribers.iter() {
            match entry.delivery_channel.try_send(Arc::clone(snapshot)) {
                Ok(()) => outcome.delivered += 1,
                Err(mpsc::error::TrySendError::Full(_)) => {
                    warn!(subscriber_id = %entry.key(), "Subscriber channel full, dropping subscriber");
                    evicted.push(*entry.key());
                }
                Err(mpsc::error::TrySendError::Closed(_)) => {
                    debug!(subscriber_id = %entry.key(), "Subscriber channel closed");
                    evicted.push(*entry.key());
                }
            }
        }

        // Removal happens after iteration; removing while holding a shard
        // guard would deadlock.
        for id in evicted {
            if self.subscribers.remove(&id).is_some() {
                outcome.dropped += 1;
            }
        }

        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testkit;

    fn snap(secs: i64) -> Arc<IndexSnapshot> {
        Arc::new(testkit::domain::snapshot("VNINDEX", secs))
    }

    #[test]
    fn subscribe_assigns_unique_ids() {
        let registry = SubscriptionRegistry::new(4);
        let a = registry.subscribe();
        let b = registry.subscribe();

        assert_ne!(a.id(), b.id());
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn unsubscribe_removes_once() {
        let registry = SubscriptionRegistry::new(4);
        let sub = registry.subscribe();

        assert!(registry.unsubscribe(sub.id()));
        assert!(!registry.unsubscribe(sub.id()));
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn broadcast_reaches_every_subscriber() {
        let registry = SubscriptionRegistry::new(4);
        let mut subs: Vec<_> = (0..5).map(|_| registry.subscribe()).collect();

        let outcome = registry.broadcast(&snap(1));
        assert_eq!(outcome, BroadcastOutcome { delivered: 5, dropped: 0 });

        for sub in &mut subs {
            let got = sub.recv().await.unwrap();
            assert_eq!(got.index_id().as_str(), "VNINDEX");
        }
    }

    #[test]
    fn full_channel_evicts_only_that_subscriber() {
        let registry = SubscriptionRegistry::new(1);
        let slow = registry.subscribe();
        let mut fast = registry.subscribe();

        registry.broadcast(&snap(1));
        // Fast drains, slow does not.
        assert!(fast.try_recv().is_some());

        let outcome = registry.broadcast(&snap(2));
        assert_eq!(outcome, BroadcastOutcome { delivered: 1, dropped: 1 });
        assert!(!registry.contains(slow.id()));
        assert!(registry.contains(fast.id()));
        assert_eq!(fast.try_recv().unwrap().observed_at(), snap(2).observed_at());
    }

    #[test]
    fn closed_channel_is_evicted() {
        let registry = SubscriptionRegistry::new(4);
        let gone = registry.subscribe();
        let id = gone.id();
        drop(gone);

        let outcome = registry.broadcast(&snap(1));
        assert_eq!(outcome.dropped, 1);
        assert!(!registry.contains(id));
    }

    #[tokio::test]
    async fn evicted_subscriber_sees_end_of_stream_after_backlog() {
        let registry = SubscriptionRegistry::new(1);
        let mut slow = registry.subscribe();

        registry.broadcast(&snap(1));
        registry.broadcast(&snap(2));

        assert_eq!(slow.recv().await.unwrap().observed_at(), snap(1).observed_at());
        assert!(slow.recv().await.is_none());
    }

    #[test]
    fn late_joiner_misses_earlier_broadcast() {
        let registry = SubscriptionRegistry::new(4);
        registry.broadcast(&snap(1));
        let mut late = registry.subscribe();

        assert!(late.try_recv().is_none());
    }
}
