//! Broadcast hub: ordering gate, latest-value cache and fan-out.
//!
//! Both the push path (relay core) and the poll path (fallback poller) hand
//! snapshots to [`BroadcastHub::publish`]. The per-index gate and the fan-out
//! run under one lock, so for any index every subscriber observes strictly
//! increasing `observed_at`, whichever source produced the snapshot.

use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rust_decimal::Decimal;
use serde::Serialize;
use tokio::sync::watch;
use tokio::time::Instant;
use tracing::{debug, trace};

use super::registry::{Subscription, SubscriptionRegistry};
use super::stats::{RelayCounters, RelayStats};
use crate::domain::{IndexId, IndexSnapshot, SubscriberId};

/// Where a snapshot came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Origin {
    Push,
    Poll,
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Push => f.write_str("push"),
            Self::Poll => f.write_str("poll"),
        }
    }
}

/// Outcome of [`BroadcastHub::publish`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Publish {
    /// Accepted and fanned out to `recipients` subscribers.
    Delivered { recipients: usize },
    /// Not newer than the last delivered snapshot for its index; dropped.
    Stale,
}

/// Result of a bounded-time lookup for first render.
#[derive(Debug, Clone, PartialEq)]
pub enum SnapshotLookup {
    Ready(Arc<IndexSnapshot>),
    /// Nothing arrived in time. Callers should render a placeholder rather
    /// than treat this as a failure.
    NoDataYet,
}

impl SnapshotLookup {
    #[must_use]
    pub fn ready(self) -> Option<Arc<IndexSnapshot>> {
        match self {
            Self::Ready(snapshot) => Some(snapshot),
            Self::NoDataYet => None,
        }
    }
}

/// Last accepted delivery, used for freshness checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Delivery {
    pub at: Instant,
    /// Wall-clock receipt time, for display.
    pub received_at: DateTime<Utc>,
    pub origin: Origin,
}

struct IndexRecord {
    latest: Arc<IndexSnapshot>,
    history: VecDeque<Decimal>,
}

#[derive(Default)]
struct Gate {
    indices: HashMap<IndexId, IndexRecord>,
    last_delivery: Option<Delivery>,
    last_push: Option<Instant>,
}

/// Fan-out point shared by the relay core, the poller and API callers.
pub struct BroadcastHub {
    registry: SubscriptionRegistry,
    gate: Mutex<Gate>,
    history_size: usize,
    counters: Arc<RelayCounters>,
    updates: watch::Sender<u64>,
}

impl BroadcastHub {
    /// Create a hub with per-subscriber channel `capacity` and a sparkline
    /// ring of `history_size` values per index.
    #[must_use]
    pub fn new(capacity: usize, history_size: usize) -> Self {
        let (updates, _) = watch::channel(0);
        Self {
            registry: SubscriptionRegistry::new(capacity),
            gate: Mutex::new(Gate::default()),
            history_size,
            counters: Arc::new(RelayCounters::default()),
            updates,
        }
    }

    pub fn subscribe(&self) -> Subscription {
        self.registry.subscribe()
    }

    pub fn unsubscribe(&self, id: SubscriberId) -> bool {
        self.registry.unsubscribe(id)
    }

    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.registry.len()
    }

    /// Gate and fan out one snapshot.
    ///
    /// Stale and duplicate snapshots are counted as ordering violations and
    /// silently dropped.
    pub fn publish(&self, snapshot: IndexSnapshot, origin: Origin) -> Publish {
        let mut gate = self.gate.lock();

        if let Some(record) = gate.indices.get(snapshot.index_id()) {
            if !snapshot.is_newer_than(&record.latest) {
                self.counters.record_ordering_violation();
                trace!(
                    index_id = %snapshot.index_id(),
                    %origin,
                    observed_at = %snapshot.observed_at(),
                    last = %record.latest.observed_at(),
                    "Dropping stale snapshot"
                );
                return Publish::Stale;
            }
        }

        let snapshot = Arc::new(snapshot);
        let outcome = self.registry.broadcast(&snapshot);
        if outcome.dropped > 0 {
            self.counters.record_backpressure_drops(outcome.dropped as u64);
        }
        self.counters.record_delivered();

        let history_size = self.history_size;
        let record = gate
            .indices
            .entry(snapshot.index_id().clone())
            .or_insert_with(|| IndexRecord {
                latest: Arc::clone(&snapshot),
                history: VecDeque::with_capacity(history_size),
            });
        record.latest = Arc::clone(&snapshot);
        if history_size > 0 {
            if record.history.len() == history_size {
                record.history.pop_front();
            }
            record.history.push_back(snapshot.current_value());
        }

        let now = Instant::now();
        gate.last_delivery = Some(Delivery {
            at: now,
            received_at: Utc::now(),
            origin,
        });
        if origin == Origin::Push {
            gate.last_push = Some(now);
        }
        drop(gate);

        self.updates.send_modify(|seq| *seq = seq.wrapping_add(1));
        debug!(
            index_id = %snapshot.index_id(),
            %origin,
            value = %snapshot.current_value(),
            recipients = outcome.delivered,
            "Snapshot delivered"
        );

        Publish::Delivered {
            recipients: outcome.delivered,
        }
    }

    /// Most recent delivered snapshot for `index_id`.
    #[must_use]
    pub fn latest(&self, index_id: &IndexId) -> Option<Arc<IndexSnapshot>> {
        self.gate
            .lock()
            .indices
            .get(index_id)
            .map(|r| Arc::clone(&r.latest))
    }

    /// Most recent delivered snapshot of every index, sorted by index id.
    #[must_use]
    pub fn latest_all(&self) -> Vec<Arc<IndexSnapshot>> {
        let gate = self.gate.lock();
        let mut all: Vec<_> = gate.indices.values().map(|r| Arc::clone(&r.latest)).collect();
        all.sort_by(|a, b| a.index_id().cmp(b.index_id()));
        all
    }

    /// Recent `current_value`s for `index_id`, oldest first.
    #[must_use]
    pub fn history(&self, index_id: &IndexId) -> Vec<Decimal> {
        self.gate
            .lock()
            .indices
            .get(index_id)
            .map(|r| r.history.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Best-effort current snapshot within `wait`.
    ///
    /// Returns immediately when a snapshot is already cached.
    pub async fn snapshot_within(&self, index_id: &IndexId, wait: Duration) -> SnapshotLookup {
        let mut updates = self.updates.subscribe();
        let first_arrival = async {
            loop {
                if let Some(snapshot) = self.latest(index_id) {
                    return SnapshotLookup::Ready(snapshot);
                }
                if updates.changed().await.is_err() {
                    return SnapshotLookup::NoDataYet;
                }
            }
        };

        tokio::time::timeout(wait, first_arrival)
            .await
            .unwrap_or(SnapshotLookup::NoDataYet)
    }

    #[must_use]
    pub fn last_delivery(&self) -> Option<Delivery> {
        self.gate.lock().last_delivery
    }

    /// Whether push delivered something within `window`.
    #[must_use]
    pub fn push_is_recent(&self, window: Duration) -> bool {
        self.gate
            .lock()
            .last_push
            .is_some_and(|at| at.elapsed() <= window)
    }

    pub(crate) fn counters(&self) -> &Arc<RelayCounters> {
        &self.counters
    }

    #[must_use]
    pub fn stats(&self) -> RelayStats {
        self.counters.snapshot()
    }
}

impl fmt::Debug for BroadcastHub {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BroadcastHub")
            .field("subscribers", &self.registry.len())
            .field("history_size", &self.history_size)
            .finish_non_exhaustive()
    }
}
