//! Relay counters for observability.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Shared counters updated atomically by the hub, the poller and the core.
#[derive(Debug, Default)]
pub struct RelayCounters {
    delivered: AtomicU64,
    ordering_violations: AtomicU64,
    backpressure_drops: AtomicU64,
    connect_attempts: AtomicU64,
    polls_issued: AtomicU64,
    poll_failures: AtomicU64,
}

impl RelayCounters {
    pub fn record_delivered(&self) {
        self.delivered.fetch_add(1, Ordering::Relaxed);
    }

    /// A snapshot not newer than the last delivered one for its index.
    pub fn record_ordering_violation(&self) {
        self.ordering_violations.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_backpressure_drops(&self, n: u64) {
        self.backpressure_drops.fetch_add(n, Ordering::Relaxed);
    }

    pub fn record_connect_attempt(&self) {
        self.connect_attempts.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_poll(&self) {
        self.polls_issued.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_poll_failure(&self) {
        self.poll_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Point-in-time copy of every counter.
    #[must_use]
    pub fn snapshot(&self) -> RelayStats {
        RelayStats {
            delivered: self.delivered.load(Ordering::Relaxed),
            ordering_violations: self.ordering_violations.load(Ordering::Relaxed),
            backpressure_drops: self.backpressure_drops.load(Ordering::Relaxed),
            connect_attempts: self.connect_attempts.load(Ordering::Relaxed),
            polls_issued: self.polls_issued.load(Ordering::Relaxed),
            poll_failures: self.poll_failures.load(Ordering::Relaxed),
        }
    }
}

/// Plain copy of [`RelayCounters`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RelayStats {
    /// Snapshots accepted by the hub and fanned out.
    pub delivered: u64,
    /// Stale or duplicate snapshots dropped before fan-out.
    pub ordering_violations: u64,
    /// Subscribers removed because their channel was full or closed.
    pub backpressure_drops: u64,
    pub connect_attempts: u64,
    pub polls_issued: u64,
    pub poll_failures: u64,
}
