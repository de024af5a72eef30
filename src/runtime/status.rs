//! Link state published by the relay core and the status view built on it.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::hub::Origin;
use super::stats::RelayStats;
use crate::domain::{BackoffState, ConnectionState};

/// Core-owned state, published read-only to the poller and to callers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LinkStatus {
    pub state: ConnectionState,
    pub backoff: BackoffState,
}

/// Point-in-time view of the relay.
#[derive(Debug, Clone, Serialize)]
pub struct RelayStatus {
    pub state: ConnectionState,
    pub attempt_count: u32,
    pub next_delay_ms: u64,
    pub last_delivery_at: Option<DateTime<Utc>>,
    pub last_source: Option<Origin>,
    pub subscribers: usize,
    pub stats: RelayStats,
    #[serde(skip)]
    pub last_delivery_age: Option<Duration>,
    #[serde(skip)]
    pub uptime: Duration,
}

impl RelayStatus {
    /// Nothing delivered for longer than `threshold`, counting from start
    /// when nothing was ever delivered.
    ///
    /// Callers should show a degraded-data banner, not an outage.
    #[must_use]
    pub fn is_degraded(&self, threshold: Duration) -> bool {
        self.last_delivery_age.unwrap_or(self.uptime) > threshold
    }
}
