//! Runtime settings for the relay, already converted to durations.
//!
//! Built from [`crate::app::Config`] via `Config::relay_settings`, or
//! directly in tests.

use std::time::Duration;

use super::backoff::BackoffPolicy;

/// Fallback poller cadence.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PollerSettings {
    /// Base interval between polls.
    pub idle_interval: Duration,
    /// Upper bound of the uniform jitter added to each interval.
    pub jitter: Duration,
    /// A poll is skipped while push delivered data within this window.
    pub recent_push: Duration,
    /// Per-request bound on `poll_once`.
    pub poll_timeout: Duration,
}

impl Default for PollerSettings {
    fn default() -> Self {
        Self {
            idle_interval: Duration::from_secs(3),
            jitter: Duration::from_millis(600),
            recent_push: Duration::from_millis(2500),
            poll_timeout: Duration::from_secs(3),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RelaySettings {
    pub connect_timeout: Duration,
    pub backoff: BackoffPolicy,
    pub poller: PollerSettings,
    /// Bounded channel size per subscriber.
    pub subscriber_capacity: usize,
    /// Sparkline points kept per index.
    pub history_size: usize,
    /// How long shutdown waits for each task before abandoning it.
    pub shutdown_grace: Duration,
    /// Seed for backoff and poll jitter. `None` seeds from entropy.
    pub rng_seed: Option<u64>,
}

impl RelaySettings {
    /// Window after which no delivery means degraded data.
    #[must_use]
    pub fn degraded_after(&self) -> Duration {
        self.poller.recent_push.saturating_add(self.poller.idle_interval)
    }
}

impl Default for RelaySettings {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(8),
            backoff: BackoffPolicy::default(),
            poller: PollerSettings::default(),
            subscriber_capacity: 64,
            history_size: 30,
            shutdown_grace: Duration::from_secs(5),
            rng_seed: None,
        }
    }
}
