//! Upstream connection state owned by the relay core.

use std::fmt;
use std::time::Duration;

use serde::Serialize;

/// Lifecycle of the single upstream push connection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    /// Not started, or shut down (terminal after shutdown).
    #[default]
    Disconnected,
    /// A connect attempt is in flight.
    Connecting,
    /// Push is live and authoritative.
    Connected,
    /// Waiting for the backoff timer before the next attempt.
    Backoff,
}

impl ConnectionState {
    /// Push is the authoritative source only while connected.
    #[must_use]
    pub const fn push_authoritative(self) -> bool {
        matches!(self, Self::Connected)
    }

    /// Whether the fallback poller is allowed to run in this state.
    #[must_use]
    pub const fn allows_polling(self) -> bool {
        matches!(self, Self::Connecting | Self::Backoff)
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Backoff => "backoff",
        };
        f.write_str(s)
    }
}

/// Consecutive-failure bookkeeping for reconnect attempts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BackoffState {
    /// Consecutive failed attempts since the last successful connect.
    pub attempt_count: u32,
    /// Delay armed for the next attempt (zero when not backing off).
    pub next_delay: Duration,
}

impl BackoffState {
    /// Reset after a successful connect.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Record one failed attempt and the delay armed for the next one.
    ///
    /// Saturates instead of wrapping; retries never stop.
    pub fn record_failure(&mut self, next_delay: Duration) {
        self.attempt_count = self.attempt_count.saturating_add(1);
        self.next_delay = next_delay;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_connected_is_authoritative() {
        assert!(ConnectionState::Connected.push_authoritative());
        assert!(!ConnectionState::Backoff.push_authoritative());
        assert!(!ConnectionState::Connected.allows_polling());
        assert!(ConnectionState::Backoff.allows_polling());
        assert!(ConnectionState::Connecting.allows_polling());
    }

    #[test]
    fn backoff_state_counts_and_resets() {
        let mut state = BackoffState::default();
        state.record_failure(Duration::from_secs(2));
        state.record_failure(Duration::from_secs(4));
        assert_eq!(state.attempt_count, 2);
        assert_eq!(state.next_delay, Duration::from_secs(4));

        state.reset();
        assert_eq!(state, BackoffState::default());
    }

    #[test]
    fn attempt_count_saturates() {
        let mut state = BackoffState {
            attempt_count: u32::MAX,
            next_delay: Duration::ZERO,
        };
        state.record_failure(Duration::from_secs(60));
        assert_eq!(state.attempt_count, u32::MAX);
    }
}
