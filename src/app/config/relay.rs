//! Relay timing and capacity configuration.

use serde::Deserialize;

/// Poll cadence, backoff and fan-out settings. Durations are in seconds.
#[derive(Debug, Clone, Deserialize)]
pub struct RelayConfig {
    /// Base interval between fallback polls.
    #[serde(default = "default_idle_poll_seconds")]
    pub idle_poll_seconds: f64,
    /// Upper bound of the jitter added to each poll interval.
    #[serde(default = "default_poll_jitter_seconds")]
    pub poll_jitter_seconds: f64,
    /// Grace window after the last push delivery before polling resumes.
    #[serde(default = "default_recent_push_seconds")]
    pub recent_push_seconds: f64,
    #[serde(default = "default_backoff_min_seconds")]
    pub backoff_min_seconds: f64,
    #[serde(default = "default_backoff_max_seconds")]
    pub backoff_max_seconds: f64,
    #[serde(default = "default_backoff_jitter_seconds")]
    pub backoff_jitter_seconds: f64,
    /// Bounded channel size per subscriber.
    #[serde(default = "default_subscriber_capacity")]
    pub subscriber_capacity: usize,
    /// Sparkline points kept per index.
    #[serde(default = "default_history_size")]
    pub history_size: usize,
    #[serde(default = "default_shutdown_grace_seconds")]
    pub shutdown_grace_seconds: f64,
    /// Fixed seed for jitter. Unset in production.
    #[serde(default)]
    pub rng_seed: Option<u64>,
}

fn default_idle_poll_seconds() -> f64 {
    3.0
}

fn default_poll_jitter_seconds() -> f64 {
    0.6
}

fn default_recent_push_seconds() -> f64 {
    2.5
}

fn default_backoff_min_seconds() -> f64 {
    2.0
}

fn default_backoff_max_seconds() -> f64 {
    60.0
}

fn default_backoff_jitter_seconds() -> f64 {
    0.8
}

fn default_subscriber_capacity() -> usize {
    64
}

fn default_history_size() -> usize {
    30
}

fn default_shutdown_grace_seconds() -> f64 {
    5.0
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            idle_poll_seconds: default_idle_poll_seconds(),
            poll_jitter_seconds: default_poll_jitter_seconds(),
            recent_push_seconds: default_recent_push_seconds(),
            backoff_min_seconds: default_backoff_min_seconds(),
            backoff_max_seconds: default_backoff_max_seconds(),
            backoff_jitter_seconds: default_backoff_jitter_seconds(),
            subscriber_capacity: default_subscriber_capacity(),
            history_size: default_history_size(),
            shutdown_grace_seconds: default_shutdown_grace_seconds(),
            rng_seed: None,
        }
    }
}
