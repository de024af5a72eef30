//! Canonical test configurations.
//!
//! Single source of truth for settings used across tests. Timings match the
//! production defaults except that jitter is zero and the RNG is seeded, so
//! paused-clock tests see exact instants.

use std::time::Duration;

use crate::app::Config;
use crate::runtime::{BackoffPolicy, PollerSettings, RelaySettings};

/// Production timings without jitter.
pub fn relay() -> RelaySettings {
    RelaySettings {
        connect_timeout: Duration::from_secs(8),
        backoff: BackoffPolicy::new(Duration::from_secs(2), Duration::from_secs(60), Duration::ZERO),
        poller: PollerSettings {
            idle_interval: Duration::from_secs(3),
            jitter: Duration::ZERO,
            recent_push: Duration::from_millis(2500),
            poll_timeout: Duration::from_secs(3),
        },
        subscriber_capacity: 64,
        history_size: 30,
        shutdown_grace: Duration::from_secs(1),
        rng_seed: Some(7),
    }
}

/// [`relay`] with a different per-subscriber capacity.
pub fn relay_with_capacity(capacity: usize) -> RelaySettings {
    RelaySettings {
        subscriber_capacity: capacity,
        ..relay()
    }
}

/// Application config pointing at local endpoints.
pub fn app() -> Config {
    let mut config = Config::default();
    config.upstream.ws_url = "ws://127.0.0.1:9/ws".into();
    config.upstream.poll_url = "http://127.0.0.1:9/api/price/marketIndex/getList".into();
    config
}
