//! Application configuration loading and validation.
//!
//! Configuration is read from an optional TOML file, then overridden from the
//! environment (after `.env` has been loaded by the binary), then validated.
//!
//! # Example
//!
//! ```no_run
//! use indexrelay::app::Config;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::load_or_default("config.toml")?;
//!     config.init_logging();
//!     Ok(())
//! }
//! ```

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;
use url::Url;

use crate::domain::IndexId;
use crate::error::{ConfigError, Result};
use crate::runtime::{BackoffPolicy, PollerSettings, RelaySettings};

mod logging;
mod relay;
mod upstream;

pub use logging::LoggingConfig;
pub use relay::RelayConfig;
pub use upstream::UpstreamConfig;

/// Main application configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub upstream: UpstreamConfig,
    #[serde(default)]
    pub relay: RelayConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load from `path`, apply environment overrides and validate.
    #[allow(clippy::result_large_err)]
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::ReadFile)?;
        let mut config = Self::parse_toml(&content)?;
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// Like [`Config::load`], but a missing file means defaults.
    #[allow(clippy::result_large_err)]
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        if path.as_ref().exists() {
            return Self::load(path);
        }
        let mut config = Self::default();
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// Parse TOML without overrides or validation.
    #[allow(clippy::result_large_err)]
    pub fn parse_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content).map_err(ConfigError::Parse)?)
    }

    #[allow(clippy::result_large_err)]
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from `lookup`, keyed by environment variable name.
    #[allow(clippy::result_large_err)]
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let durations = [
            ("IDLE_POLL_SECONDS", &mut self.relay.idle_poll_seconds),
            ("POLL_JITTER_SECONDS", &mut self.relay.poll_jitter_seconds),
            ("RECENT_PUSH_SECONDS", &mut self.relay.recent_push_seconds),
            (
                "WS_CONNECT_TIMEOUT_SECONDS",
                &mut self.upstream.ws_connect_timeout_seconds,
            ),
            ("BACKOFF_MIN_SECONDS", &mut self.relay.backoff_min_seconds),
            ("BACKOFF_MAX_SECONDS", &mut self.relay.backoff_max_seconds),
            ("BACKOFF_JITTER_SECONDS", &mut self.relay.backoff_jitter_seconds),
        ];
        for (key, slot) in durations {
            if let Some(raw) = lookup(key) {
                *slot = raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
                    field: key,
                    reason: format!("expected seconds, got {raw:?}"),
                })?;
            }
        }

        if let Some(url) = lookup("RELAY_WS_URL") {
            self.upstream.ws_url = url;
        }
        if let Some(url) = lookup("RELAY_POLL_URL") {
            self.upstream.poll_url = url;
        }
        if let Some(list) = lookup("RELAY_INDICES") {
            self.upstream.indices = list
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect();
        }
        Ok(())
    }

    #[allow(clippy::result_large_err)]
    pub fn validate(&self) -> Result<()> {
        let relay = &self.relay;
        let upstream = &self.upstream;

        for (field, value) in [
            ("poll_jitter_seconds", relay.poll_jitter_seconds),
            ("recent_push_seconds", relay.recent_push_seconds),
            ("backoff_jitter_seconds", relay.backoff_jitter_seconds),
            ("backoff_max_seconds", relay.backoff_max_seconds),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(invalid(field, "must be a non-negative number of seconds"));
            }
            check_representable(field, value)?;
        }
        for (field, value) in [
            ("idle_poll_seconds", relay.idle_poll_seconds),
            ("backoff_min_seconds", relay.backoff_min_seconds),
            ("shutdown_grace_seconds", relay.shutdown_grace_seconds),
            ("ws_connect_timeout_seconds", upstream.ws_connect_timeout_seconds),
            ("poll_timeout_seconds", upstream.poll_timeout_seconds),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(invalid(field, "must be greater than 0 seconds"));
            }
            check_representable(field, value)?;
        }
        if relay.backoff_min_seconds > relay.backoff_max_seconds {
            return Err(invalid(
                "backoff_min_seconds",
                "must not exceed backoff_max_seconds",
            ));
        }
        if relay.subscriber_capacity == 0 {
            return Err(invalid("subscriber_capacity", "must be greater than 0"));
        }

        if upstream.ws_url.is_empty() {
            return Err(ConfigError::MissingField { field: "ws_url" }.into());
        }
        if upstream.poll_url.is_empty() {
            return Err(ConfigError::MissingField { field: "poll_url" }.into());
        }
        check_url("ws_url", &upstream.ws_url, &["ws", "wss"])?;
        check_url("poll_url", &upstream.poll_url, &["http", "https"])?;

        if upstream.indices.iter().all(|s| s.trim().is_empty()) {
            return Err(ConfigError::MissingField { field: "indices" }.into());
        }
        Ok(())
    }

    /// Index identifiers to follow, normalized.
    #[must_use]
    pub fn index_ids(&self) -> Vec<IndexId> {
        self.upstream
            .indices
            .iter()
            .filter(|s| !s.trim().is_empty())
            .map(|s| IndexId::new(s.as_str()))
            .collect()
    }

    /// Runtime settings derived from this configuration.
    #[must_use]
    pub fn relay_settings(&self) -> RelaySettings {
        let relay = &self.relay;
        RelaySettings {
            connect_timeout: seconds(self.upstream.ws_connect_timeout_seconds),
            backoff: BackoffPolicy::new(
                seconds(relay.backoff_min_seconds),
                seconds(relay.backoff_max_seconds),
                seconds(relay.backoff_jitter_seconds),
            ),
            poller: PollerSettings {
                idle_interval: seconds(relay.idle_poll_seconds),
                jitter: seconds(relay.poll_jitter_seconds),
                recent_push: seconds(relay.recent_push_seconds),
                poll_timeout: seconds(self.upstream.poll_timeout_seconds),
            },
            subscriber_capacity: relay.subscriber_capacity,
            history_size: relay.history_size,
            shutdown_grace: seconds(relay.shutdown_grace_seconds),
            rng_seed: relay.rng_seed,
        }
    }

    /// Initialize logging with the configured settings.
    pub fn init_logging(&self) {
        self.logging.init();
    }
}

/// Saturating conversion. `validate` rejects anything this would clamp.
fn seconds(value: f64) -> Duration {
    if value.is_nan() || value <= 0.0 {
        return Duration::ZERO;
    }
    Duration::try_from_secs_f64(value).unwrap_or(Duration::MAX)
}

#[allow(clippy::result_large_err)]
fn check_representable(field: &'static str, value: f64) -> Result<()> {
    if Duration::try_from_secs_f64(value).is_err() {
        return Err(invalid(field, "is too large to represent as a duration"));
    }
    Ok(())
}

fn invalid(field: &'static str, reason: &str) -> crate::error::Error {
    ConfigError::InvalidValue {
        field,
        reason: reason.to_string(),
    }
    .into()
}

#[allow(clippy::result_large_err)]
fn check_url(field: &'static str, raw: &str, schemes: &[&str]) -> Result<()> {
    let url = Url::parse(raw).map_err(|e| invalid(field, &e.to_string()))?;
    if !schemes.contains(&url.scheme()) {
        return Err(invalid(
            field,
            &format!("scheme must be one of {}", schemes.join(", ")),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn empty_toml_yields_defaults() {
        let config = Config::parse_toml("").unwrap();
        config.validate().unwrap();

        let settings = config.relay_settings();
        assert_eq!(settings.connect_timeout, Duration::from_secs(8));
        assert_eq!(settings.backoff, BackoffPolicy::default());
        assert_eq!(settings.poller.idle_interval, Duration::from_secs(3));
        assert_eq!(settings.poller.jitter, Duration::from_millis(600));
        assert_eq!(settings.poller.recent_push, Duration::from_millis(2500));
        assert_eq!(settings.subscriber_capacity, 64);
        assert_eq!(settings.history_size, 30);
        assert_eq!(config.index_ids().len(), 5);
    }

    #[test]
    fn toml_values_override_defaults() {
        let config = Config::parse_toml(
            r#"
            [relay]
            idle_poll_seconds = 5.0
            backoff_max_seconds = 30.0

            [upstream]
            indices = ["VNINDEX"]
            "#,
        )
        .unwrap();

        assert!((config.relay.idle_poll_seconds - 5.0).abs() < f64::EPSILON);
        assert_eq!(config.relay_settings().backoff.max(), Duration::from_secs(30));
        assert_eq!(config.index_ids(), vec![IndexId::from("VNINDEX")]);
    }

    #[test]
    fn env_overrides_apply() {
        let mut config = Config::default();
        config
            .apply_overrides(lookup(&[
                ("IDLE_POLL_SECONDS", "1.5"),
                ("BACKOFF_JITTER_SECONDS", "0"),
                ("RELAY_INDICES", "VNINDEX, VN30 ,,"),
                ("RELAY_POLL_URL", "http://localhost:9000/indices"),
            ]))
            .unwrap();

        let settings = config.relay_settings();
        assert_eq!(settings.poller.idle_interval, Duration::from_millis(1500));
        assert_eq!(settings.backoff.jitter(), Duration::ZERO);
        assert_eq!(config.upstream.indices, vec!["VNINDEX", "VN30"]);
        assert_eq!(config.upstream.poll_url, "http://localhost:9000/indices");
        config.validate().unwrap();
    }

    #[test]
    fn unparsable_override_is_rejected() {
        let mut config = Config::default();
        let err = config
            .apply_overrides(lookup(&[("BACKOFF_MIN_SECONDS", "soon")]))
            .unwrap_err();
        assert!(err.to_string().contains("BACKOFF_MIN_SECONDS"));
    }

    #[test]
    fn negative_duration_is_invalid() {
        let mut config = Config::default();
        config.relay.poll_jitter_seconds = -1.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn min_above_max_is_invalid() {
        let mut config = Config::default();
        config.relay.backoff_min_seconds = 90.0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("backoff_min_seconds"));
    }

    #[test]
    fn unrepresentable_duration_is_invalid() {
        let mut config = Config::default();
        config
            .apply_overrides(lookup(&[("IDLE_POLL_SECONDS", "1e30")]))
            .unwrap();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("idle_poll_seconds"));

        let mut config = Config::default();
        config.upstream.ws_connect_timeout_seconds = 1e30;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("ws_connect_timeout_seconds"));

        let mut config = Config::default();
        config.relay.backoff_jitter_seconds = 1e30;
        assert!(config.validate().is_err());
    }

    #[test]
    fn oversized_seconds_saturate_instead_of_collapsing_to_zero() {
        let mut config = Config::default();
        config.relay.idle_poll_seconds = 1e30;
        config.upstream.ws_connect_timeout_seconds = 1e30;

        let settings = config.relay_settings();
        assert_eq!(settings.poller.idle_interval, Duration::MAX);
        assert_eq!(settings.connect_timeout, Duration::MAX);
        assert_eq!(seconds(-1.0), Duration::ZERO);
        assert_eq!(seconds(f64::NAN), Duration::ZERO);
    }

    #[test]
    fn wrong_url_scheme_is_invalid() {
        let mut config = Config::default();
        config.upstream.ws_url = "https://example.com/ws".into();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("ws_url"));
    }

    #[test]
    fn empty_indices_is_missing() {
        let mut config = Config::default();
        config.upstream.indices.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn zero_capacity_is_invalid() {
        let mut config = Config::default();
        config.relay.subscriber_capacity = 0;
        assert!(config.validate().is_err());
    }
}
