use std::time::Duration;

use thiserror::Error;

/// Configuration-related errors with structured variants.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("missing required field: {field}")]
    MissingField { field: &'static str },

    #[error("invalid value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },

    #[error("failed to read config file: {0}")]
    ReadFile(#[source] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[source] toml::de::Error),
}

/// Failure to establish the upstream push connection.
///
/// Every variant is recoverable: the relay core schedules another attempt
/// according to its backoff policy.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConnectError {
    #[error("handshake did not complete within {0:?}")]
    Timeout(Duration),

    #[error("connection refused by upstream: {0}")]
    Refused(String),

    #[error("protocol error during connect: {0}")]
    Protocol(String),
}

/// Failure of a single fallback poll. Logged and retried on the next tick,
/// never escalated to the relay core.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PollError {
    #[error("snapshot request timed out after {0:?}")]
    Timeout(Duration),

    #[error("snapshot endpoint returned HTTP {status}")]
    Http { status: u16 },

    #[error("snapshot request failed: {0}")]
    Transport(String),

    #[error("failed to decode snapshot response: {0}")]
    Decode(String),
}

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
