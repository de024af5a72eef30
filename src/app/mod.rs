//! Application layer: configuration and wiring.

mod config;
mod wiring;

pub use config::{Config, LoggingConfig, RelayConfig, UpstreamConfig};
pub use wiring::{build_relay, start_relay};
