//! indexrelay - realtime market-index relay.
//!
//! Holds one authoritative push connection to the exchange, fans index
//! snapshots out to any number of in-process subscribers, and covers push
//! outages by polling the exchange's snapshot endpoint.
//!
//! # Architecture
//!
//! ```text
//! adapter (Vietcap WS / HTTP) ──▶ port traits ──▶ runtime
//!                                                  ├─ relay core (state machine, backoff)
//!                                                  ├─ fallback poller
//!                                                  └─ broadcast hub ──▶ subscribers
//! ```
//!
//! # Modules
//!
//! - [`domain`] - Snapshots, raw events, connection and backoff state
//! - [`port`] - Traits at the upstream seams
//! - [`adapter`] - Vietcap implementations of those traits
//! - [`runtime`] - Relay core, poller, hub and subscription registry
//! - [`app`] - Configuration loading and wiring
//! - [`cli`] - Command-line interface
//! - [`error`] - Error types for the crate
//!
//! # Example
//!
//! ```no_run
//! use std::time::Duration;
//! use indexrelay::app::{self, Config};
//!
//! # async fn demo() -> indexrelay::error::Result<()> {
//! let config = Config::load_or_default("config.toml")?;
//! let relay = app::start_relay(&config);
//! let mut subscription = relay.subscribe();
//! while let Some(snapshot) = subscription.recv().await {
//!     println!("{} {}", snapshot.index_id(), snapshot.current_value());
//! }
//! relay.shutdown().await;
//! # Ok(())
//! # }
//! ```

pub mod adapter;
pub mod app;
pub mod cli;
pub mod domain;
pub mod error;
pub mod port;
pub mod runtime;

#[cfg(any(test, feature = "testkit"))]
pub mod testkit;
