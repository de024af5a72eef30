//! Shared test utilities available to both unit and integration tests.
//!
//! Enabled via `#[cfg(test)]` (unit tests) or the `testkit` feature
//! (integration tests).
//!
//! # Modules
//!
//! - [`stream`] - Mock [`PushConnector`](crate::port::outbound::exchange::PushConnector)
//!   implementations: `ScriptedConnector`, `ChannelConnector`.
//! - [`source`] - Mock snapshot source: `ScriptedSource`.
//! - [`domain`] - Builders for snapshots and raw events.
//! - [`config`] - Canonical test configurations.

pub mod config;
pub mod domain;
pub mod source;
pub mod stream;
