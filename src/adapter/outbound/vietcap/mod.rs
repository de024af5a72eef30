//! Vietcap market-index integration: WebSocket push and HTTP snapshot
//! polling.

pub mod client;
pub mod dto;
pub mod stream;

pub use client::VietcapClient;
pub use stream::{VietcapConnector, VietcapSession};
