//! Outbound adapters (driven side).

pub mod vietcap;
