//! Builders for domain primitives used across tests.
//!
//! Timestamps are given as seconds after a fixed base instant so tests can
//! express ordering with small integers.

use chrono::{DateTime, TimeZone, Utc};
use rust_decimal::Decimal;

use crate::domain::{IndexSnapshot, RawEvent, RawTick};

/// Base instant for `secs` offsets.
pub const BASE_EPOCH: i64 = 1_700_000_000;

/// `BASE_EPOCH + secs` as a UTC timestamp.
pub fn at(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(BASE_EPOCH + secs, 0)
        .single()
        .unwrap_or_default()
}

/// Snapshot of `index` observed at `at(secs)` with value 1000.
pub fn snapshot(index: &str, secs: i64) -> IndexSnapshot {
    snapshot_with_value(index, secs, Decimal::from(1000))
}

pub fn snapshot_with_value(index: &str, secs: i64, value: Decimal) -> IndexSnapshot {
    IndexSnapshot::builder(index, at(secs))
        .current_value(value)
        .build()
}

/// Upstream tick for `index` stamped at `at(secs)`.
pub fn tick(index: &str, secs: i64) -> RawEvent {
    RawEvent::Tick(RawTick {
        symbol: index.to_string(),
        price: Decimal::from(1000),
        time: Some(at(secs)),
        ..Default::default()
    })
}

/// Create a [`Disconnect`](RawEvent::Disconnect) event.
pub fn disconnect(reason: &str) -> RawEvent {
    RawEvent::Disconnect {
        reason: reason.to_string(),
    }
}
