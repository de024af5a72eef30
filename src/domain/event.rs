//! Events produced by an upstream push session.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use super::id::IndexId;
use super::snapshot::{Breadth, IndexSnapshot};

/// Vendor-neutral index tick as decoded at the connector boundary.
///
/// Adapters fill in what the vendor sends; anything missing stays at its
/// default and `time` falls back to the receipt time on conversion.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RawTick {
    pub symbol: String,
    pub price: Decimal,
    pub ref_price: Option<Decimal>,
    pub breadth: Breadth,
    pub volume: u64,
    pub value: Decimal,
    pub time: Option<DateTime<Utc>>,
}

impl RawTick {
    /// Convert into a canonical snapshot.
    ///
    /// `observed_at` is the exchange timestamp when the upstream stamped the
    /// tick, otherwise `received_at`. Push and poll both convert through
    /// here, so a stamped item gets the same `observed_at` from either path.
    /// Unstamped items fall back to the local clock, and the ordering gate
    /// then compares exchange time against receipt time for that index.
    pub fn into_snapshot(self, received_at: DateTime<Utc>) -> IndexSnapshot {
        let mut builder = IndexSnapshot::builder(IndexId::new(self.symbol), self.time.unwrap_or(received_at))
            .current_value(self.price)
            .breadth(self.breadth)
            .volume(self.volume)
            .traded_value(self.value);
        if let Some(reference) = self.ref_price {
            builder = builder.previous_value(reference);
        }
        builder.build()
    }
}

/// Closed set of events a push session can yield.
#[derive(Debug, Clone, PartialEq)]
pub enum RawEvent {
    /// An index update.
    Tick(RawTick),
    /// Keepalive with no data.
    Heartbeat,
    /// Terminal: the session is over and must not be polled again.
    Disconnect { reason: String },
}

impl RawEvent {
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Disconnect { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    #[test]
    fn tick_without_time_uses_receipt_time() {
        let received = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        let tick = RawTick {
            symbol: "vnindex".into(),
            price: dec!(1201.5),
            ref_price: Some(dec!(1200)),
            ..Default::default()
        };

        let snap = tick.into_snapshot(received);
        assert_eq!(snap.index_id().as_str(), "VNINDEX");
        assert_eq!(snap.observed_at(), received);
        assert_eq!(snap.change(), dec!(1.5));
    }

    #[test]
    fn tick_time_wins_over_receipt_time() {
        let stamped = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        let received = Utc.timestamp_opt(1_700_000_005, 0).unwrap();
        let tick = RawTick {
            symbol: "VN30".into(),
            time: Some(stamped),
            ..Default::default()
        };

        assert_eq!(tick.into_snapshot(received).observed_at(), stamped);
    }

    #[test]
    fn only_disconnect_is_terminal() {
        assert!(RawEvent::Disconnect { reason: "x".into() }.is_terminal());
        assert!(!RawEvent::Heartbeat.is_terminal());
    }
}
