//! Canonical index snapshot delivered to subscribers.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use super::id::IndexId;

/// Market breadth counters for one index at one point in time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Breadth {
    pub advances: u32,
    pub declines: u32,
    pub no_change: u32,
    pub ceilings: u32,
    pub floors: u32,
}

/// One immutable, fully-populated observation of an index.
///
/// Fields are private; construction goes through [`SnapshotBuilder`] so a
/// snapshot cannot be altered after it has been handed to the hub.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndexSnapshot {
    index_id: IndexId,
    current_value: Decimal,
    previous_value: Decimal,
    #[serde(flatten)]
    breadth: Breadth,
    volume: u64,
    traded_value: Decimal,
    observed_at: DateTime<Utc>,
}

impl IndexSnapshot {
    /// Start building a snapshot for `index_id` observed at `observed_at`.
    pub fn builder(index_id: impl Into<IndexId>, observed_at: DateTime<Utc>) -> SnapshotBuilder {
        SnapshotBuilder {
            index_id: index_id.into(),
            observed_at,
            current_value: Decimal::ZERO,
            previous_value: None,
            breadth: Breadth::default(),
            volume: 0,
            traded_value: Decimal::ZERO,
        }
    }

    #[must_use]
    pub fn index_id(&self) -> &IndexId {
        &self.index_id
    }

    #[must_use]
    pub fn current_value(&self) -> Decimal {
        self.current_value
    }

    /// Reference (previous session close) value.
    #[must_use]
    pub fn previous_value(&self) -> Decimal {
        self.previous_value
    }

    #[must_use]
    pub fn breadth(&self) -> Breadth {
        self.breadth
    }

    #[must_use]
    pub fn volume(&self) -> u64 {
        self.volume
    }

    #[must_use]
    pub fn traded_value(&self) -> Decimal {
        self.traded_value
    }

    #[must_use]
    pub fn observed_at(&self) -> DateTime<Utc> {
        self.observed_at
    }

    /// Absolute change against the previous value.
    #[must_use]
    pub fn change(&self) -> Decimal {
        self.current_value - self.previous_value
    }

    /// Percentage change against the previous value, rounded to 2 dp.
    ///
    /// `None` when the previous value is zero.
    #[must_use]
    pub fn change_percent(&self) -> Option<Decimal> {
        if self.previous_value.is_zero() {
            return None;
        }
        Some((self.change() / self.previous_value * Decimal::ONE_HUNDRED).round_dp(2))
    }

    /// Whether this snapshot strictly supersedes `other` for the same index.
    #[must_use]
    pub fn is_newer_than(&self, other: &IndexSnapshot) -> bool {
        self.observed_at > other.observed_at
    }
}

/// Builder for [`IndexSnapshot`].
#[derive(Debug, Clone)]
#[must_use]
pub struct SnapshotBuilder {
    index_id: IndexId,
    observed_at: DateTime<Utc>,
    current_value: Decimal,
    previous_value: Option<Decimal>,
    breadth: Breadth,
    volume: u64,
    traded_value: Decimal,
}

impl SnapshotBuilder {
    pub fn current_value(mut self, value: Decimal) -> Self {
        self.current_value = value;
        self
    }

    pub fn previous_value(mut self, value: Decimal) -> Self {
        self.previous_value = Some(value);
        self
    }

    pub fn breadth(mut self, breadth: Breadth) -> Self {
        self.breadth = breadth;
        self
    }

    pub fn volume(mut self, volume: u64) -> Self {
        self.volume = volume;
        self
    }

    pub fn traded_value(mut self, value: Decimal) -> Self {
        self.traded_value = value;
        self
    }

    /// Finish the snapshot. A missing previous value falls back to the
    /// current value (zero change).
    pub fn build(self) -> IndexSnapshot {
        IndexSnapshot {
            index_id: self.index_id,
            current_value: self.current_value,
            previous_value: self.previous_value.unwrap_or(self.current_value),
            breadth: self.breadth,
            volume: self.volume,
            traded_value: self.traded_value,
            observed_at: self.observed_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    #[test]
    fn change_and_percent() {
        let snap = IndexSnapshot::builder("VNINDEX", at(0))
            .current_value(dec!(1250.50))
            .previous_value(dec!(1240.00))
            .build();

        assert_eq!(snap.change(), dec!(10.50));
        assert_eq!(snap.change_percent(), Some(dec!(0.85)));
    }

    #[test]
    fn missing_previous_defaults_to_current() {
        let snap = IndexSnapshot::builder("VN30", at(0))
            .current_value(dec!(1300))
            .build();

        assert_eq!(snap.previous_value(), dec!(1300));
        assert_eq!(snap.change(), Decimal::ZERO);
    }

    #[test]
    fn zero_previous_has_no_percent() {
        let snap = IndexSnapshot::builder("VN30", at(0))
            .current_value(dec!(10))
            .previous_value(Decimal::ZERO)
            .build();
        assert!(snap.change_percent().is_none());
    }

    #[test]
    fn newer_is_strict() {
        let a = IndexSnapshot::builder("VNINDEX", at(1)).build();
        let b = IndexSnapshot::builder("VNINDEX", at(1)).build();
        let c = IndexSnapshot::builder("VNINDEX", at(2)).build();

        assert!(!a.is_newer_than(&b));
        assert!(c.is_newer_than(&a));
    }

    #[test]
    fn serializes_flat_breadth() {
        let snap = IndexSnapshot::builder("VNINDEX", at(0))
            .breadth(Breadth {
                advances: 200,
                declines: 150,
                no_change: 50,
                ceilings: 3,
                floors: 1,
            })
            .build();
        let json = serde_json::to_value(&snap).unwrap();

        assert_eq!(json["index_id"], "VNINDEX");
        assert_eq!(json["advances"], 200);
        assert_eq!(json["floors"], 1);
    }
}
