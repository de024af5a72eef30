//! Vietcap market-index wire types.
//!
//! The snapshot endpoint answers with a JSON array of index items:
//!
//! ```json
//! [{"symbol":"VNINDEX","price":1268.4,"refPrice":1261.2,"advances":210,...}]
//! ```
//!
//! Push frames carry the same item shape, either alone or batched in an
//! array. Anything without a `symbol` is a keepalive.
//!
//! `time` is the exchange clock. Both paths keep it as the snapshot's
//! `observed_at` and only fall back to the local receipt time when it is
//! missing.

use chrono::{DateTime, TimeZone, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::{Breadth, RawTick};

/// Body of the snapshot request, also used as the push subscribe payload.
#[derive(Debug, Serialize)]
pub struct SymbolsRequest<'a> {
    pub symbols: &'a [String],
}

/// Push subscription request.
#[derive(Debug, Serialize)]
pub struct SubscribeMessage<'a> {
    pub action: &'static str,
    pub channel: &'static str,
    pub symbols: &'a [String],
}

impl<'a> SubscribeMessage<'a> {
    pub fn market_index(symbols: &'a [String]) -> Self {
        Self {
            action: "subscribe",
            channel: "marketIndex",
            symbols,
        }
    }
}

/// One index entry as sent by Vietcap.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexItem {
    pub symbol: String,
    #[serde(default)]
    pub price: Option<Decimal>,
    #[serde(default)]
    pub ref_price: Option<Decimal>,
    #[serde(default)]
    pub advances: Option<u32>,
    #[serde(default)]
    pub declines: Option<u32>,
    #[serde(default)]
    pub no_changes: Option<u32>,
    #[serde(default)]
    pub ceilings: Option<u32>,
    #[serde(default)]
    pub floors: Option<u32>,
    #[serde(default)]
    pub total_volume: Option<Decimal>,
    #[serde(default)]
    pub total_value: Option<Decimal>,
    /// Exchange timestamp in epoch milliseconds.
    #[serde(default)]
    pub time: Option<i64>,
}

impl IndexItem {
    /// Convert to a vendor-neutral tick. Items with neither a price nor a
    /// reference price carry no usable value and yield `None`.
    #[must_use]
    pub fn into_tick(self) -> Option<RawTick> {
        let price = self.price.or(self.ref_price)?;
        Some(RawTick {
            symbol: self.symbol,
            price,
            ref_price: self.ref_price,
            breadth: Breadth {
                advances: self.advances.unwrap_or_default(),
                declines: self.declines.unwrap_or_default(),
                no_change: self.no_changes.unwrap_or_default(),
                ceilings: self.ceilings.unwrap_or_default(),
                floors: self.floors.unwrap_or_default(),
            },
            volume: self
                .total_volume
                .and_then(|v| v.trunc().to_u64())
                .unwrap_or_default(),
            value: self.total_value.unwrap_or_default(),
            time: self.time.and_then(from_millis),
        })
    }
}

fn from_millis(ms: i64) -> Option<DateTime<Utc>> {
    Utc.timestamp_millis_opt(ms).single()
}

/// Snapshot endpoint response.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum SnapshotResponse {
    List(Vec<IndexItem>),
    Wrapped { data: Vec<IndexItem> },
}

impl SnapshotResponse {
    #[must_use]
    pub fn into_items(self) -> Vec<IndexItem> {
        match self {
            Self::List(items) | Self::Wrapped { data: items } => items,
        }
    }
}

/// Text frame received on the push connection.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum PushMessage {
    Batch(Vec<IndexItem>),
    Single(IndexItem),
    /// Keepalive or a frame we do not handle.
    Other(serde_json::Value),
}
