//! Upstream exchange endpoints.

use serde::Deserialize;

/// Vietcap market-index endpoints and the indices to follow.
#[derive(Debug, Clone, Deserialize)]
pub struct UpstreamConfig {
    /// Push endpoint (WebSocket).
    #[serde(default = "default_ws_url")]
    pub ws_url: String,
    /// Snapshot endpoint used by the fallback poller.
    #[serde(default = "default_poll_url")]
    pub poll_url: String,
    /// Index symbols as the exchange spells them.
    #[serde(default = "default_indices")]
    pub indices: Vec<String>,
    /// Handshake bound for one connect attempt.
    #[serde(default = "default_ws_connect_timeout_seconds")]
    pub ws_connect_timeout_seconds: f64,
    /// Bound for one snapshot request.
    #[serde(default = "default_poll_timeout_seconds")]
    pub poll_timeout_seconds: f64,
}

fn default_ws_url() -> String {
    "wss://trading.vietcap.com.vn/ws/price".into()
}

fn default_poll_url() -> String {
    "https://trading.vietcap.com.vn/api/price/marketIndex/getList".into()
}

pub(crate) fn default_indices() -> Vec<String> {
    ["VNINDEX", "VN30", "HNXIndex", "HNX30", "HNXUpcomIndex"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_ws_connect_timeout_seconds() -> f64 {
    8.0
}

fn default_poll_timeout_seconds() -> f64 {
    3.0
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            ws_url: default_ws_url(),
            poll_url: default_poll_url(),
            indices: default_indices(),
            ws_connect_timeout_seconds: default_ws_connect_timeout_seconds(),
            poll_timeout_seconds: default_poll_timeout_seconds(),
        }
    }
}
