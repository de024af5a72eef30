//! Vietcap WebSocket push connector.
//!
//! One `connect` call opens one socket and sends the market-index
//! subscription. The resulting session yields one [`RawEvent::Tick`] per index
//! item; batched frames are buffered and drained before the socket is read
//! again.

use std::collections::VecDeque;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, trace, warn};

use super::dto::{PushMessage, SubscribeMessage};
use crate::domain::{RawEvent, RawTick};
use crate::error::ConnectError;
use crate::port::outbound::exchange::{ConnectedHandle, PushConnector, PushSession};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Opens push sessions against the Vietcap market-index feed.
pub struct VietcapConnector {
    url: String,
    symbols: Vec<String>,
}

impl VietcapConnector {
    #[must_use]
    pub fn new(url: impl Into<String>, symbols: Vec<String>) -> Self {
        Self {
            url: url.into(),
            symbols,
        }
    }

    async fn handshake(&self) -> Result<WsStream, ConnectError> {
        let (mut ws, response) = connect_async(self.url.as_str())
            .await
            .map_err(classify)?;
        debug!(status = %response.status(), "WebSocket handshake complete");

        let payload = serde_json::to_string(&SubscribeMessage::market_index(&self.symbols))
            .map_err(|e| ConnectError::Protocol(e.to_string()))?;
        ws.send(Message::Text(payload)).await.map_err(classify)?;
        info!(symbols = ?self.symbols, "Subscribed to market indices");

        Ok(ws)
    }
}

#[async_trait]
impl PushConnector for VietcapConnector {
    async fn connect(&self, timeout: Duration) -> Result<ConnectedHandle, ConnectError> {
        info!(url = %self.url, "Connecting to WebSocket");
        let ws = tokio::time::timeout(timeout, self.handshake())
            .await
            .map_err(|_| ConnectError::Timeout(timeout))??;
        Ok(Box::new(VietcapSession::new(ws)))
    }

    fn name(&self) -> &'static str {
        "vietcap"
    }
}

/// Map a handshake failure onto the connect taxonomy.
fn classify(err: tungstenite::Error) -> ConnectError {
    match err {
        tungstenite::Error::Http(response) => {
            ConnectError::Refused(format!("HTTP {}", response.status()))
        }
        tungstenite::Error::Io(e) if e.kind() == std::io::ErrorKind::ConnectionRefused => {
            ConnectError::Refused(e.to_string())
        }
        other => ConnectError::Protocol(other.to_string()),
    }
}

/// Live push session. Finished once the socket is gone.
pub struct VietcapSession {
    ws: Option<WsStream>,
    pending: VecDeque<RawTick>,
}

impl VietcapSession {
    fn new(ws: WsStream) -> Self {
        Self {
            ws: Some(ws),
            pending: VecDeque::new(),
        }
    }

    fn terminate(&mut self, reason: String) -> Option<RawEvent> {
        self.ws = None;
        Some(RawEvent::Disconnect { reason })
    }
}

#[async_trait]
impl PushSession for VietcapSession {
    async fn receive(&mut self) -> Option<RawEvent> {
        if let Some(tick) = self.pending.pop_front() {
            return Some(RawEvent::Tick(tick));
        }

        loop {
            let ws = self.ws.as_mut()?;
            let frame = match ws.next().await {
                Some(frame) => frame,
                None => {
                    self.ws = None;
                    return None;
                }
            };

            match frame {
                Ok(Message::Text(text)) => {
                    trace!(bytes = text.len(), "Received WebSocket text frame");
                    let items = match serde_json::from_str::<PushMessage>(&text) {
                        Ok(PushMessage::Batch(items)) => items,
                        Ok(PushMessage::Single(item)) => vec![item],
                        Ok(PushMessage::Other(_)) => return Some(RawEvent::Heartbeat),
                        Err(e) => {
                            warn!(error = %e, bytes = text.len(), "Failed to parse message");
                            continue;
                        }
                    };
                    self.pending
                        .extend(items.into_iter().filter_map(|item| item.into_tick()));
                    if let Some(tick) = self.pending.pop_front() {
                        return Some(RawEvent::Tick(tick));
                    }
                }
                Ok(Message::Ping(data)) => {
                    trace!("Received WebSocket ping");
                    if let Err(e) = ws.send(Message::Pong(data)).await {
                        return self.terminate(format!("failed to send pong: {e}"));
                    }
                }
                Ok(Message::Close(frame)) => {
                    info!(frame = ?frame, "WebSocket closed by server");
                    let reason = frame
                        .map(|f| f.reason.to_string())
                        .unwrap_or_else(|| "closed by server".to_string());
                    return self.terminate(reason);
                }
                Ok(_) => continue,
                Err(e) => {
                    warn!(error = %e, "WebSocket error");
                    return self.terminate(e.to_string());
                }
            }
        }
    }

    async fn close(&mut self) {
        if let Some(mut ws) = self.ws.take() {
            if let Err(e) = ws.close(None).await {
                debug!(error = %e, "WebSocket close failed");
            }
        }
        self.pending.clear();
    }
}
