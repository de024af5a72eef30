//! Vietcap market-index snapshot client.
//!
//! `POST {poll_url}` with `{"symbols": [...]}` returns the current value of
//! every requested index. Used by the fallback poller only.

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ORIGIN, REFERER};
use reqwest::Client as HttpClient;
use tracing::{debug, warn};

use super::dto::{SnapshotResponse, SymbolsRequest};
use crate::domain::IndexSnapshot;
use crate::error::PollError;
use crate::port::outbound::exchange::SnapshotSource;

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// HTTP client for the market-index list endpoint.
pub struct VietcapClient {
    http: HttpClient,
    url: String,
    symbols: Vec<String>,
    timeout: Duration,
}

impl VietcapClient {
    #[must_use]
    pub fn new(url: impl Into<String>, symbols: Vec<String>, timeout: Duration) -> Self {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(ORIGIN, HeaderValue::from_static("https://trading.vietcap.com.vn"));
        headers.insert(REFERER, HeaderValue::from_static("https://trading.vietcap.com.vn/"));

        let http = HttpClient::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .build()
            .unwrap_or_else(|err| {
                warn!(error = %err, "Failed to build HTTP client, using defaults");
                HttpClient::new()
            });

        Self {
            http,
            url: url.into(),
            symbols,
            timeout,
        }
    }

    fn classify(&self, err: &reqwest::Error) -> PollError {
        if err.is_timeout() {
            PollError::Timeout(self.timeout)
        } else if err.is_decode() {
            PollError::Decode(err.to_string())
        } else {
            PollError::Transport(err.to_string())
        }
    }
}

#[async_trait]
impl SnapshotSource for VietcapClient {
    async fn poll_once(&self) -> Result<Vec<IndexSnapshot>, PollError> {
        let response = self
            .http
            .post(&self.url)
            .json(&SymbolsRequest {
                symbols: &self.symbols,
            })
            .send()
            .await
            .map_err(|e| self.classify(&e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(PollError::Http {
                status: status.as_u16(),
            });
        }

        let body = response.bytes().await.map_err(|e| self.classify(&e))?;
        let items = serde_json::from_slice::<SnapshotResponse>(&body)
            .map_err(|e| PollError::Decode(e.to_string()))?
            .into_items();

        // Only used for items the exchange did not stamp.
        let received_at = Utc::now();
        let snapshots: Vec<_> = items
            .into_iter()
            .filter_map(|item| item.into_tick())
            .map(|tick| tick.into_snapshot(received_at))
            .collect();
        debug!(count = snapshots.len(), "Fetched index snapshots");
        Ok(snapshots)
    }

    fn name(&self) -> &'static str {
        "vietcap"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Serve exactly one HTTP response and return the URL and the captured
    /// request text.
    async fn serve_once(status: &str, body: &str) -> (String, tokio::task::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}/api/price/marketIndex/getList", listener.local_addr().unwrap());
        let response = format!(
            "HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
            body.len()
        );

        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 4096];
            loop {
                let n = socket.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&buf[..n]);
                if request_complete(&request) {
                    break;
                }
            }
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.unwrap();
            String::from_utf8_lossy(&request).into_owned()
        });
        (url, handle)
    }

    fn request_complete(raw: &[u8]) -> bool {
        let text = String::from_utf8_lossy(raw);
        let Some(header_end) = text.find("\r\n\r\n") else {
            return false;
        };
        let content_length = text[..header_end]
            .lines()
            .find_map(|line| {
                let (name, value) = line.split_once(':')?;
                name.eq_ignore_ascii_case("content-length")
                    .then(|| value.trim().parse::<usize>().ok())
                    .flatten()
            })
            .unwrap_or(0);
        raw.len() >= header_end + 4 + content_length
    }

    fn symbols() -> Vec<String> {
        vec!["VNINDEX".into(), "HNXIndex".into()]
    }

    #[tokio::test]
    async fn posts_symbols_and_parses_items() {
        let (url, server) = serve_once(
            "200 OK",
            r#"[{"symbol":"VNINDEX","price":1268.4,"refPrice":1261.2},{"symbol":"HNXIndex","price":231.5},{"symbol":"BAD"}]"#,
        )
        .await;

        let client = VietcapClient::new(url, symbols(), Duration::from_secs(3));
        let snapshots = client.poll_once().await.unwrap();
        let request = server.await.unwrap();

        assert!(request.starts_with("POST /api/price/marketIndex/getList"));
        assert!(request.contains(r#"{"symbols":["VNINDEX","HNXIndex"]}"#));
        assert_eq!(snapshots.len(), 2);
        assert_eq!(snapshots[0].index_id().as_str(), "VNINDEX");
        assert_eq!(snapshots[1].index_id().as_str(), "HNXINDEX");
    }

    #[tokio::test]
    async fn non_success_status_is_http_error() {
        let (url, server) = serve_once("503 Service Unavailable", "{}").await;

        let client = VietcapClient::new(url, symbols(), Duration::from_secs(3));
        let err = client.poll_once().await.unwrap_err();
        server.await.unwrap();

        assert_eq!(err, PollError::Http { status: 503 });
    }

    #[tokio::test]
    async fn malformed_body_is_decode_error() {
        let (url, server) = serve_once("200 OK", "not json").await;

        let client = VietcapClient::new(url, symbols(), Duration::from_secs(3));
        let err = client.poll_once().await.unwrap_err();
        server.await.unwrap();

        assert!(matches!(err, PollError::Decode(_)));
    }

    #[tokio::test]
    async fn unreachable_endpoint_is_transport_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}/", listener.local_addr().unwrap());
        drop(listener);

        let client = VietcapClient::new(url, symbols(), Duration::from_secs(3));
        let err = client.poll_once().await.unwrap_err();
        assert!(matches!(err, PollError::Transport(_)));
    }
}
