//! End-to-end relay tests against local push and poll endpoints.

use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use indexrelay::app::{self, Config};
use indexrelay::domain::{ConnectionState, IndexId};
use indexrelay::runtime::{Origin, Relay, SnapshotLookup};
use indexrelay::testkit;
use indexrelay::testkit::source::ScriptedSource;
use indexrelay::testkit::stream::ChannelConnector;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::Barrier;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;

const WAIT: Duration = Duration::from_secs(5);

/// Accept one push client, check its subscription and send `frames`, then
/// keep the socket open until the client goes away.
async fn push_server(frames: Vec<&'static str>) -> (String, JoinHandle<()>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("ws://{}/ws", listener.local_addr().unwrap());

    let handle = tokio::spawn(async move {
        let (socket, _) = listener.accept().await.unwrap();
        let mut ws = tokio_tungstenite::accept_async(socket).await.unwrap();

        let subscribe = ws.next().await.unwrap().unwrap();
        assert!(subscribe.to_text().unwrap().contains("\"subscribe\""));

        for frame in frames {
            ws.send(Message::Text(frame.to_string())).await.unwrap();
        }
        while let Some(Ok(_)) = ws.next().await {}
    });
    (url, handle)
}

/// Answer every HTTP request with `body`.
async fn poll_server(body: &'static str) -> (String, JoinHandle<()>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("http://{}/api/price/marketIndex/getList", listener.local_addr().unwrap());

    let handle = tokio::spawn(async move {
        loop {
            let Ok((mut socket, _)) = listener.accept().await else {
                return;
            };
            tokio::spawn(async move {
                let mut buf = [0u8; 4096];
                let _ = socket.read(&mut buf).await;
                let response = format!(
                    "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                    body.len()
                );
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            });
        }
    });
    (url, handle)
}

async fn closed_port_url(scheme: &str) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("{scheme}://{}/", listener.local_addr().unwrap());
    drop(listener);
    url
}

fn fast_config(ws_url: String, poll_url: String) -> Config {
    let mut config = testkit::config::app();
    config.upstream.ws_url = ws_url;
    config.upstream.poll_url = poll_url;
    config.upstream.indices = vec!["VNINDEX".into(), "VN30".into()];
    config.upstream.ws_connect_timeout_seconds = 1.0;
    config.upstream.poll_timeout_seconds = 1.0;
    config.relay.idle_poll_seconds = 0.2;
    config.relay.poll_jitter_seconds = 0.0;
    config.relay.backoff_jitter_seconds = 0.0;
    config.relay.shutdown_grace_seconds = 0.5;
    config.validate().expect("test config is valid");
    config
}

#[tokio::test]
async fn push_ticks_reach_subscribers() {
    let (ws_url, server) = push_server(vec![
        r#"[{"symbol":"VNINDEX","price":1268.4,"time":1700000000000},{"symbol":"VN30","price":1301.2,"time":1700000000000}]"#,
        r#"{"type":"ping"}"#,
        r#"{"symbol":"VNINDEX","price":1270.1,"time":1700000001000}"#,
    ])
    .await;
    let poll_url = closed_port_url("http").await;

    let relay = app::start_relay(&fast_config(ws_url, poll_url));
    let mut subscription = relay.subscribe();

    let mut received = Vec::new();
    for _ in 0..3 {
        let snapshot = tokio::time::timeout(WAIT, subscription.recv())
            .await
            .expect("snapshot in time")
            .expect("subscription open");
        received.push(snapshot);
    }

    assert_eq!(received[0].index_id().as_str(), "VNINDEX");
    assert_eq!(received[1].index_id().as_str(), "VN30");
    assert_eq!(received[2].index_id().as_str(), "VNINDEX");
    assert!(received[2].is_newer_than(&received[0]));
    assert_eq!(relay.state(), ConnectionState::Connected);
    assert_eq!(relay.status().last_source, Some(Origin::Push));

    relay.shutdown().await;
    assert_eq!(relay.state(), ConnectionState::Disconnected);
    tokio::time::timeout(WAIT, server)
        .await
        .expect("server saw the close")
        .unwrap();
}

#[tokio::test]
async fn polling_covers_unreachable_push() {
    let ws_url = closed_port_url("ws").await;
    let (poll_url, server) = poll_server(
        r#"[{"symbol":"VNINDEX","price":1268.4,"refPrice":1261.2,"time":1700000000000}]"#,
    )
    .await;

    let relay = app::start_relay(&fast_config(ws_url, poll_url));

    let lookup = relay
        .snapshot_within(&IndexId::from("VNINDEX"), WAIT)
        .await;
    let snapshot = lookup.ready().expect("polled snapshot");
    assert_eq!(snapshot.previous_value().to_string(), "1261.2");
    assert_ne!(relay.state(), ConnectionState::Connected);
    assert_eq!(relay.status().last_source, Some(Origin::Poll));

    // Same observed_at on every poll: later polls are dropped as stale.
    tokio::time::sleep(Duration::from_millis(700)).await;
    let stats = relay.stats();
    assert_eq!(stats.delivered, 1);
    assert!(stats.polls_issued >= 2);
    assert!(stats.ordering_violations >= 1);

    relay.shutdown().await;
    server.abort();
}

#[tokio::test]
async fn no_upstream_at_all_is_fail_open() {
    let ws_url = closed_port_url("ws").await;
    let poll_url = closed_port_url("http").await;

    let relay = app::start_relay(&fast_config(ws_url, poll_url));
    let lookup = relay
        .snapshot_within(&IndexId::from("VNINDEX"), Duration::from_millis(300))
        .await;

    assert_eq!(lookup, SnapshotLookup::NoDataYet);
    assert!(relay.latest_all().is_empty());

    tokio::time::sleep(Duration::from_millis(500)).await;
    assert!(relay.stats().poll_failures >= 1);

    relay.shutdown().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn hundred_concurrent_subscribers_each_get_every_tick_once() {
    const SUBSCRIBERS: usize = 100;
    let (connector, control) = ChannelConnector::new(true);
    let relay = Arc::new(
        Relay::new(
            Arc::new(connector),
            Arc::new(ScriptedSource::new()),
            testkit::config::relay(),
        )
        .start(),
    );
    let mut link = relay.watch_state();
    tokio::time::timeout(WAIT, link.wait_for(|l| l.state == ConnectionState::Connected))
        .await
        .expect("connected in time")
        .unwrap();

    let ready = Arc::new(Barrier::new(SUBSCRIBERS + 1));
    let readers: Vec<_> = (0..SUBSCRIBERS)
        .map(|_| {
            let relay = Arc::clone(&relay);
            let ready = Arc::clone(&ready);
            tokio::spawn(async move {
                let mut subscription = relay.subscribe();
                ready.wait().await;

                let mut received = Vec::new();
                for _ in 0..3 {
                    let snapshot = tokio::time::timeout(WAIT, subscription.recv())
                        .await
                        .expect("snapshot in time")
                        .expect("subscription open");
                    received.push(snapshot.observed_at());
                }
                tokio::time::sleep(Duration::from_millis(100)).await;
                assert!(subscription.try_recv().is_none(), "duplicate delivery");
                received
            })
        })
        .collect();

    ready.wait().await;
    for secs in 1..=3 {
        assert!(control.send(testkit::domain::tick("VNINDEX", secs)));
    }

    let expected: Vec<_> = (1..=3).map(testkit::domain::at).collect();
    for reader in readers {
        assert_eq!(reader.await.unwrap(), expected);
    }
    assert_eq!(relay.stats().delivered, 3);
    assert_eq!(relay.stats().backpressure_drops, 0);

    relay.shutdown().await;
}
