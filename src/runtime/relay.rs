//! Relay core: single-writer state machine over the upstream link.
//!
//! Only the core task mutates [`ConnectionState`] and [`BackoffState`]. Both
//! are published through a `watch` channel so the poller and callers can
//! read them without sharing ownership.
//!
//! ```text
//! Disconnected ─▶ Connecting ──ok──▶ Connected ──disconnect──┐
//!                    ▲   │                                   │
//!                    │   └─fail/timeout─▶ Backoff ◀──────────┘
//!                    └──── timer elapsed ───┘
//! any state ── shutdown ──▶ Disconnected (terminal)
//! ```

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, trace, warn};

use super::hub::{BroadcastHub, Origin, SnapshotLookup};
use super::poller::{FallbackPoller, PollerHandle};
use super::registry::Subscription;
use super::settings::RelaySettings;
use super::stats::RelayStats;
use super::status::{LinkStatus, RelayStatus};
use crate::domain::{BackoffState, ConnectionState, IndexId, IndexSnapshot, RawEvent, SubscriberId};
use crate::error::ConnectError;
use crate::port::outbound::exchange::{ConnectedHandle, PushConnector, SnapshotSource};


/// Unstarted relay.
pub struct Relay {
    connector: Arc<dyn PushConnector>,
    source: Arc<dyn SnapshotSource>,
    settings: RelaySettings,
}

impl Relay {
    pub fn new(
        connector: Arc<dyn PushConnector>,
        source: Arc<dyn SnapshotSource>,
        settings: RelaySettings,
    ) -> Self {
        Self {
            connector,
            source,
            settings,
        }
    }

    /// Spawn the core task and return a handle to it.
    ///
    /// Must be called inside a tokio runtime.
    pub fn start(self) -> RelayHandle {
        let hub = Arc::new(BroadcastHub::new(
            self.settings.subscriber_capacity,
            self.settings.history_size,
        ));
        let (link_tx, link_rx) = watch::channel(LinkStatus::default());
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let rng = match self.settings.rng_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        let core = RelayCore {
            connector: self.connector,
            source: self.source,
            settings: self.settings.clone(),
            hub: Arc::clone(&hub),
            link: link_tx,
            shutdown: shutdown_rx,
            backoff: BackoffState::default(),
            rng,
            poller: None,
        };
        let join = tokio::spawn(core.run());

        RelayHandle {
            hub,
            link: link_rx,
            shutdown: shutdown_tx,
            core: Mutex::new(Some(join)),
            settings: self.settings,
            started_at: Instant::now(),
        }
    }
}

/// How a connected session ended.
enum SessionEnd {
    Shutdown,
    Disconnected(String),
}

struct RelayCore {
    connector: Arc<dyn PushConnector>,
    source: Arc<dyn SnapshotSource>,
    settings: RelaySettings,
    hub: Arc<BroadcastHub>,
    link: watch::Sender<LinkStatus>,
    shutdown: watch::Receiver<bool>,
    backoff: BackoffState,
    rng: StdRng,
    poller: Option<PollerHandle>,
}

impl RelayCore {
    async fn run(mut self) {
        info!(upstream = self.connector.name(), "Relay started");

        loop {
            self.set_state(ConnectionState::Connecting);

            let Some(attempt) = self.connect().await else {
                break;
            };

            match attempt {
                Ok(session) => {
                    self.stop_poller().await;
                    self.backoff.reset();
                    self.set_state(ConnectionState::Connected);
                    info!(upstream = self.connector.name(), "Push connected");

                    match self.pump(session).await {
                        SessionEnd::Shutdown => break,
                        SessionEnd::Disconnected(reason) => {
                            warn!(upstream = self.connector.name(), %reason, "Push disconnected");
                        }
                    }
                }
                Err(e) => {
                    warn!(
                        upstream = self.connector.name(),
                        attempt = self.backoff.attempt_count + 1,
                        error = %e,
                        "Connect failed"
                    );
                }
            }

            if !self.back_off().await {
                break;
            }
        }

        self.stop_poller().await;
        self.set_state(ConnectionState::Disconnected);
        info!(upstream = self.connector.name(), "Relay stopped");
    }

    /// One connect attempt, bounded by the connect timeout. `None` on
    /// shutdown.
    async fn connect(&mut self) -> Option<Result<ConnectedHandle, ConnectError>> {
        self.hub.counters().record_connect_attempt();
        let timeout = self.settings.connect_timeout;
        debug!(upstream = self.connector.name(), timeout_ms = timeout.as_millis() as u64, "Connecting");

        let attempt = tokio::time::timeout(timeout, self.connector.connect(timeout));
        tokio::select! {
            biased;
            () = shutdown_requested(&mut self.shutdown) => None,
            result = attempt => Some(result.unwrap_or(Err(ConnectError::Timeout(timeout)))),
        }
    }

    /// Forward session events to the hub until the session ends.
    /// The session is always closed before returning.
    async fn pump(&mut self, mut session: ConnectedHandle) -> SessionEnd {
        let end = loop {
            let event = tokio::select! {
                biased;
                () = shutdown_requested(&mut self.shutdown) => break SessionEnd::Shutdown,
                event = session.receive() => event,
            };

            match event {
                Some(RawEvent::Tick(tick)) => {
                    let snapshot = tick.into_snapshot(Utc::now());
                    self.hub.publish(snapshot, Origin::Push);
                }
                Some(RawEvent::Heartbeat) => trace!("Heartbeat"),
                Some(RawEvent::Disconnect { reason }) => break SessionEnd::Disconnected(reason),
                None => break SessionEnd::Disconnected("stream ended".to_string()),
            }
        };

        let grace = self.settings.shutdown_grace;
        if tokio::time::timeout(grace, session.close()).await.is_err() {
            warn!(grace_ms = grace.as_millis() as u64, "Session close timed out, abandoning connection");
        }
        end
    }

    /// Arm the backoff timer and wait for it. Returns `false` on shutdown.
    async fn back_off(&mut self) -> bool {
        let delay = self
            .settings
            .backoff
            .next(self.backoff.attempt_count, &mut self.rng);
        self.backoff.record_failure(delay);
        self.set_state(ConnectionState::Backoff);
        self.ensure_poller();

        info!(
            attempt = self.backoff.attempt_count,
            delay_ms = delay.as_millis() as u64,
            "Reconnect scheduled"
        );

        tokio::select! {
            biased;
            () = shutdown_requested(&mut self.shutdown) => false,
            () = tokio::time::sleep(delay) => true,
        }
    }

    fn ensure_poller(&mut self) {
        if self.poller.is_some() {
            return;
        }
        let poller = FallbackPoller::new(
            Arc::clone(&self.source),
            Arc::clone(&self.hub),
            self.link.subscribe(),
            self.settings.poller,
            StdRng::seed_from_u64(self.rng.gen()),
        );
        self.poller = Some(poller.spawn());
    }

    async fn stop_poller(&mut self) {
        if let Some(poller) = self.poller.take() {
            poller.stop(self.settings.shutdown_grace).await;
        }
    }

    fn set_state(&self, state: ConnectionState) {
        let previous = self.link.send_replace(LinkStatus {
            state,
            backoff: self.backoff,
        });
        if previous.state != state {
            debug!(from = %previous.state, to = %state, "Link state changed");
        }
    }
}

/// Resolves once shutdown was requested or the handle is gone.
async fn shutdown_requested(rx: &mut watch::Receiver<bool>) {
    let _ = rx.wait_for(|stop| *stop).await;
}

/// Handle to a running relay. Dropping it also stops the relay.
pub struct RelayHandle {
    hub: Arc<BroadcastHub>,
    link: watch::Receiver<LinkStatus>,
    shutdown: watch::Sender<bool>,
    core: Mutex<Option<JoinHandle<()>>>,
    settings: RelaySettings,
    started_at: Instant,
}

impl RelayHandle {
    /// Join as a downstream subscriber. Only snapshots observed after this
    /// call are delivered.
    pub fn subscribe(&self) -> Subscription {
        self.hub.subscribe()
    }

    pub fn unsubscribe(&self, id: SubscriberId) -> bool {
        self.hub.unsubscribe(id)
    }

    #[must_use]
    pub fn state(&self) -> ConnectionState {
        self.link.borrow().state
    }

    #[must_use]
    pub fn backoff(&self) -> BackoffState {
        self.link.borrow().backoff
    }

    /// Receiver that observes every link state change.
    #[must_use]
    pub fn watch_state(&self) -> watch::Receiver<LinkStatus> {
        self.link.clone()
    }

    #[must_use]
    pub fn status(&self) -> RelayStatus {
        let link = *self.link.borrow();
        let delivery = self.hub.last_delivery();

        RelayStatus {
            state: link.state,
            attempt_count: link.backoff.attempt_count,
            next_delay_ms: link.backoff.next_delay.as_millis() as u64,
            last_delivery_at: delivery.map(|d| d.received_at),
            last_source: delivery.map(|d| d.origin),
            subscribers: self.hub.subscriber_count(),
            stats: self.hub.stats(),
            last_delivery_age: delivery.map(|d| d.at.elapsed()),
            uptime: self.started_at.elapsed(),
        }
    }

    /// Sustained unavailability: nothing delivered for longer than
    /// `recent_push + idle_poll`.
    #[must_use]
    pub fn is_degraded(&self) -> bool {
        self.status().is_degraded(self.settings.degraded_after())
    }

    /// Bounded-time fetch for first render. Never fails; `NoDataYet` is the
    /// fail-open answer.
    pub async fn snapshot_within(&self, index_id: &IndexId, wait: Duration) -> SnapshotLookup {
        self.hub.snapshot_within(index_id, wait).await
    }

    #[must_use]
    pub fn latest(&self, index_id: &IndexId) -> Option<Arc<IndexSnapshot>> {
        self.hub.latest(index_id)
    }

    #[must_use]
    pub fn latest_all(&self) -> Vec<Arc<IndexSnapshot>> {
        self.hub.latest_all()
    }

    #[must_use]
    pub fn history(&self, index_id: &IndexId) -> Vec<rust_decimal::Decimal> {
        self.hub.history(index_id)
    }

    #[must_use]
    pub fn stats(&self) -> RelayStats {
        self.hub.stats()
    }

    /// Stop the relay and wait for it to release the upstream connection.
    ///
    /// Cancels any in-flight connect, receive or poll. A core task that does
    /// not finish within the shutdown grace is aborted with a warning.
    /// Idempotent.
    pub async fn shutdown(&self) {
        let Some(mut core) = self.core.lock().take() else {
            return;
        };
        info!("Relay shutdown requested");
        let _ = self.shutdown.send(true);

        // The core itself waits up to one grace period for the poller and
        // one for the session close.
        let grace = self.settings.shutdown_grace.saturating_mul(3);
        match tokio::time::timeout(grace, &mut core).await {
            Ok(Ok(())) => info!("Relay shutdown complete"),
            Ok(Err(e)) => warn!(error = %e, "Relay task failed during shutdown"),
            Err(_) => {
                warn!(grace_ms = grace.as_millis() as u64, "Relay did not stop in time, aborting");
                core.abort();
            }
        }
    }
}

impl std::fmt::Debug for RelayHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RelayHandle")
            .field("state", &self.state())
            .field("hub", &self.hub)
            .finish_non_exhaustive()
    }
}
