//! Fallback poller covering gaps while push is unavailable.
//!
//! Started by the relay core when it enters backoff and stopped (joined)
//! before the core reports `Connected`. The poller only reads link state;
//! it never touches the connection or backoff bookkeeping.

use std::sync::Arc;
use std::time::Duration;

use rand::rngs::StdRng;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::error::Elapsed;
use tracing::{debug, info, trace, warn};

use super::backoff::sample_jitter;
use super::hub::{BroadcastHub, Origin, Publish};
use super::settings::PollerSettings;
use super::status::LinkStatus;
use crate::domain::IndexSnapshot;
use crate::error::PollError;
use crate::port::outbound::exchange::SnapshotSource;

pub struct FallbackPoller {
    source: Arc<dyn SnapshotSource>,
    hub: Arc<BroadcastHub>,
    link: watch::Receiver<LinkStatus>,
    settings: PollerSettings,
    rng: StdRng,
}

impl FallbackPoller {
    pub fn new(
        source: Arc<dyn SnapshotSource>,
        hub: Arc<BroadcastHub>,
        link: watch::Receiver<LinkStatus>,
        settings: PollerSettings,
        rng: StdRng,
    ) -> Self {
        Self {
            source,
            hub,
            link,
            settings,
            rng,
        }
    }

    /// Run the poll loop on its own task.
    pub fn spawn(self) -> PollerHandle {
        let (stop_tx, stop_rx) = watch::channel(false);
        let join = tokio::spawn(self.run(stop_rx));
        PollerHandle { stop_tx, join }
    }

    async fn run(mut self, mut stop: watch::Receiver<bool>) {
        info!(source = self.source.name(), "Fallback poller started");

        loop {
            if self.should_poll() {
                self.hub.counters().record_poll();
                let request = tokio::time::timeout(self.settings.poll_timeout, self.source.poll_once());
                let result = tokio::select! {
                    biased;
                    _ = stop.changed() => break,
                    result = request => result,
                };
                self.deliver(result);
            }

            let delay = self
                .settings
                .idle_interval
                .saturating_add(sample_jitter(self.settings.jitter, &mut self.rng));
            trace!(delay_ms = delay.as_millis() as u64, "Next poll scheduled");
            tokio::select! {
                biased;
                _ = stop.changed() => break,
                () = tokio::time::sleep(delay) => {}
            }
        }

        info!(source = self.source.name(), "Fallback poller stopped");
    }

    fn should_poll(&self) -> bool {
        let state = self.link.borrow().state;
        if !state.allows_polling() {
            trace!(%state, "Skipping poll, push is authoritative");
            return false;
        }
        if self.hub.push_is_recent(self.settings.recent_push) {
            trace!("Skipping poll, push data still fresh");
            return false;
        }
        true
    }

    fn deliver(&self, result: Result<Result<Vec<IndexSnapshot>, PollError>, Elapsed>) {
        let snapshots = match result.unwrap_or(Err(PollError::Timeout(self.settings.poll_timeout))) {
            Ok(snapshots) => snapshots,
            Err(e) => {
                self.hub.counters().record_poll_failure();
                warn!(source = self.source.name(), error = %e, "Poll failed");
                return;
            }
        };

        let received = snapshots.len();
        let mut delivered = 0;
        for snapshot in snapshots {
            if let Publish::Delivered { .. } = self.hub.publish(snapshot, Origin::Poll) {
                delivered += 1;
            }
        }
        debug!(received, delivered, "Poll completed");
    }
}

/// Owner of a running poller task.
#[derive(Debug)]
pub struct PollerHandle {
    stop_tx: watch::Sender<bool>,
    join: JoinHandle<()>,
}

impl PollerHandle {
    /// Signal the poller and wait up to `grace` for it to exit.
    ///
    /// A poller that does not exit in time is aborted with a warning. When
    /// this returns, no poll is in flight.
    pub async fn stop(self, grace: Duration) {
        let _ = self.stop_tx.send(true);
        let mut join = self.join;

        match tokio::time::timeout(grace, &mut join).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!(error = %e, "Poller task failed"),
            Err(_) => {
                warn!(grace_ms = grace.as_millis() as u64, "Poller did not stop in time, aborting");
                join.abort();
                let _ = join.await;
            }
        }
    }
}
