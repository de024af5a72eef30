//! Mock [`SnapshotSource`] for poller and relay tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::time::Instant;

use crate::domain::IndexSnapshot;
use crate::error::PollError;
use crate::port::outbound::exchange::SnapshotSource;

type PollResult = Result<Vec<IndexSnapshot>, PollError>;

/// A source that replays scripted poll results.
///
/// Each `poll_once` pops the next result, or returns an empty batch once the
/// script is exhausted. Every call is counted and timestamped, including
/// ones cancelled mid-flight.
#[derive(Default)]
pub struct ScriptedSource {
    results: Mutex<VecDeque<PollResult>>,
    delay: Duration,
    polls: AtomicU32,
    started: Mutex<Vec<Instant>>,
}

impl ScriptedSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_results(mut self, results: Vec<PollResult>) -> Self {
        self.results = Mutex::new(results.into());
        self
    }

    /// Simulated request latency.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn poll_count(&self) -> u32 {
        self.polls.load(Ordering::SeqCst)
    }

    /// When each poll began, on the tokio clock.
    pub fn poll_times(&self) -> Vec<Instant> {
        self.started.lock().clone()
    }
}

#[async_trait]
impl SnapshotSource for ScriptedSource {
    async fn poll_once(&self) -> Result<Vec<IndexSnapshot>, PollError> {
        self.polls.fetch_add(1, Ordering::SeqCst);
        self.started.lock().push(Instant::now());
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        let next = self.results.lock().pop_front();
        next.unwrap_or_else(|| Ok(Vec::new()))
    }

    fn name(&self) -> &'static str {
        "scripted"
    }
}
