//! Mock [`PushConnector`] implementations for testing.
//!
//! - [`ScriptedConnector`] - Pre-loaded connect outcomes, each successful
//!   one carrying the events its session will yield.
//!   Best for: reconnect timing, backoff, ordering across sessions.
//!
//! - [`ChannelConnector`] - Sessions fed from an external control handle.
//!   Best for: integration tests needing on-demand events and disconnects.
//!
//! Both track how many sessions are open so tests can assert the single
//! upstream connection rule.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicI32, AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::mpsc;

use crate::domain::RawEvent;
use crate::error::ConnectError;
use crate::port::outbound::exchange::{ConnectedHandle, PushConnector, PushSession};

/// Shared counters for connect calls and session lifetimes.
#[derive(Debug, Default)]
pub struct SessionCounters {
    connects: AtomicU32,
    closes: AtomicU32,
    open: AtomicI32,
    max_open: AtomicI32,
}

impl SessionCounters {
    fn opened(&self) {
        let now = self.open.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_open.fetch_max(now, Ordering::SeqCst);
    }

    fn closed(&self) {
        self.closes.fetch_add(1, Ordering::SeqCst);
        self.open.fetch_sub(1, Ordering::SeqCst);
    }

    pub fn connects(&self) -> u32 {
        self.connects.load(Ordering::SeqCst)
    }

    pub fn closes(&self) -> u32 {
        self.closes.load(Ordering::SeqCst)
    }

    /// Sessions currently open (connected and not yet closed).
    pub fn open(&self) -> i32 {
        self.open.load(Ordering::SeqCst)
    }

    /// Highest number of sessions that were ever open at once.
    pub fn max_open(&self) -> i32 {
        self.max_open.load(Ordering::SeqCst)
    }
}

// ---------------------------------------------------------------------------
// ScriptedConnector
// ---------------------------------------------------------------------------

/// Outcome of one scripted `connect` call.
#[derive(Debug, Clone)]
pub enum ConnectStep {
    /// Fail immediately.
    Fail(ConnectError),
    /// Never complete. The caller's timeout decides.
    Hang,
    /// Connect; the session yields these events, then ends.
    Session(Vec<RawEvent>),
    /// Connect; the session yields these events, then stays open and quiet.
    Live(Vec<RawEvent>),
}

/// A connector that replays a fixed list of connect outcomes.
///
/// Once the script is exhausted every call uses the fallback step
/// (`Hang` by default).
pub struct ScriptedConnector {
    steps: Mutex<VecDeque<ConnectStep>>,
    fallback: ConnectStep,
    counters: Arc<SessionCounters>,
}

impl ScriptedConnector {
    pub fn new(steps: Vec<ConnectStep>) -> Self {
        Self {
            steps: Mutex::new(steps.into()),
            fallback: ConnectStep::Hang,
            counters: Arc::new(SessionCounters::default()),
        }
    }

    pub fn with_fallback(mut self, step: ConnectStep) -> Self {
        self.fallback = step;
        self
    }

    pub fn counters(&self) -> Arc<SessionCounters> {
        Arc::clone(&self.counters)
    }
}

#[async_trait]
impl PushConnector for ScriptedConnector {
    async fn connect(&self, _timeout: Duration) -> Result<ConnectedHandle, ConnectError> {
        self.counters.connects.fetch_add(1, Ordering::SeqCst);
        let step = self
            .steps
            .lock()
            .pop_front()
            .unwrap_or_else(|| self.fallback.clone());

        let (events, keep_open) = match step {
            ConnectStep::Fail(e) => return Err(e),
            ConnectStep::Hang => return std::future::pending().await,
            ConnectStep::Session(events) => (events, false),
            ConnectStep::Live(events) => (events, true),
        };

        self.counters.opened();
        Ok(Box::new(ScriptedSession {
            events: events.into(),
            keep_open,
            finished: false,
            closed: false,
            counters: Arc::clone(&self.counters),
        }))
    }

    fn name(&self) -> &'static str {
        "scripted"
    }
}

struct ScriptedSession {
    events: VecDeque<RawEvent>,
    keep_open: bool,
    finished: bool,
    closed: bool,
    counters: Arc<SessionCounters>,
}

#[async_trait]
impl PushSession for ScriptedSession {
    async fn receive(&mut self) -> Option<RawEvent> {
        if self.finished || self.closed {
            return None;
        }
        match self.events.pop_front() {
            Some(event) => {
                if event.is_terminal() {
                    self.finished = true;
                }
                Some(event)
            }
            None if self.keep_open => std::future::pending().await,
            None => {
                self.finished = true;
                None
            }
        }
    }

    async fn close(&mut self) {
        if !self.closed {
            self.closed = true;
            self.counters.closed();
        }
    }
}

// ---------------------------------------------------------------------------
// ChannelConnector
// ---------------------------------------------------------------------------

/// A connector whose sessions are driven through a [`ChannelConnectorHandle`].
///
/// Connects succeed while the connector is accepting and are refused
/// otherwise. Each new session replaces the handle's target.
pub struct ChannelConnector {
    shared: Arc<ChannelShared>,
}

struct ChannelShared {
    accepting: AtomicBool,
    current: Mutex<Option<mpsc::UnboundedSender<RawEvent>>>,
    counters: Arc<SessionCounters>,
}

/// Control handle for a [`ChannelConnector`].
#[derive(Clone)]
pub struct ChannelConnectorHandle {
    shared: Arc<ChannelShared>,
}

impl ChannelConnector {
    /// Create a connector that starts out accepting or refusing connects.
    pub fn new(accepting: bool) -> (Self, ChannelConnectorHandle) {
        let shared = Arc::new(ChannelShared {
            accepting: AtomicBool::new(accepting),
            current: Mutex::new(None),
            counters: Arc::new(SessionCounters::default()),
        });
        (
            Self {
                shared: Arc::clone(&shared),
            },
            ChannelConnectorHandle { shared },
        )
    }
}

impl ChannelConnectorHandle {
    pub fn set_accepting(&self, accepting: bool) {
        self.shared.accepting.store(accepting, Ordering::SeqCst);
    }

    /// Send an event to the current session. Returns `false` if there is no
    /// live session.
    pub fn send(&self, event: RawEvent) -> bool {
        self.shared
            .current
            .lock()
            .as_ref()
            .is_some_and(|tx| tx.send(event).is_ok())
    }

    /// Terminate the current session with a disconnect event.
    pub fn disconnect(&self, reason: &str) -> bool {
        let sent = self.send(RawEvent::Disconnect {
            reason: reason.to_string(),
        });
        self.shared.current.lock().take();
        sent
    }

    pub fn counters(&self) -> Arc<SessionCounters> {
        Arc::clone(&self.shared.counters)
    }
}

#[async_trait]
impl PushConnector for ChannelConnector {
    async fn connect(&self, _timeout: Duration) -> Result<ConnectedHandle, ConnectError> {
        self.shared.counters.connects.fetch_add(1, Ordering::SeqCst);
        if !self.shared.accepting.load(Ordering::SeqCst) {
            return Err(ConnectError::Refused("not accepting".to_string()));
        }

        let (tx, rx) = mpsc::unbounded_channel();
        *self.shared.current.lock() = Some(tx);
        self.shared.counters.opened();
        Ok(Box::new(ChannelSession {
            rx,
            finished: false,
            closed: false,
            counters: Arc::clone(&self.shared.counters),
        }))
    }

    fn name(&self) -> &'static str {
        "channel"
    }
}

struct ChannelSession {
    rx: mpsc::UnboundedReceiver<RawEvent>,
    finished: bool,
    closed: bool,
    counters: Arc<SessionCounters>,
}

#[async_trait]
impl PushSession for ChannelSession {
    async fn receive(&mut self) -> Option<RawEvent> {
        if self.finished || self.closed {
            return None;
        }
        let event = self.rx.recv().await;
        match &event {
            Some(e) if e.is_terminal() => self.finished = true,
            None => self.finished = true,
            Some(_) => {}
        }
        event
    }

    async fn close(&mut self) {
        if !self.closed {
            self.closed = true;
            self.rx.close();
            self.counters.closed();
        }
    }
}
