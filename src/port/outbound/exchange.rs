//! Exchange ports for push connections and snapshot polling.

use std::time::Duration;

use async_trait::async_trait;

use crate::domain::{IndexSnapshot, RawEvent};
use crate::error::{ConnectError, PollError};

/// Live push session returned by a successful [`PushConnector::connect`].
pub type ConnectedHandle = Box<dyn PushSession>;

/// Opens the single upstream push connection.
///
/// Implementations perform exactly one attempt per call. Retry and backoff
/// belong to the relay core.
#[async_trait]
pub trait PushConnector: Send + Sync {
    /// Establish a connection and subscribe to index updates.
    ///
    /// # Errors
    ///
    /// - [`ConnectError::Timeout`] if no handshake completes within `timeout`
    /// - [`ConnectError::Refused`] on protocol-level rejection
    /// - [`ConnectError::Protocol`] for any other transport failure
    async fn connect(&self, timeout: Duration) -> Result<ConnectedHandle, ConnectError>;

    /// Get the upstream name for logging/debugging.
    fn name(&self) -> &'static str;
}

/// Pull-based event sequence over one push connection.
///
/// Vendor SDKs that are callback driven are wrapped so that the relay core
/// always awaits the next event the same way.
#[async_trait]
pub trait PushSession: Send {
    /// Receive the next event.
    ///
    /// Suspends until a message arrives or the connection ends. A connection
    /// error is reported as [`RawEvent::Disconnect`]; a clean close may simply
    /// return `None`. After either, the session is finished and every further
    /// call returns `None`.
    async fn receive(&mut self) -> Option<RawEvent>;

    /// Release the connection. Idempotent.
    async fn close(&mut self);
}

/// Request/response snapshot endpoint used while push is unavailable.
#[async_trait]
pub trait SnapshotSource: Send + Sync {
    /// Fetch the current snapshot of every configured index.
    ///
    /// # Errors
    ///
    /// Returns a [`PollError`] on timeout, non-success status, transport or
    /// decode failure. Callers treat all of them as non-fatal.
    async fn poll_once(&self) -> Result<Vec<IndexSnapshot>, PollError>;

    /// Get the upstream name for logging/debugging.
    fn name(&self) -> &'static str;
}
