//! Exchange-agnostic domain types for the index relay.
//!
//! Nothing in here performs I/O. Snapshots are immutable once built, and the
//! connection/backoff types are plain values owned by the relay core.

mod connection;
mod event;
mod id;
mod snapshot;

pub use connection::{BackoffState, ConnectionState};
pub use event::{RawEvent, RawTick};
pub use id::{IndexId, SubscriberId};
pub use snapshot::{Breadth, IndexSnapshot, SnapshotBuilder};
