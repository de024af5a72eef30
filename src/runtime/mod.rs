//! Relay runtime: the core state machine, the fallback poller and the
//! broadcast hub they both publish through.

mod backoff;
mod hub;
mod poller;
mod registry;
mod relay;
mod settings;
mod stats;
mod status;

pub use backoff::{sample_jitter, BackoffPolicy};
pub use hub::{BroadcastHub, Delivery, Origin, Publish, SnapshotLookup};
pub use poller::{FallbackPoller, PollerHandle};
pub use registry::{BroadcastOutcome, Subscription, SubscriptionRegistry};
pub use relay::{Relay, RelayHandle};
pub use settings::{PollerSettings, RelaySettings};
pub use stats::{RelayCounters, RelayStats};
pub use status::{LinkStatus, RelayStatus};
