//! Trait definitions (hexagonal ports). Depend only on domain.
//!
//! Ports are the seams between the relay runtime and the upstream exchange.
//! Adapters implement them; the runtime only ever sees the traits.
//!
//! ```text
//!   ┌──────────────┐   PushConnector / PushSession   ┌──────────────┐
//!   │   Upstream   │ ───────────────────────────────▶│              │
//!   │   exchange   │                                 │ Relay runtime│──▶ subscribers
//!   │   adapters   │ ───────────────────────────────▶│              │
//!   └──────────────┘        SnapshotSource           └──────────────┘
//! ```

pub mod outbound;
