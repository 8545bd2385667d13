//! Bus Module - the event notification hub
//!
//! Key types:
//! - `EventBus`: explicit `start`/`stop` lifecycle, `emit`, and the four
//!   observer surfaces (long-poll, streaming, sync, metrics)
//! - `WaitRequest` / `WaitReport`: long-poll contract (`wait_for_updates`)
//! - `SubscribeRequest` / `Subscription` / `StreamFrame`: streaming contract
//! - `SyncRequest` / `SyncReport` / `SnapshotProvider`: catch-up contract
//! - `BusMetrics`: read-only health counters

mod core;
mod metrics;
mod stream;
mod sync;
mod waiters;

// Re-export all public types
pub use self::core::EventBus;
pub use metrics::BusMetrics;
pub use stream::{StreamFrame, SubscribeRequest, Subscription};
pub use sync::{SnapshotProvider, StateSnapshot, SyncReport, SyncRequest};
pub use waiters::{UpdateSummary, WaitReport, WaitRequest, WaitStatus};
