//! Event Module - change notifications for shared resources
//!
//! Key types:
//! - `Event`: immutable envelope with monotonic id + timestamp + change data
//! - `EventDraft`: builder handed to `emit` by producers
//! - `EventType` / `Priority`: mutation kind and ordered urgency
//! - `EventLog`: thread-safe bounded ring buffer, the single source of truth
//! - `EventFilter`: pure matching predicate (targets / priority floor / cursor)
//! - `ChangeNotifier`: emission seam for resource handlers; `NoopNotifier` for tests

mod filter;
mod log;
mod notifier;

// Re-export all public types
pub use filter::EventFilter;
pub use log::{Event, EventDraft, EventLog, EventType, Priority};
pub use notifier::{ChangeNotifier, NoopNotifier};
