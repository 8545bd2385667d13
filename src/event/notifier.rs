//! ChangeNotifier - abstraction for post-mutation event emission
//!
//! Resource handlers call `notify` after their own success path; the bus
//! implementation appends to the log and fans out. Emission is best-effort
//! relative to the primary mutation: a notifier must never propagate a
//! failure back into the business operation.
//!
//! Key types:
//! - `ChangeNotifier`: trait for emitting change events
//! - `NoopNotifier`: no-op implementation for tests

use super::log::{Event, EventDraft};

/// Trait for emitting change events after successful mutations
///
/// Enables dependency injection: the real `EventBus` in production,
/// `NoopNotifier` or a custom mock in tests.
pub trait ChangeNotifier: Send + Sync {
    /// Emit an event for a completed mutation.
    ///
    /// Returns the finalized event, or `None` when emission was skipped
    /// (e.g. the bus is stopped). Implementations log failures instead of
    /// returning errors.
    fn notify(&self, draft: EventDraft) -> Option<Event>;
}

/// No-op notifier for tests (drops every draft)
#[derive(Debug, Clone, Default)]
pub struct NoopNotifier;

impl NoopNotifier {
    /// Create a new NoopNotifier
    pub fn new() -> Self {
        Self
    }
}

impl ChangeNotifier for NoopNotifier {
    fn notify(&self, _draft: EventDraft) -> Option<Event> {
        None
    }
}
