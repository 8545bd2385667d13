//! SyncEngine - non-blocking catch-up after disconnection
//!
//! `sync_changes` answers "give me everything after X" straight from the log,
//! optionally merged with a full-state snapshot pulled from the external
//! resource stores through the `SnapshotProvider` seam.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Value;

use crate::event::Event;

/// Current full state of the external resource stores, keyed by kind
pub type StateSnapshot = BTreeMap<String, Vec<Value>>;

/// External component supplying current full resource state, independent of
/// the event log. Implemented by the resource stores.
pub trait SnapshotProvider: Send + Sync {
    /// Resource kinds this provider can snapshot, e.g. `["note", "task"]`
    fn kinds(&self) -> Vec<String>;

    /// Ordered sequence of current records for one resource kind
    fn list_all(&self, kind: &str) -> Vec<Value>;
}

/// Inputs to `sync_changes`
#[derive(Debug, Clone, Default)]
pub struct SyncRequest {
    /// Exclusive cursor: id of the last processed event (0 = from the start)
    pub last_sync_id: u64,
    /// Also build a full-state snapshot via the provider
    pub include_full_state: bool,
}

impl SyncRequest {
    pub fn since(last_sync_id: u64) -> Self {
        Self {
            last_sync_id,
            include_full_state: false,
        }
    }

    pub fn with_full_state(mut self) -> Self {
        self.include_full_state = true;
        self
    }
}

/// Result of `sync_changes`
#[derive(Debug, Clone, Serialize)]
pub struct SyncReport {
    /// Changes since the cursor, ascending id order
    pub events: Vec<Event>,
    /// Cursor for the next call: id of the last returned event, or the
    /// request cursor unchanged when nothing was returned
    pub next_sync_id: u64,
    /// True when the cursor predates the replay window: events were evicted
    /// and the returned list is NOT the complete history. Callers needing
    /// full history must request `include_full_state`.
    pub history_truncated: bool,
    /// Full resource state, present only when requested
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<StateSnapshot>,
}

/// Build the full-state map by invoking the provider per resource kind
pub(crate) fn collect_state(provider: &dyn SnapshotProvider) -> StateSnapshot {
    provider
        .kinds()
        .into_iter()
        .map(|kind| {
            let records = provider.list_all(&kind);
            (kind, records)
        })
        .collect()
}
