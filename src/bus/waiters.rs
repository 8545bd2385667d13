//! WaitScheduler - long-polling over the event log
//!
//! `wait_for_updates` resolves immediately when matching backlog exists,
//! otherwise it parks the calling task on a wakeup channel until a matching
//! append, the (clamped) timeout, or bus shutdown — whichever fires first.
//!
//! No lost wakeup: a waiter registers first and re-scans the log second,
//! while the append path publishes to the log first and notifies registered
//! waiters second. An append the re-scan misses therefore runs its
//! notification pass after the registration is visible.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::mpsc;

use crate::event::{Event, EventFilter, Priority};

/// Inputs to `EventBus::wait_for_updates`
#[derive(Debug, Clone)]
pub struct WaitRequest {
    /// Logical caller tag; used for cursor bookkeeping, not exclusivity.
    /// Concurrent waits under one connection id run independently.
    pub connection_id: String,
    /// Resource kinds to watch; empty means all
    pub targets: Vec<String>,
    /// Maximum seconds to wait; clamped to `[0, 300]`
    pub timeout_secs: u64,
    /// Exclusive cursor; `None` means the connection's stored cursor, or
    /// "now" on first contact (a first call never floods with history)
    pub since: Option<u64>,
    /// Minimum priority (inclusive)
    pub priority_min: Priority,
}

impl WaitRequest {
    pub fn new(connection_id: impl Into<String>) -> Self {
        Self {
            connection_id: connection_id.into(),
            targets: Vec::new(),
            timeout_secs: 30,
            since: None,
            priority_min: Priority::Normal,
        }
    }

    pub fn targets(mut self, targets: &[&str]) -> Self {
        self.targets = targets.iter().map(|t| t.to_string()).collect();
        self
    }

    pub fn timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    pub fn since(mut self, cursor: u64) -> Self {
        self.since = Some(cursor);
        self
    }

    pub fn priority_min(mut self, priority: Priority) -> Self {
        self.priority_min = priority;
        self
    }
}

/// How a wait resolved
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WaitStatus {
    /// Matching events were delivered
    Updates,
    /// The deadline elapsed with nothing matching
    Timeout,
    /// The bus is shutting down; reconnect after restart
    Shutdown,
    /// The bus rejected the call (see `error`)
    Error,
}

/// Counts of delivered events, grouped by target and by type
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct UpdateSummary {
    pub total: usize,
    pub by_target: BTreeMap<String, usize>,
    pub by_type: BTreeMap<String, usize>,
}

impl UpdateSummary {
    pub fn from_events(events: &[Event]) -> Self {
        let mut summary = Self {
            total: events.len(),
            ..Self::default()
        };
        for event in events {
            *summary.by_target.entry(event.target.clone()).or_default() += 1;
            *summary
                .by_type
                .entry(event.event_type.as_str().to_string())
                .or_default() += 1;
        }
        summary
    }
}

/// Structured result of `wait_for_updates`, shaped for the RPC boundary
/// (remote callers observe a status field, never a thrown error).
#[derive(Debug, Clone, Serialize)]
pub struct WaitReport {
    pub status: WaitStatus,
    /// Matched events in ascending id order; empty unless `status == updates`
    pub events: Vec<Event>,
    pub summary: UpdateSummary,
    /// Cursor for the next call; unchanged when nothing was delivered
    pub last_event_id: u64,
    /// Seconds spent waiting
    pub duration: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl WaitReport {
    pub(crate) fn updates(events: Vec<Event>, cursor: u64, duration: Duration) -> Self {
        let last_event_id = events.last().map(|e| e.id).unwrap_or(cursor);
        Self {
            status: WaitStatus::Updates,
            summary: UpdateSummary::from_events(&events),
            events,
            last_event_id,
            duration: duration.as_secs_f64(),
            error: None,
        }
    }

    pub(crate) fn timeout(cursor: u64, duration: Duration) -> Self {
        Self {
            status: WaitStatus::Timeout,
            events: Vec::new(),
            summary: UpdateSummary::default(),
            last_event_id: cursor,
            duration: duration.as_secs_f64(),
            error: None,
        }
    }

    pub(crate) fn shutdown(cursor: u64, duration: Duration) -> Self {
        Self {
            status: WaitStatus::Shutdown,
            events: Vec::new(),
            summary: UpdateSummary::default(),
            last_event_id: cursor,
            duration: duration.as_secs_f64(),
            error: None,
        }
    }

    pub(crate) fn error(message: impl Into<String>, cursor: u64) -> Self {
        Self {
            status: WaitStatus::Error,
            events: Vec::new(),
            summary: UpdateSummary::default(),
            last_event_id: cursor,
            duration: 0.0,
            error: Some(message.into()),
        }
    }
}

struct WaitSlot {
    filter: EventFilter,
    tx: mpsc::UnboundedSender<Event>,
}

/// Registry of parked long-poll waiters
pub(crate) struct WaitRegistry {
    slots: Mutex<HashMap<u64, WaitSlot>>,
    next_id: AtomicU64,
}

impl WaitRegistry {
    pub(crate) fn new() -> Self {
        Self {
            slots: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(0),
        }
    }

    /// Register a waiter; pair with [`WaitGuard`] so every exit path
    /// deregisters.
    pub(crate) fn register(&self, filter: EventFilter) -> (u64, mpsc::UnboundedReceiver<Event>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        self.slots.lock().insert(id, WaitSlot { filter, tx });
        tracing::debug!(waiter_id = id, "waiter registered");
        (id, rx)
    }

    pub(crate) fn deregister(&self, id: u64) {
        if self.slots.lock().remove(&id).is_some() {
            tracing::debug!(waiter_id = id, "waiter deregistered");
        }
    }

    /// Deliver an appended event to every waiter whose filter matches.
    /// Send failures mean the waiter is mid-resolution; its guard cleans up.
    pub(crate) fn notify(&self, event: &Event) {
        let slots = self.slots.lock();
        for slot in slots.values() {
            if slot.filter.matches(event) {
                let _ = slot.tx.send(event.clone());
            }
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.slots.lock().len()
    }
}

/// Deregisters its waiter on drop, covering match, timeout, shutdown, and
/// caller cancellation alike.
pub(crate) struct WaitGuard<'a> {
    registry: &'a WaitRegistry,
    id: u64,
}

impl<'a> WaitGuard<'a> {
    pub(crate) fn new(registry: &'a WaitRegistry, id: u64) -> Self {
        Self { registry, id }
    }
}

impl Drop for WaitGuard<'_> {
    fn drop(&mut self) {
        self.registry.deregister(self.id);
    }
}
