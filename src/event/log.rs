//! EventLog - bounded, append-only event store
//!
//! Single source of truth for change notifications.
//! - `Event`: envelope with id + timestamp + change description
//! - `EventDraft`: what producers hand to `emit` (no id yet)
//! - `EventLog`: thread-safe ring buffer with monotonic ids
//!
//! Ordering is defined by `id` alone; the wall-clock timestamp is
//! informational. Ids are assigned under the write lock so appends become
//! visible to readers in assignment order.

use std::collections::VecDeque;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::RwLock; // 2-3x faster than std::sync::RwLock

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// What kind of mutation an event describes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    Create,
    Update,
    Delete,
    List,
}

impl EventType {
    /// Wire label, matching the serde representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
            Self::List => "list",
        }
    }
}

/// Event urgency, ordered `Low < Normal < High < Critical`
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low = 0,
    #[default]
    Normal = 1,
    High = 2,
    Critical = 3,
}

impl Priority {
    /// Parse a priority label, defaulting to `Normal` on anything unknown.
    ///
    /// Filter inputs arrive from remote callers; a bad label must degrade,
    /// not fail the call.
    pub fn parse_lenient(label: &str) -> Self {
        match label.to_ascii_lowercase().as_str() {
            "low" => Self::Low,
            "normal" => Self::Normal,
            "high" => Self::High,
            "critical" => Self::Critical,
            other => {
                tracing::warn!(label = other, "unknown priority label, defaulting to normal");
                Self::Normal
            }
        }
    }

    /// Wire label, matching the serde representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Normal => "normal",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }
}

/// A change notification produced by a successful resource mutation.
///
/// Immutable once appended. `id` is strictly increasing and unique for the
/// process lifetime; it doubles as the replay cursor.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Event {
    /// Monotonic sequence id (total order; assigned at append)
    pub id: u64,
    /// Mutation kind
    #[serde(rename = "type")]
    pub event_type: EventType,
    /// Resource kind, e.g. "note" or "task"
    pub target: String,
    /// Urgency for filtering
    pub priority: Priority,
    /// Opaque change description
    pub payload: Value,
    /// Advisory presentation hint, e.g. "navigate_to"
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ui_hint: Option<String>,
    /// Wall-clock append time (informational only)
    pub timestamp: DateTime<Utc>,
}

/// Everything a producer specifies about an event; id and timestamp are
/// assigned at append time.
#[derive(Debug, Clone, PartialEq)]
pub struct EventDraft {
    pub event_type: EventType,
    pub target: String,
    pub priority: Priority,
    pub payload: Value,
    pub ui_hint: Option<String>,
}

impl EventDraft {
    /// Start a draft for the given mutation kind and resource kind
    pub fn new(event_type: EventType, target: impl Into<String>) -> Self {
        Self {
            event_type,
            target: target.into(),
            priority: Priority::Normal,
            payload: Value::Null,
            ui_hint: None,
        }
    }

    /// Shorthand for a `Create` draft
    pub fn create(target: impl Into<String>) -> Self {
        Self::new(EventType::Create, target)
    }

    /// Shorthand for an `Update` draft
    pub fn update(target: impl Into<String>) -> Self {
        Self::new(EventType::Update, target)
    }

    /// Shorthand for a `Delete` draft
    pub fn delete(target: impl Into<String>) -> Self {
        Self::new(EventType::Delete, target)
    }

    /// Shorthand for a `List` draft
    pub fn list(target: impl Into<String>) -> Self {
        Self::new(EventType::List, target)
    }

    pub fn priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    pub fn payload(mut self, payload: Value) -> Self {
        self.payload = payload;
        self
    }

    pub fn ui_hint(mut self, hint: impl Into<String>) -> Self {
        self.ui_hint = Some(hint.into());
        self
    }
}

struct LogInner {
    entries: VecDeque<Event>,
    next_id: u64,
}

/// Thread-safe, append-only ring buffer of events.
///
/// Bounded at `capacity`: the oldest entry is evicted once the bound is
/// exceeded, after which its id is permanently unreplayable and catch-up
/// callers must fall back to a full snapshot.
#[derive(Clone)]
pub struct EventLog {
    inner: Arc<RwLock<LogInner>>,
    capacity: usize,
}

impl EventLog {
    /// Create an empty log holding at most `capacity` events
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Arc::new(RwLock::new(LogInner {
                entries: VecDeque::with_capacity(capacity.min(4096)),
                next_id: 0,
            })),
            capacity,
        }
    }

    /// Append a draft, assigning the next id and timestamp.
    ///
    /// Id assignment and insertion happen under one write lock: no two
    /// appends share an id, and readers observe appends in id order.
    pub fn append(&self, draft: EventDraft) -> Event {
        let mut inner = self.inner.write();
        inner.next_id += 1;

        let event = Event {
            id: inner.next_id,
            event_type: draft.event_type,
            target: draft.target,
            priority: draft.priority,
            payload: draft.payload,
            ui_hint: draft.ui_hint,
            timestamp: Utc::now(),
        };

        if let Some(last) = inner.entries.back() {
            debug_assert!(last.id < event.id, "event ids must be strictly increasing");
        }

        inner.entries.push_back(event.clone());
        while inner.entries.len() > self.capacity {
            inner.entries.pop_front();
        }

        event
    }

    /// All resident events with `id > cursor`, in ascending id order.
    ///
    /// Never mutates state; safe to call repeatedly with different cursors.
    pub fn events_since(&self, cursor: u64) -> Vec<Event> {
        let inner = self.inner.read();
        inner
            .entries
            .iter()
            .filter(|e| e.id > cursor)
            .cloned()
            .collect()
    }

    /// Highest assigned id, 0 if nothing was ever appended
    pub fn latest_id(&self) -> u64 {
        self.inner.read().next_id
    }

    /// Oldest resident id, 0 if the log is empty.
    ///
    /// A cursor below `first_id() - 1` has aged out of the replay window.
    pub fn first_id(&self) -> u64 {
        self.inner.read().entries.front().map(|e| e.id).unwrap_or(0)
    }

    /// Number of resident events
    pub fn len(&self) -> usize {
        self.inner.read().entries.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Maximum resident events (the replay window)
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Drop all resident events and reset nothing else; ids keep increasing
    /// from where they were (ids are unique for the process lifetime).
    pub fn clear(&self) {
        self.inner.write().entries.clear();
    }
}

impl std::fmt::Debug for EventLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventLog")
            .field("len", &self.len())
            .field("capacity", &self.capacity)
            .finish()
    }
}
