//! EventFilter - the matching predicate for waiters and subscribers
//!
//! Pure: no side effects, no clock, no log access. An event matches when its
//! target is in the filter's target set (empty set = all), its priority is at
//! least `priority_min`, and its id is past the `since` cursor.

use serde::{Deserialize, Serialize};

use super::log::{Event, Priority};

/// Which events an observer wants to see
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EventFilter {
    /// Resource kinds to watch; empty means all
    #[serde(default)]
    pub targets: Vec<String>,
    /// Minimum priority (inclusive)
    #[serde(default)]
    pub priority_min: Priority,
    /// Exclusive cursor: only events with a greater id match
    #[serde(default)]
    pub since: u64,
}

impl EventFilter {
    /// Match everything after `since`
    pub fn any_since(since: u64) -> Self {
        Self {
            since,
            ..Self::default()
        }
    }

    /// Restrict to the given resource kinds (empty slice keeps "all")
    pub fn targets(mut self, targets: &[&str]) -> Self {
        self.targets = targets.iter().map(|t| t.to_string()).collect();
        self
    }

    /// Restrict to events at or above the given priority
    pub fn priority_min(mut self, priority: Priority) -> Self {
        self.priority_min = priority;
        self
    }

    /// Does `event` satisfy this filter?
    pub fn matches(&self, event: &Event) -> bool {
        if event.id <= self.since {
            return false;
        }
        if event.priority < self.priority_min {
            return false;
        }
        self.targets.is_empty() || self.targets.iter().any(|t| t == &event.target)
    }
}
