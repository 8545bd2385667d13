//! Bus metrics - read-only counters for health reporting
//!
//! Derived from the log and the waiter/subscriber registries; never mutates
//! them. The events-per-second figure comes from a sliding window of append
//! instants.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use serde::Serialize;

/// Snapshot returned by `EventBus::metrics`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BusMetrics {
    /// Total events ever appended (highest assigned id)
    pub total_events: u64,
    /// Appends per second over the sliding window
    pub events_per_second: f64,
    /// Pending waiters plus open stream subscribers
    pub active_connections: usize,
}

/// Sliding-window append rate counter
pub(crate) struct RateCounter {
    window: Duration,
    stamps: Mutex<VecDeque<Instant>>,
}

impl RateCounter {
    pub(crate) fn new(window: Duration) -> Self {
        Self {
            window,
            stamps: Mutex::new(VecDeque::new()),
        }
    }

    /// Record one append at "now"
    pub(crate) fn record(&self) {
        let now = Instant::now();
        let mut stamps = self.stamps.lock();
        stamps.push_back(now);
        Self::prune(&mut stamps, now, self.window);
    }

    /// Appends per second over the window
    pub(crate) fn per_second(&self) -> f64 {
        let now = Instant::now();
        let mut stamps = self.stamps.lock();
        Self::prune(&mut stamps, now, self.window);
        stamps.len() as f64 / self.window.as_secs_f64()
    }

    /// Drop all recorded stamps
    pub(crate) fn reset(&self) {
        self.stamps.lock().clear();
    }

    fn prune(stamps: &mut VecDeque<Instant>, now: Instant, window: Duration) {
        while let Some(front) = stamps.front() {
            if now.duration_since(*front) > window {
                stamps.pop_front();
            } else {
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_counter_reports_zero() {
        let counter = RateCounter::new(Duration::from_secs(60));
        assert_eq!(counter.per_second(), 0.0);
    }

    #[test]
    fn rate_reflects_recorded_appends() {
        let counter = RateCounter::new(Duration::from_secs(60));
        for _ in 0..30 {
            counter.record();
        }
        // 30 appends in a 60s window: 0.5/s
        let rate = counter.per_second();
        assert!((rate - 0.5).abs() < 1e-9, "rate was {rate}");
    }

    #[test]
    fn stamps_outside_window_are_pruned() {
        let counter = RateCounter::new(Duration::from_millis(10));
        for _ in 0..5 {
            counter.record();
        }
        std::thread::sleep(Duration::from_millis(25));
        assert_eq!(counter.per_second(), 0.0);
    }

    #[test]
    fn reset_clears_history() {
        let counter = RateCounter::new(Duration::from_secs(60));
        counter.record();
        counter.reset();
        assert_eq!(counter.per_second(), 0.0);
    }

    #[test]
    fn metrics_serialize_as_flat_object() {
        let metrics = BusMetrics {
            total_events: 42,
            events_per_second: 0.7,
            active_connections: 3,
        };
        let json = serde_json::to_value(&metrics).unwrap();
        assert_eq!(json["total_events"], 42);
        assert_eq!(json["active_connections"], 3);
    }
}
