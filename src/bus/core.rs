//! EventBus - lifecycle-scoped hub wiring the log to its observers
//!
//! One bus instance per process, constructed explicitly with `start` and torn
//! down with `stop`; handlers receive clones (cheap, all state is shared
//! behind an `Arc`). The bus owns the single mutable resource — the event log
//! — plus the waiter and subscriber registries.
//!
//! The publish lock serializes append → notify-waiters → forward-streams, so
//! every observer sees events in id order. All delivery inside the critical
//! section is non-blocking (`try_send` / unbounded send).

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use dashmap::DashMap;
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

use crate::config::BusConfig;
use crate::error::{AtlasError, Result};
use crate::event::{ChangeNotifier, Event, EventDraft, EventFilter, EventLog};

use super::metrics::{BusMetrics, RateCounter};
use super::stream::{StreamRegistry, SubscribeRequest, Subscription};
use super::sync::{collect_state, SnapshotProvider, SyncReport, SyncRequest};
use super::waiters::{WaitGuard, WaitRegistry, WaitReport, WaitRequest};

struct BusInner {
    config: BusConfig,
    log: EventLog,
    /// Serializes append + fan-out; registration handshakes order against it
    publish: Mutex<()>,
    waiters: WaitRegistry,
    streams: Arc<StreamRegistry>,
    /// Per-connection long-poll cursors (last delivered id)
    cursors: DashMap<String, u64>,
    rate: RateCounter,
    stopped: AtomicBool,
    shutdown: CancellationToken,
}

impl Drop for BusInner {
    fn drop(&mut self) {
        // Last handle gone: release the heartbeat task
        self.shutdown.cancel();
    }
}

/// The event notification bus. See the crate docs for the component map.
#[derive(Clone)]
pub struct EventBus {
    inner: Arc<BusInner>,
}

impl EventBus {
    /// Start a bus: allocate the ring buffer and rate counter, spawn the
    /// heartbeat task. Must be called within a Tokio runtime.
    pub fn start(config: BusConfig) -> Result<Self> {
        config.validate()?;

        let inner = Arc::new(BusInner {
            log: EventLog::new(config.capacity),
            publish: Mutex::new(()),
            waiters: WaitRegistry::new(),
            streams: Arc::new(StreamRegistry::new()),
            cursors: DashMap::new(),
            rate: RateCounter::new(config.rate_window()),
            stopped: AtomicBool::new(false),
            shutdown: CancellationToken::new(),
            config,
        });

        let streams = Arc::clone(&inner.streams);
        let token = inner.shutdown.clone();
        let cadence = inner.config.heartbeat_interval();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(cadence);
            ticker.tick().await; // the immediate first tick
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = ticker.tick() => streams.heartbeat(),
                }
            }
        });

        tracing::info!(
            capacity = inner.config.capacity,
            heartbeat_secs = inner.config.heartbeat_secs,
            "event bus started"
        );
        Ok(Self { inner })
    }

    /// Stop the bus: reject further emits, resolve pending waiters with a
    /// `shutdown` status, close all streams, drain the log and counters.
    /// Idempotent.
    pub fn stop(&self) {
        if self.inner.stopped.swap(true, Ordering::SeqCst) {
            return;
        }
        self.inner.shutdown.cancel();
        self.inner.streams.close_all();
        self.inner.log.clear();
        self.inner.cursors.clear();
        self.inner.rate.reset();
        tracing::info!("event bus stopped");
    }

    /// Whether the bus accepts emits and registrations
    pub fn is_running(&self) -> bool {
        !self.inner.stopped.load(Ordering::SeqCst)
    }

    /// Highest assigned event id, 0 if nothing was emitted yet
    pub fn latest_event_id(&self) -> u64 {
        self.inner.log.latest_id()
    }

    /// Append an event and deliver it to matching waiters and subscribers.
    ///
    /// Fails only when the bus is stopped; delivery itself never blocks the
    /// producer (slow stream subscribers are disconnected instead).
    pub fn emit(&self, draft: EventDraft) -> Result<Event> {
        if !self.is_running() {
            return Err(AtlasError::BusStopped);
        }

        let _publish = self.inner.publish.lock();
        let event = self.inner.log.append(draft);
        self.inner.rate.record();
        self.inner.waiters.notify(&event);
        self.inner.streams.forward(&event);

        tracing::debug!(
            id = event.id,
            target = %event.target,
            event_type = event.event_type.as_str(),
            "event emitted"
        );
        Ok(event)
    }

    /// Best-effort emit for resource handlers: called after a successful
    /// mutation, it must never fail the underlying business operation.
    /// Emission failures are logged and swallowed.
    pub fn emit_change(&self, draft: EventDraft) -> Option<Event> {
        match self.emit(draft) {
            Ok(event) => Some(event),
            Err(err) => {
                tracing::warn!(error = %err, "change event dropped");
                None
            }
        }
    }

    /// Long-poll for matching events. Returns immediately when backlog
    /// matches; otherwise suspends the calling task (only) until a matching
    /// append, the clamped timeout, or shutdown.
    pub async fn wait_for_updates(&self, request: WaitRequest) -> WaitReport {
        let started = Instant::now();

        if !self.is_running() {
            return WaitReport::error("event bus stopped", request.since.unwrap_or(0));
        }

        // Default cursor: the connection's stored position, or "now" on
        // first contact so an initial call never floods with history.
        let since = match request.since {
            Some(cursor) => cursor,
            None => *self
                .inner
                .cursors
                .entry(request.connection_id.clone())
                .or_insert_with(|| self.inner.log.latest_id()),
        };

        let filter = EventFilter {
            targets: request.targets.clone(),
            priority_min: request.priority_min,
            since,
        };
        let deadline = self.inner.config.clamp_wait(request.timeout_secs);

        // Fast path: matching backlog resolves without suspending
        let backlog = self.scan(&filter);
        if !backlog.is_empty() {
            return self.deliver(&request.connection_id, backlog, since, started);
        }

        // Slow path: register, then re-scan. An append that the re-scan
        // missed runs its notification pass after this registration is
        // visible, so it lands in the channel instead.
        let (waiter_id, mut rx) = self.inner.waiters.register(filter.clone());
        let _guard = WaitGuard::new(&self.inner.waiters, waiter_id);

        let recheck = self.scan(&filter);
        if !recheck.is_empty() {
            return self.deliver(&request.connection_id, recheck, since, started);
        }

        tokio::select! {
            _ = self.inner.shutdown.cancelled() => {
                WaitReport::shutdown(since, started.elapsed())
            }
            _ = tokio::time::sleep(deadline) => {
                WaitReport::timeout(since, started.elapsed())
            }
            first = rx.recv() => {
                match first {
                    Some(event) => {
                        // Batch the burst: everything already queued wakes as one report
                        let mut events = vec![event];
                        while let Ok(event) = rx.try_recv() {
                            events.push(event);
                        }
                        self.deliver(&request.connection_id, events, since, started)
                    }
                    // Sender side never closes while registered; treat as shutdown
                    None => WaitReport::shutdown(since, started.elapsed()),
                }
            }
        }
    }

    /// Open a streaming connection: replay resident history past the
    /// client's last seen id, then push live events until disconnect.
    pub fn subscribe(&self, request: SubscribeRequest) -> Result<Subscription> {
        if !self.is_running() {
            return Err(AtlasError::BusStopped);
        }

        let (id, replay, rx) = self.inner.streams.register(
            &self.inner.log,
            &request,
            self.inner.config.stream_queue_len,
        );
        Ok(Subscription::new(
            id,
            replay,
            rx,
            Arc::clone(&self.inner.streams),
        ))
    }

    /// Non-blocking catch-up: everything after `last_sync_id`, plus a full
    /// snapshot from `provider` when requested.
    pub fn sync_changes(
        &self,
        request: SyncRequest,
        provider: Option<&dyn SnapshotProvider>,
    ) -> Result<SyncReport> {
        if !self.is_running() {
            return Err(AtlasError::BusStopped);
        }

        let events = self.inner.log.events_since(request.last_sync_id);
        let next_sync_id = events.last().map(|e| e.id).unwrap_or(request.last_sync_id);

        let first = self.inner.log.first_id();
        let latest = self.inner.log.latest_id();
        let history_truncated = if first == 0 {
            latest > request.last_sync_id
        } else {
            request.last_sync_id + 1 < first
        };
        if history_truncated {
            tracing::debug!(
                last_sync_id = request.last_sync_id,
                oldest_resident = first,
                "sync cursor predates replay window"
            );
        }

        let state = request
            .include_full_state
            .then(|| provider.map(collect_state).unwrap_or_default());

        Ok(SyncReport {
            events,
            next_sync_id,
            history_truncated,
            state,
        })
    }

    /// Read-only counters for health reporting
    pub fn metrics(&self) -> BusMetrics {
        BusMetrics {
            total_events: self.inner.log.latest_id(),
            events_per_second: self.inner.rate.per_second(),
            active_connections: self.inner.waiters.len() + self.inner.streams.len(),
        }
    }

    fn scan(&self, filter: &EventFilter) -> Vec<Event> {
        self.inner
            .log
            .events_since(filter.since)
            .into_iter()
            .filter(|e| filter.matches(e))
            .collect()
    }

    fn deliver(
        &self,
        connection_id: &str,
        events: Vec<Event>,
        since: u64,
        started: Instant,
    ) -> WaitReport {
        let report = WaitReport::updates(events, since, started.elapsed());
        self.inner
            .cursors
            .insert(connection_id.to_string(), report.last_event_id);
        report
    }
}

impl ChangeNotifier for EventBus {
    fn notify(&self, draft: EventDraft) -> Option<Event> {
        self.emit_change(draft)
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("running", &self.is_running())
            .field("latest_event_id", &self.latest_event_id())
            .finish()
    }
}
