//! Broadcaster - live event streaming to open subscribers
//!
//! Subscribers connect with an optional last-seen id; resident history past
//! that id is replayed first, then every newly appended event is pushed until
//! disconnect. Frames use the SSE wire format (`id:` / `event:` / `data:`
//! lines, blank-line terminated) and a periodic heartbeat frame keeps
//! intermediaries from silently dropping idle connections.
//!
//! Backpressure policy: producers never block on a slow subscriber. A full
//! outbound queue forces that subscriber's disconnect.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::mpsc;

use crate::event::{Event, EventFilter, EventLog};

/// One frame on a streaming connection
#[derive(Debug, Clone, PartialEq)]
pub enum StreamFrame {
    /// An event, replayed or live
    Event(Event),
    /// Liveness probe; carries no event data
    Heartbeat,
}

impl StreamFrame {
    /// Render the SSE wire format: id-tagged, typed, blank-line-terminated.
    pub fn sse(&self) -> String {
        match self {
            Self::Event(event) => {
                let data = serde_json::to_string(event)
                    .unwrap_or_else(|_| "{}".to_string());
                format!(
                    "id: {}\nevent: {}\ndata: {}\n\n",
                    event.id,
                    event.event_type.as_str(),
                    data
                )
            }
            Self::Heartbeat => "event: heartbeat\ndata: {}\n\n".to_string(),
        }
    }
}

/// Inputs to `EventBus::subscribe`
#[derive(Debug, Clone, Default)]
pub struct SubscribeRequest {
    /// Replay resident events after this id before going live.
    /// `None` starts at "now" (no replay).
    pub last_event_id: Option<u64>,
    /// Optional filter; unfiltered by default
    pub filter: Option<EventFilter>,
}

impl SubscribeRequest {
    /// Subscribe from "now", no replay, unfiltered
    pub fn live() -> Self {
        Self::default()
    }

    /// Replay everything resident after `id`, then go live
    pub fn replay_after(id: u64) -> Self {
        Self {
            last_event_id: Some(id),
            ..Self::default()
        }
    }

    pub fn filter(mut self, filter: EventFilter) -> Self {
        self.filter = Some(filter);
        self
    }
}

#[derive(Debug)]
struct StreamSlot {
    tx: mpsc::Sender<StreamFrame>,
    filter: Option<EventFilter>,
    /// Highest id covered by the connect-time replay; live events at or
    /// below it were already delivered and are skipped.
    floor: u64,
}

/// Registry of open streaming connections
#[derive(Debug)]
pub(crate) struct StreamRegistry {
    slots: Mutex<HashMap<u64, StreamSlot>>,
    next_id: AtomicU64,
}

impl StreamRegistry {
    pub(crate) fn new() -> Self {
        Self {
            slots: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(0),
        }
    }

    /// Register a subscriber and snapshot its replay backlog.
    ///
    /// The snapshot is taken while the registry lock is held: an append
    /// running before the slot is visible lands in the snapshot, one running
    /// after delivers through the slot. `floor` skips the overlap.
    pub(crate) fn register(
        &self,
        log: &EventLog,
        request: &SubscribeRequest,
        queue_len: usize,
    ) -> (u64, Vec<Event>, mpsc::Receiver<StreamFrame>) {
        let mut slots = self.slots.lock();

        let cursor = request.last_event_id.unwrap_or_else(|| log.latest_id());
        let replay: Vec<Event> = log
            .events_since(cursor)
            .into_iter()
            .filter(|e| request.filter.as_ref().is_none_or(|f| f.matches(e)))
            .collect();
        let floor = replay.last().map(|e| e.id).unwrap_or(cursor);

        let (tx, rx) = mpsc::channel(queue_len);
        let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        slots.insert(
            id,
            StreamSlot {
                tx,
                filter: request.filter.clone(),
                floor,
            },
        );

        tracing::debug!(subscriber_id = id, replay = replay.len(), "stream subscribed");
        (id, replay, rx)
    }

    /// Remove one subscriber (disconnect or drop)
    pub(crate) fn deregister(&self, id: u64) {
        if self.slots.lock().remove(&id).is_some() {
            tracing::debug!(subscriber_id = id, "stream deregistered");
        }
    }

    /// Push a live event to every matching subscriber. Full or closed queues
    /// force that subscriber's removal; the producer never waits.
    pub(crate) fn forward(&self, event: &Event) {
        let mut slots = self.slots.lock();
        let mut dropped = Vec::new();

        for (id, slot) in slots.iter() {
            if event.id <= slot.floor {
                continue;
            }
            if let Some(filter) = &slot.filter {
                if !filter.matches(event) {
                    continue;
                }
            }
            if slot.tx.try_send(StreamFrame::Event(event.clone())).is_err() {
                dropped.push(*id);
            }
        }

        for id in dropped {
            slots.remove(&id);
            tracing::warn!(subscriber_id = id, "dropping lagged stream subscriber");
        }
    }

    /// Push a heartbeat frame to every subscriber; lagged ones are dropped
    /// under the same policy as events.
    pub(crate) fn heartbeat(&self) {
        let mut slots = self.slots.lock();
        let mut dropped = Vec::new();

        for (id, slot) in slots.iter() {
            if slot.tx.try_send(StreamFrame::Heartbeat).is_err() {
                dropped.push(*id);
            }
        }

        for id in dropped {
            slots.remove(&id);
            tracing::warn!(subscriber_id = id, "dropping lagged stream subscriber");
        }
    }

    /// Disconnect everything (bus shutdown); dropping the senders ends each
    /// subscriber's frame stream.
    pub(crate) fn close_all(&self) {
        self.slots.lock().clear();
    }

    pub(crate) fn len(&self) -> usize {
        self.slots.lock().len()
    }
}

/// One open streaming connection.
///
/// Yields replayed frames first, then live frames and heartbeats, until the
/// bus shuts down or the subscriber is dropped for lagging. Dropping the
/// subscription deregisters it.
#[derive(Debug)]
pub struct Subscription {
    id: u64,
    replay: std::collections::VecDeque<Event>,
    rx: mpsc::Receiver<StreamFrame>,
    registry: Arc<StreamRegistry>,
}

impl Subscription {
    pub(crate) fn new(
        id: u64,
        replay: Vec<Event>,
        rx: mpsc::Receiver<StreamFrame>,
        registry: Arc<StreamRegistry>,
    ) -> Self {
        Self {
            id,
            replay: replay.into(),
            rx,
            registry,
        }
    }

    /// Subscriber id, for log correlation
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Next frame, or `None` once the connection is closed
    pub async fn next_frame(&mut self) -> Option<StreamFrame> {
        if let Some(event) = self.replay.pop_front() {
            return Some(StreamFrame::Event(event));
        }
        self.rx.recv().await
    }

    /// Non-blocking variant: whatever is ready right now
    pub fn try_next_frame(&mut self) -> Option<StreamFrame> {
        if let Some(event) = self.replay.pop_front() {
            return Some(StreamFrame::Event(event));
        }
        self.rx.try_recv().ok()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.registry.deregister(self.id);
    }
}
