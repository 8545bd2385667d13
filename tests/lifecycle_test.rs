//! Lifecycle Tests
//!
//! The bus is an explicitly constructed, lifecycle-scoped instance: `start`
//! allocates, `stop` rejects further emits, resolves pending waiters with a
//! terminal status, and closes open streams.

use std::time::Duration;

use atlas_events::{
    BusConfig, EventBus, EventDraft, SubscribeRequest, WaitRequest, WaitStatus,
};
use pretty_assertions::assert_eq;

#[tokio::test]
async fn start_rejects_unusable_config() {
    let err = EventBus::start(BusConfig {
        capacity: 0,
        ..BusConfig::default()
    })
    .unwrap_err();
    assert_eq!(err.code(), "ATLAS-010");
}

#[tokio::test]
async fn stop_rejects_further_emits() {
    let bus = EventBus::start(BusConfig::default()).unwrap();
    bus.emit(EventDraft::create("note")).unwrap();
    bus.stop();

    let err = bus.emit(EventDraft::create("note")).unwrap_err();
    assert_eq!(err.code(), "ATLAS-002");
    assert!(!bus.is_running());
}

#[tokio::test]
async fn stop_resolves_pending_waiters_with_shutdown_status() {
    let bus = EventBus::start(BusConfig::default()).unwrap();

    let waiter = {
        let bus = bus.clone();
        tokio::spawn(async move {
            bus.wait_for_updates(WaitRequest::new("claude").since(0).timeout_secs(300))
                .await
        })
    };

    tokio::time::sleep(Duration::from_millis(20)).await;
    bus.stop();

    let report = waiter.await.unwrap();
    assert_eq!(report.status, WaitStatus::Shutdown);
    assert!(report.events.is_empty());
    assert_eq!(report.last_event_id, 0);
}

#[tokio::test]
async fn stop_closes_open_streams() {
    let bus = EventBus::start(BusConfig::default()).unwrap();
    let mut sub = bus.subscribe(SubscribeRequest::live()).unwrap();

    bus.stop();

    assert!(sub.next_frame().await.is_none());
    assert_eq!(bus.metrics().active_connections, 0);
}

#[tokio::test]
async fn wait_on_stopped_bus_reports_error_status() {
    // The RPC boundary sees a structured error report, not a thrown error
    let bus = EventBus::start(BusConfig::default()).unwrap();
    bus.stop();

    let report = bus
        .wait_for_updates(WaitRequest::new("claude").since(0).timeout_secs(5))
        .await;

    assert_eq!(report.status, WaitStatus::Error);
    assert!(report.error.is_some());
    assert!(report.events.is_empty());
}

#[tokio::test]
async fn stop_drains_the_log() {
    let bus = EventBus::start(BusConfig::default()).unwrap();
    for _ in 0..5 {
        bus.emit(EventDraft::update("note")).unwrap();
    }
    bus.stop();

    let metrics = bus.metrics();
    assert_eq!(metrics.active_connections, 0);
    assert_eq!(metrics.events_per_second, 0.0);
}

#[tokio::test]
async fn metrics_track_connections_and_totals() {
    let bus = EventBus::start(BusConfig::default()).unwrap();
    bus.emit(EventDraft::create("note")).unwrap();

    let _sub = bus.subscribe(SubscribeRequest::live()).unwrap();
    let waiter = {
        let bus = bus.clone();
        tokio::spawn(async move {
            bus.wait_for_updates(WaitRequest::new("claude").timeout_secs(5))
                .await
        })
    };
    tokio::time::sleep(Duration::from_millis(20)).await;

    let metrics = bus.metrics();
    assert_eq!(metrics.total_events, 1);
    assert_eq!(metrics.active_connections, 2);

    bus.stop();
    waiter.await.unwrap();
}

#[tokio::test]
async fn waiter_registry_does_not_leak_after_timeout() {
    let bus = EventBus::start(BusConfig::default()).unwrap();

    for _ in 0..5 {
        let report = bus
            .wait_for_updates(WaitRequest::new("claude").since(0).timeout_secs(0))
            .await;
        assert_eq!(report.status, WaitStatus::Timeout);
    }

    assert_eq!(bus.metrics().active_connections, 0);
}

#[tokio::test]
async fn waiter_registry_does_not_leak_after_cancellation() {
    let bus = EventBus::start(BusConfig::default()).unwrap();

    let waiter = {
        let bus = bus.clone();
        tokio::spawn(async move {
            bus.wait_for_updates(WaitRequest::new("claude").since(0).timeout_secs(300))
                .await
        })
    };

    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(bus.metrics().active_connections, 1);

    waiter.abort();
    let _ = waiter.await;
    // The drop guard runs when the parked future is cancelled
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(bus.metrics().active_connections, 0);
}
