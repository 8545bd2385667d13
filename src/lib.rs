//! Atlas Events - real-time event bus for the Atlas collaboration server
//!
//! ## Module Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                        DOMAIN MODEL                          │
//! │  event/     Event envelope, filters, emission seam           │
//! └──────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌──────────────────────────────────────────────────────────────┐
//! │                      APPLICATION LAYER                       │
//! │  bus/       EventBus (long-poll, streaming, sync, metrics)   │
//! └──────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌──────────────────────────────────────────────────────────────┐
//! │                    INFRASTRUCTURE LAYER                      │
//! │  store/     In-memory resource records (snapshot source)     │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Responsibilities
//!
//! | Module | Responsibility |
//! |--------|----------------|
//! | [`event`] | `Event`, `EventDraft`, `EventFilter`, the ring-buffer `EventLog` |
//! | [`bus`] | `EventBus` lifecycle, `wait_for_updates`, `subscribe`, `sync_changes`, metrics |
//! | [`store`] | DashMap-backed resource records implementing `SnapshotProvider` |
//! | [`config`] | `BusConfig` (TOML file + env overrides) |
//! | [`error`] | `AtlasError` with error codes |
//!
//! The HTTP layer, MCP tool registration, and health endpoints live outside
//! this crate; they call [`bus::EventBus::emit_change`] after successful
//! mutations and read [`bus::EventBus::metrics`] for health reporting.

// ═══════════════════════════════════════════════════════════════
// DOMAIN MODEL - events, filters, emission seam
// ═══════════════════════════════════════════════════════════════
pub mod event;

// ═══════════════════════════════════════════════════════════════
// APPLICATION LAYER - the bus
// ═══════════════════════════════════════════════════════════════
pub mod bus;

// ═══════════════════════════════════════════════════════════════
// INFRASTRUCTURE LAYER - snapshot source
// ═══════════════════════════════════════════════════════════════
pub mod store;

// ═══════════════════════════════════════════════════════════════
// CROSS-CUTTING - error handling, configuration
// ═══════════════════════════════════════════════════════════════
pub mod config;
pub mod error;

// ═══════════════════════════════════════════════════════════════
// PUBLIC API RE-EXPORTS
// ═══════════════════════════════════════════════════════════════

// Error types
pub use error::{AtlasError, Result};

// Config types
pub use config::BusConfig;

// Event types (Domain Model)
pub use event::{
    ChangeNotifier, Event, EventDraft, EventFilter, EventLog, EventType, NoopNotifier, Priority,
};

// Bus types (Application Layer)
pub use bus::{
    BusMetrics, EventBus, SnapshotProvider, StreamFrame, SubscribeRequest, Subscription,
    SyncReport, SyncRequest, UpdateSummary, WaitReport, WaitRequest, WaitStatus,
};

// Store types
pub use store::ResourceStore;
