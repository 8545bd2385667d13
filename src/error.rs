//! Atlas Events Error Types with Error Codes
//!
//! Error code ranges:
//! - ATLAS-000-009: Bus lifecycle errors
//! - ATLAS-010-019: Configuration errors
//! - ATLAS-020-029: Delivery errors
//! - ATLAS-090-099: IO/serialization errors
//!
//! Lifecycle errors are translated to `status: "error"` reports at the
//! remote-procedure boundary (see [`crate::bus::WaitReport`]); callers there
//! never observe a Rust error.

use miette::Diagnostic;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, AtlasError>;

/// All error variants are part of the public API.
///
/// Implements both `thiserror::Error` for std error compatibility
/// and `miette::Diagnostic` for fancy terminal error display.
#[derive(Error, Debug, Diagnostic)]
pub enum AtlasError {
    // ═══════════════════════════════════════════
    // BUS LIFECYCLE ERRORS (000-009)
    // ═══════════════════════════════════════════
    #[error("[ATLAS-001] Event bus not started")]
    #[diagnostic(
        code(atlas::bus_not_started),
        help("Call EventBus::start(config) before emitting or waiting")
    )]
    BusNotStarted,

    #[error("[ATLAS-002] Event bus stopped")]
    #[diagnostic(
        code(atlas::bus_stopped),
        help("The bus is shutting down; no further events are accepted")
    )]
    BusStopped,

    // ═══════════════════════════════════════════
    // CONFIGURATION ERRORS (010-019)
    // ═══════════════════════════════════════════
    #[error("[ATLAS-010] Invalid configuration: {reason}")]
    #[diagnostic(
        code(atlas::invalid_config),
        help("Check events.toml values: capacity and queue bounds must be non-zero")
    )]
    InvalidConfig { reason: String },

    #[error("[ATLAS-011] Failed to load configuration: {reason}")]
    #[diagnostic(code(atlas::config_load), help("Check the config file path and TOML syntax"))]
    ConfigLoad { reason: String },

    // ═══════════════════════════════════════════
    // DELIVERY ERRORS (020-029)
    // ═══════════════════════════════════════════
    #[error("[ATLAS-020] Subscriber {subscriber_id} lagged: outbound queue full")]
    #[diagnostic(
        code(atlas::subscriber_lagged),
        help("Slow consumers are disconnected; reconnect with the last seen event id")
    )]
    SubscriberLagged { subscriber_id: u64 },

    // ═══════════════════════════════════════════
    // IO / SERIALIZATION ERRORS (090-099)
    // ═══════════════════════════════════════════
    #[error("[ATLAS-090] IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("[ATLAS-091] JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl AtlasError {
    /// Get the error code (e.g., "ATLAS-001")
    pub fn code(&self) -> &'static str {
        match self {
            Self::BusNotStarted => "ATLAS-001",
            Self::BusStopped => "ATLAS-002",
            Self::InvalidConfig { .. } => "ATLAS-010",
            Self::ConfigLoad { .. } => "ATLAS-011",
            Self::SubscriberLagged { .. } => "ATLAS-020",
            Self::Io(_) => "ATLAS-090",
            Self::Json(_) => "ATLAS-091",
        }
    }

    /// Check if the condition clears on its own (caller may retry or reconnect)
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::BusNotStarted | Self::SubscriberLagged { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bus_not_started_code_and_display() {
        let err = AtlasError::BusNotStarted;
        assert_eq!(err.code(), "ATLAS-001");
        assert!(err.to_string().contains("[ATLAS-001]"));
    }

    #[test]
    fn bus_stopped_is_terminal() {
        let err = AtlasError::BusStopped;
        assert_eq!(err.code(), "ATLAS-002");
        assert!(!err.is_recoverable());
    }

    #[test]
    fn invalid_config_carries_reason() {
        let err = AtlasError::InvalidConfig {
            reason: "capacity must be non-zero".to_string(),
        };
        assert_eq!(err.code(), "ATLAS-010");
        assert!(err.to_string().contains("capacity"));
    }

    #[test]
    fn subscriber_lagged_is_recoverable() {
        let err = AtlasError::SubscriberLagged { subscriber_id: 7 };
        assert_eq!(err.code(), "ATLAS-020");
        assert!(err.is_recoverable());
        assert!(err.to_string().contains('7'));
    }

    #[test]
    fn io_error_converts() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: AtlasError = io.into();
        assert_eq!(err.code(), "ATLAS-090");
    }

    #[test]
    fn json_error_converts() {
        let parse: serde_json::Result<serde_json::Value> = serde_json::from_str("{nope");
        let err: AtlasError = parse.unwrap_err().into();
        assert_eq!(err.code(), "ATLAS-091");
    }
}
