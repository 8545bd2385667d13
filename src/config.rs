//! Bus Configuration Module
//!
//! Capacity and timing knobs for the event bus. Config is stored in
//! `~/.config/atlas/events.toml`.
//!
//! ## Priority Order (highest to lowest)
//!
//! 1. Environment variables (`ATLAS_EVENTS_CAPACITY`, `ATLAS_EVENTS_HEARTBEAT_SECS`)
//! 2. Config file (`~/.config/atlas/events.toml`)
//! 3. Defaults

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{AtlasError, Result};

/// Hard ceiling on long-poll timeouts, in seconds. Requests above this clamp down.
pub const MAX_WAIT_SECS: u64 = 300;

/// Event bus configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct BusConfig {
    /// Ring-buffer capacity: events resident for replay. Oldest are evicted
    /// first; an evicted id can no longer be caught up from (`history_truncated`).
    pub capacity: usize,

    /// Seconds between heartbeat frames on streaming connections.
    pub heartbeat_secs: u64,

    /// Bound of each subscriber's outbound frame queue. A subscriber that
    /// falls this far behind is disconnected rather than stalling producers.
    pub stream_queue_len: usize,

    /// Sliding window, in seconds, for the events-per-second metric.
    pub rate_window_secs: u64,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            capacity: 1000,
            heartbeat_secs: 15,
            stream_queue_len: 64,
            rate_window_secs: 60,
        }
    }
}

impl BusConfig {
    /// Get the config directory path
    ///
    /// Returns `~/.config/atlas/` on Unix, `%APPDATA%/atlas/` on Windows
    pub fn config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("atlas")
    }

    /// Get the config file path
    ///
    /// Returns `~/.config/atlas/events.toml`
    pub fn config_path() -> PathBuf {
        Self::config_dir().join("events.toml")
    }

    /// Load configuration from the default path
    ///
    /// Returns default config if the file doesn't exist.
    /// Returns error if the file exists but is malformed.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path())
    }

    /// Load configuration from an explicit path
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path).map_err(|e| AtlasError::ConfigLoad {
            reason: format!("Failed to read config file: {}", e),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| AtlasError::ConfigLoad {
            reason: format!("Failed to parse config file: {}", e),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Merge with environment variables
    ///
    /// Environment variables take precedence over config file values.
    /// Unparseable values are ignored with a warning.
    pub fn with_env(mut self) -> Self {
        if let Ok(raw) = std::env::var("ATLAS_EVENTS_CAPACITY") {
            match raw.parse::<usize>() {
                Ok(n) if n > 0 => self.capacity = n,
                _ => tracing::warn!(raw, "ignoring unparseable ATLAS_EVENTS_CAPACITY"),
            }
        }

        if let Ok(raw) = std::env::var("ATLAS_EVENTS_HEARTBEAT_SECS") {
            match raw.parse::<u64>() {
                Ok(n) if n > 0 => self.heartbeat_secs = n,
                _ => tracing::warn!(raw, "ignoring unparseable ATLAS_EVENTS_HEARTBEAT_SECS"),
            }
        }

        self
    }

    /// Reject configurations the bus cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.capacity == 0 {
            return Err(AtlasError::InvalidConfig {
                reason: "capacity must be non-zero".to_string(),
            });
        }
        if self.stream_queue_len == 0 {
            return Err(AtlasError::InvalidConfig {
                reason: "stream_queue_len must be non-zero".to_string(),
            });
        }
        if self.heartbeat_secs == 0 {
            return Err(AtlasError::InvalidConfig {
                reason: "heartbeat_secs must be non-zero".to_string(),
            });
        }
        Ok(())
    }

    /// Heartbeat cadence as a `Duration`
    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_secs(self.heartbeat_secs)
    }

    /// Rate-metric window as a `Duration`
    pub fn rate_window(&self) -> Duration {
        Duration::from_secs(self.rate_window_secs)
    }

    /// Clamp a requested long-poll timeout to `[0, MAX_WAIT_SECS]`
    pub fn clamp_wait(&self, requested_secs: u64) -> Duration {
        Duration::from_secs(requested_secs.min(MAX_WAIT_SECS))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::env;
    use tempfile::TempDir;

    #[test]
    fn config_path_contains_atlas() {
        let path = BusConfig::config_path();
        assert!(path.to_string_lossy().contains("atlas"));
        assert!(path.to_string_lossy().ends_with("events.toml"));
    }

    #[test]
    fn defaults_are_valid() {
        let config = BusConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.capacity, 1000);
        assert_eq!(config.heartbeat_secs, 15);
    }

    #[test]
    fn load_from_missing_file_returns_default() {
        let temp_dir = TempDir::new().unwrap();
        let config = BusConfig::load_from(&temp_dir.path().join("absent.toml")).unwrap();
        assert_eq!(config, BusConfig::default());
    }

    #[test]
    fn save_and_load_roundtrip() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("events.toml");

        let config = BusConfig {
            capacity: 64,
            heartbeat_secs: 5,
            stream_queue_len: 8,
            rate_window_secs: 30,
        };

        let content = toml::to_string_pretty(&config).unwrap();
        fs::write(&path, &content).unwrap();

        let loaded = BusConfig::load_from(&path).unwrap();
        assert_eq!(config, loaded);
    }

    #[test]
    fn partial_file_fills_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("events.toml");
        fs::write(&path, "capacity = 10\n").unwrap();

        let loaded = BusConfig::load_from(&path).unwrap();
        assert_eq!(loaded.capacity, 10);
        assert_eq!(loaded.heartbeat_secs, BusConfig::default().heartbeat_secs);
    }

    #[test]
    fn zero_capacity_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("events.toml");
        fs::write(&path, "capacity = 0\n").unwrap();

        let err = BusConfig::load_from(&path).unwrap_err();
        assert_eq!(err.code(), "ATLAS-010");
    }

    #[test]
    fn malformed_toml_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("events.toml");
        fs::write(&path, "capacity = [not toml").unwrap();

        let err = BusConfig::load_from(&path).unwrap_err();
        assert_eq!(err.code(), "ATLAS-011");
    }

    #[test]
    #[serial]
    fn env_overrides_config() {
        env::set_var("ATLAS_EVENTS_CAPACITY", "77");

        let config = BusConfig::default().with_env();
        assert_eq!(config.capacity, 77);

        env::remove_var("ATLAS_EVENTS_CAPACITY");
    }

    #[test]
    #[serial]
    fn env_garbage_is_ignored() {
        env::set_var("ATLAS_EVENTS_CAPACITY", "many");

        let config = BusConfig::default().with_env();
        assert_eq!(config.capacity, BusConfig::default().capacity);

        env::remove_var("ATLAS_EVENTS_CAPACITY");
    }

    #[test]
    fn clamp_wait_caps_at_five_minutes() {
        let config = BusConfig::default();
        assert_eq!(config.clamp_wait(30), Duration::from_secs(30));
        assert_eq!(config.clamp_wait(9999), Duration::from_secs(MAX_WAIT_SECS));
        assert_eq!(config.clamp_wait(0), Duration::ZERO);
    }
}
