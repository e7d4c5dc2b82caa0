//! Node configuration
//!
//! Defaults match the protocol constants (5 s keepalive, 20 s peer timeout,
//! 200 ms broadcast poll). Intervals are milliseconds so tests can shrink
//! them without touching the loop code. A TOML file can override any field;
//! missing fields fall back to the defaults.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::errors::Result;

/// Production bootstrap registry endpoint.
pub const DEFAULT_REGISTRY: &str = "136.159.5.22:55921";

// ----------------------------------------------------------------------------
// Node Configuration
// ----------------------------------------------------------------------------

/// Runtime configuration for a snipnet node.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    /// Bootstrap registry endpoint as `host:port`.
    pub registry_addr: String,

    /// Interval between heartbeat/pruning passes (milliseconds).
    pub keepalive_interval_ms: u64,

    /// Silence after which a peer is evicted (milliseconds).
    pub peer_timeout_ms: u64,

    /// Outgoing-queue poll interval for the broadcast loop (milliseconds).
    pub poll_interval_ms: u64,

    /// Directory walked for `.rs` sources when the registry asks for code.
    pub source_root: String,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            registry_addr: DEFAULT_REGISTRY.to_string(),
            keepalive_interval_ms: 5_000,
            peer_timeout_ms: 20_000,
            poll_interval_ms: 200,
            source_root: ".".to_string(),
        }
    }
}

impl NodeConfig {
    /// Load configuration from a TOML file, falling back to defaults for
    /// any field the file omits.
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&contents)?)
    }

    /// Validate interval relationships.
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.keepalive_interval_ms == 0 {
            return Err("keepalive interval must be non-zero".to_string());
        }
        if self.poll_interval_ms == 0 {
            return Err("poll interval must be non-zero".to_string());
        }
        if self.peer_timeout_ms <= self.keepalive_interval_ms {
            return Err(format!(
                "peer timeout ({} ms) must exceed the keepalive interval ({} ms)",
                self.peer_timeout_ms, self.keepalive_interval_ms
            ));
        }
        if self.registry_addr.is_empty() {
            return Err("registry address must not be empty".to_string());
        }
        Ok(())
    }

    pub fn keepalive_interval(&self) -> Duration {
        Duration::from_millis(self.keepalive_interval_ms)
    }

    pub fn peer_timeout(&self) -> Duration {
        Duration::from_millis(self.peer_timeout_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_protocol_constants() {
        let config = NodeConfig::default();
        assert_eq!(config.registry_addr, DEFAULT_REGISTRY);
        assert_eq!(config.keepalive_interval(), Duration::from_secs(5));
        assert_eq!(config.peer_timeout(), Duration::from_secs(20));
        assert_eq!(config.poll_interval(), Duration::from_millis(200));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn partial_toml_overrides_only_named_fields() {
        let config: NodeConfig =
            toml::from_str("registry_addr = \"127.0.0.1:9999\"\npeer_timeout_ms = 30000\n")
                .unwrap();
        assert_eq!(config.registry_addr, "127.0.0.1:9999");
        assert_eq!(config.peer_timeout_ms, 30_000);
        assert_eq!(config.keepalive_interval_ms, 5_000);
    }

    #[test]
    fn timeout_must_exceed_keepalive() {
        let config = NodeConfig {
            keepalive_interval_ms: 5_000,
            peer_timeout_ms: 5_000,
            ..NodeConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn zero_intervals_are_rejected() {
        let config = NodeConfig {
            keepalive_interval_ms: 0,
            ..NodeConfig::default()
        };
        assert!(config.validate().is_err());

        let config = NodeConfig {
            poll_interval_ms: 0,
            ..NodeConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
