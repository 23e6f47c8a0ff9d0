//! Coordinator configuration with TOML file support.

use serde::{Deserialize, Serialize};

use tumbler_types::params::{
    DEFAULT_MAX_POOL_PARTICIPANTS, DEFAULT_MIN_POOL_PARTICIPANTS, MIN_PEER_PROTO_VERSION,
    QUEUE_TIMEOUT_SECS, SIGNING_TIMEOUT_SECS,
};

use crate::error::CoordinatorError;

/// Configuration for a mixing coordinator.
///
/// Can be loaded from a TOML file via [`CoordinatorConfig::from_toml_file`]
/// or built programmatically (e.g. for tests).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CoordinatorConfig {
    /// Whether this node runs the mixing state machine at all.
    /// When false, every inbound mixing message and tick is dropped silently.
    #[serde(default = "default_true")]
    pub coordinator_mode: bool,

    /// Minimum participants before a timed-out queue may still proceed.
    #[serde(default = "default_min_participants")]
    pub min_pool_participants: usize,

    /// Participants at which the queue is full and becomes ready.
    #[serde(default = "default_max_participants")]
    pub max_pool_participants: usize,

    /// Timeout for the Queue and AcceptingEntries phases, seconds.
    #[serde(default = "default_queue_timeout")]
    pub queue_timeout_secs: i64,

    /// Timeout for the Signing phase, seconds.
    #[serde(default = "default_signing_timeout")]
    pub signing_timeout_secs: i64,

    /// Minimum peer protocol version admitted to the pool.
    #[serde(default = "default_min_proto_version")]
    pub min_peer_proto_version: u32,

    /// Maintenance tick interval, milliseconds.
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,

    /// Log format: "human" or "json".
    #[serde(default = "default_log_format")]
    pub log_format: String,

    /// Log level filter: "trace", "debug", "info", "warn", "error".
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

// ── Serde default helpers ──────────────────────────────────────────────

fn default_true() -> bool {
    true
}

fn default_min_participants() -> usize {
    DEFAULT_MIN_POOL_PARTICIPANTS
}

fn default_max_participants() -> usize {
    DEFAULT_MAX_POOL_PARTICIPANTS
}

fn default_queue_timeout() -> i64 {
    QUEUE_TIMEOUT_SECS
}

fn default_signing_timeout() -> i64 {
    SIGNING_TIMEOUT_SECS
}

fn default_min_proto_version() -> u32 {
    MIN_PEER_PROTO_VERSION
}

fn default_tick_interval_ms() -> u64 {
    1000
}

fn default_log_format() -> String {
    "human".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

// ── Impl ───────────────────────────────────────────────────────────────

impl CoordinatorConfig {
    /// Load configuration from a TOML file.
    pub fn from_toml_file(path: &str) -> Result<Self, CoordinatorError> {
        let content =
            std::fs::read_to_string(path).map_err(|e| CoordinatorError::Config(e.to_string()))?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self, CoordinatorError> {
        toml::from_str(s).map_err(|e| CoordinatorError::Config(e.to_string()))
    }

    /// Serialize the configuration to a TOML string.
    pub fn to_toml_string(&self) -> String {
        toml::to_string_pretty(self).expect("CoordinatorConfig is always serializable to TOML")
    }
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            coordinator_mode: true,
            min_pool_participants: default_min_participants(),
            max_pool_participants: default_max_participants(),
            queue_timeout_secs: default_queue_timeout(),
            signing_timeout_secs: default_signing_timeout(),
            min_peer_proto_version: default_min_proto_version(),
            tick_interval_ms: default_tick_interval_ms(),
            log_format: default_log_format(),
            log_level: default_log_level(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_round_trips_through_toml() {
        let config = CoordinatorConfig::default();
        let toml_str = config.to_toml_string();
        let parsed = CoordinatorConfig::from_toml_str(&toml_str).expect("should parse");
        assert_eq!(parsed.max_pool_participants, config.max_pool_participants);
        assert_eq!(parsed.queue_timeout_secs, config.queue_timeout_secs);
    }

    #[test]
    fn minimal_toml_uses_defaults() {
        let config = CoordinatorConfig::from_toml_str("").expect("empty toml should use defaults");
        assert!(config.coordinator_mode);
        assert_eq!(config.min_pool_participants, 3);
        assert_eq!(config.queue_timeout_secs, 30);
        assert_eq!(config.signing_timeout_secs, 15);
        assert_eq!(config.min_peer_proto_version, 70206);
    }

    #[test]
    fn partial_toml_overrides() {
        let toml = r#"
            max_pool_participants = 3
            log_level = "debug"
        "#;
        let config = CoordinatorConfig::from_toml_str(toml).expect("should parse");
        assert_eq!(config.max_pool_participants, 3);
        assert_eq!(config.log_level, "debug");
        assert_eq!(config.min_pool_participants, 3); // default
    }

    #[test]
    fn missing_file_returns_config_error() {
        let result = CoordinatorConfig::from_toml_file("/nonexistent/tumbler.toml");
        assert!(matches!(result, Err(CoordinatorError::Config(_))));
    }
}
