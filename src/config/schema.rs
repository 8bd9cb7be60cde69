//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the connector.
//! All types derive Serde traits for deserialization from config files.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::context::constants;
use crate::context::params::{get_parameter, ParamType};
use crate::context::MessageContext;
use crate::error::ConnectorError;

/// Root configuration for the connector.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ConnectorConfig {
    /// Connection pool and circuit breaker settings.
    pub pool: PoolConfig,

    /// HTTP client settings for token endpoint calls.
    pub token_client: TokenClientConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// What the pool does when every permit is in use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ExhaustedAction {
    /// Fail the borrow immediately.
    Fail,
    /// Wait up to `max_wait_ms` for a connection to be released.
    #[default]
    Block,
    /// Create a connection beyond `max_active`.
    Grow,
}

impl ExhaustedAction {
    /// Parse the numeric or named form used by connector parameters.
    pub fn from_param(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "0" | "fail" => Some(ExhaustedAction::Fail),
            "1" | "block" => Some(ExhaustedAction::Block),
            "2" | "grow" => Some(ExhaustedAction::Grow),
            _ => None,
        }
    }
}

/// Connection pool configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PoolConfig {
    /// Maximum connections handed out at once.
    pub max_active: usize,

    /// Maximum idle connections kept for reuse.
    pub max_idle: usize,

    /// How long a blocked borrow waits, in milliseconds.
    pub max_wait_ms: u64,

    /// Minimum idle age before a connection may be evicted, in milliseconds.
    pub min_eviction_time_ms: u64,

    /// Background eviction interval in milliseconds (0 disables the evictor).
    pub eviction_check_interval_ms: u64,

    /// Upper bound on a single factory `create`, in milliseconds.
    pub create_timeout_ms: u64,

    /// Behaviour when the pool is exhausted.
    pub exhausted_action: ExhaustedAction,

    /// Circuit breaker wrapped around borrow.
    pub circuit_breaker: BreakerConfig,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_active: 8,
            max_idle: 8,
            max_wait_ms: 5_000,
            min_eviction_time_ms: 1_800_000,
            eviction_check_interval_ms: 0,
            create_timeout_ms: 30_000,
            exhausted_action: ExhaustedAction::default(),
            circuit_breaker: BreakerConfig::default(),
        }
    }
}

impl PoolConfig {
    pub fn max_wait(&self) -> Duration {
        Duration::from_millis(self.max_wait_ms)
    }

    pub fn min_eviction_time(&self) -> Duration {
        Duration::from_millis(self.min_eviction_time_ms)
    }

    pub fn create_timeout(&self) -> Duration {
        Duration::from_millis(self.create_timeout_ms)
    }

    pub fn eviction_check_interval(&self) -> Option<Duration> {
        (self.eviction_check_interval_ms > 0)
            .then(|| Duration::from_millis(self.eviction_check_interval_ms))
    }

    /// Overlay pool parameters supplied by the host message context.
    ///
    /// Absent parameters keep the current value; present but malformed ones
    /// are configuration errors.
    pub fn apply_parameters(&mut self, ctx: &dyn MessageContext) -> Result<(), ConnectorError> {
        if let Some(v) = get_parameter(ctx, constants::MAX_ACTIVE_CONNECTIONS, ParamType::Integer, true)? {
            self.max_active = non_negative(constants::MAX_ACTIVE_CONNECTIONS, v.as_i64())?;
        }
        if let Some(v) = get_parameter(ctx, constants::MAX_IDLE_CONNECTIONS, ParamType::Integer, true)? {
            self.max_idle = non_negative(constants::MAX_IDLE_CONNECTIONS, v.as_i64())?;
        }
        if let Some(v) = get_parameter(ctx, constants::MAX_WAIT_TIME, ParamType::Integer, true)? {
            self.max_wait_ms = non_negative(constants::MAX_WAIT_TIME, v.as_i64())? as u64;
        }
        if let Some(v) = get_parameter(ctx, constants::MAX_EVICTION_TIME, ParamType::Integer, true)? {
            self.min_eviction_time_ms = non_negative(constants::MAX_EVICTION_TIME, v.as_i64())? as u64;
        }
        if let Some(v) = get_parameter(ctx, constants::EVICTION_CHECK_INTERVAL, ParamType::Integer, true)? {
            self.eviction_check_interval_ms =
                non_negative(constants::EVICTION_CHECK_INTERVAL, v.as_i64())? as u64;
        }
        if let Some(v) = get_parameter(ctx, constants::EXHAUSTED_ACTION, ParamType::String, true)? {
            let raw = v.as_str().unwrap_or_default();
            self.exhausted_action = ExhaustedAction::from_param(raw).ok_or_else(|| {
                ConnectorError::Config(format!(
                    "Parameter {} has unsupported value {}",
                    constants::EXHAUSTED_ACTION,
                    raw
                ))
            })?;
        }
        Ok(())
    }
}

fn non_negative(name: &str, value: Option<i64>) -> Result<usize, ConnectorError> {
    value
        .and_then(|v| usize::try_from(v).ok())
        .ok_or_else(|| ConnectorError::Config(format!("Parameter {} must not be negative", name)))
}

/// Circuit breaker configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BreakerConfig {
    /// Consecutive failures before the breaker opens.
    pub failure_threshold: u32,

    /// First open duration in milliseconds.
    pub open_duration_ms: u64,

    /// Ceiling for escalated open durations in milliseconds.
    pub max_open_duration_ms: u64,

    /// Multiplier applied to the open duration after each failed probe.
    pub open_duration_progress_factor: u32,
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            open_duration_ms: 5_000,
            max_open_duration_ms: 300_000,
            open_duration_progress_factor: 2,
        }
    }
}

/// HTTP client configuration for the token endpoint.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TokenClientConfig {
    /// Total request timeout in seconds.
    pub request_timeout_secs: u64,

    /// Connection establishment timeout in seconds.
    pub connect_timeout_secs: u64,
}

impl Default for TokenClientConfig {
    fn default() -> Self {
        Self {
            request_timeout_secs: 30,
            connect_timeout_secs: 10,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Emit JSON log lines instead of the human-readable format.
    pub json_logs: bool,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logs: false,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::SimpleContext;

    #[test]
    fn test_minimal_toml_uses_defaults() {
        let config: ConnectorConfig = toml::from_str("").unwrap();
        assert_eq!(config.pool.max_active, 8);
        assert_eq!(config.pool.exhausted_action, ExhaustedAction::Block);
        assert_eq!(config.pool.circuit_breaker.failure_threshold, 5);
        assert!(config.pool.eviction_check_interval().is_none());
    }

    #[test]
    fn test_nested_breaker_section() {
        let config: ConnectorConfig = toml::from_str(
            r#"
            [pool]
            max_active = 2
            exhausted_action = "fail"

            [pool.circuit_breaker]
            failure_threshold = 3
            open_duration_ms = 1000
            "#,
        )
        .unwrap();
        assert_eq!(config.pool.max_active, 2);
        assert_eq!(config.pool.exhausted_action, ExhaustedAction::Fail);
        assert_eq!(config.pool.circuit_breaker.failure_threshold, 3);
        assert_eq!(config.pool.circuit_breaker.open_duration_ms, 1000);
        assert_eq!(config.pool.circuit_breaker.open_duration_progress_factor, 2);
    }

    #[test]
    fn test_apply_parameters() {
        let ctx = SimpleContext::new()
            .with_parameter(constants::MAX_ACTIVE_CONNECTIONS, "20")
            .with_parameter(constants::MAX_WAIT_TIME, "250")
            .with_parameter(constants::EXHAUSTED_ACTION, "2");

        let mut pool = PoolConfig::default();
        pool.apply_parameters(&ctx).unwrap();
        assert_eq!(pool.max_active, 20);
        assert_eq!(pool.max_wait_ms, 250);
        assert_eq!(pool.exhausted_action, ExhaustedAction::Grow);
        // Untouched fields keep their defaults.
        assert_eq!(pool.max_idle, 8);
    }

    #[test]
    fn test_apply_parameters_rejects_bad_values() {
        let ctx = SimpleContext::new().with_parameter(constants::MAX_IDLE_CONNECTIONS, "lots");
        let err = PoolConfig::default().apply_parameters(&ctx).unwrap_err();
        assert!(err.to_string().contains("maxIdleConnections"));

        let ctx = SimpleContext::new().with_parameter(constants::MAX_ACTIVE_CONNECTIONS, "-1");
        assert!(PoolConfig::default().apply_parameters(&ctx).is_err());

        let ctx = SimpleContext::new().with_parameter(constants::EXHAUSTED_ACTION, "explode");
        assert!(PoolConfig::default().apply_parameters(&ctx).is_err());
    }
}
