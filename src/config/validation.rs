//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (sizes > 0, durations ordered)
//! - Check the metrics address when metrics are enabled
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ConnectorConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use thiserror::Error;

use crate::config::schema::{ConnectorConfig, ExhaustedAction};

/// A single rejected setting.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

pub fn validate_config(config: &ConnectorConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    let pool = &config.pool;
    if pool.max_active == 0 {
        errors.push(ValidationError::new("pool.max_active", "must be greater than 0"));
    }
    if pool.max_idle > pool.max_active {
        errors.push(ValidationError::new(
            "pool.max_idle",
            format!("must not exceed max_active ({})", pool.max_active),
        ));
    }
    if pool.exhausted_action == ExhaustedAction::Block && pool.max_wait_ms == 0 {
        errors.push(ValidationError::new(
            "pool.max_wait_ms",
            "must be greater than 0 when exhausted_action is block",
        ));
    }

    if pool.create_timeout_ms == 0 {
        errors.push(ValidationError::new("pool.create_timeout_ms", "must be greater than 0"));
    }

    let breaker = &pool.circuit_breaker;
    if breaker.failure_threshold == 0 {
        errors.push(ValidationError::new(
            "pool.circuit_breaker.failure_threshold",
            "must be greater than 0",
        ));
    }
    if breaker.open_duration_ms == 0 {
        errors.push(ValidationError::new(
            "pool.circuit_breaker.open_duration_ms",
            "must be greater than 0",
        ));
    }
    if breaker.max_open_duration_ms < breaker.open_duration_ms {
        errors.push(ValidationError::new(
            "pool.circuit_breaker.max_open_duration_ms",
            format!("must be at least open_duration_ms ({})", breaker.open_duration_ms),
        ));
    }
    if breaker.open_duration_progress_factor == 0 {
        errors.push(ValidationError::new(
            "pool.circuit_breaker.open_duration_progress_factor",
            "must be at least 1",
        ));
    }

    let client = &config.token_client;
    if client.request_timeout_secs == 0 {
        errors.push(ValidationError::new(
            "token_client.request_timeout_secs",
            "must be greater than 0",
        ));
    }
    if client.connect_timeout_secs == 0 {
        errors.push(ValidationError::new(
            "token_client.connect_timeout_secs",
            "must be greater than 0",
        ));
    }

    let obs = &config.observability;
    if obs.metrics_enabled && obs.metrics_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            format!("invalid socket address '{}'", obs.metrics_address),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
