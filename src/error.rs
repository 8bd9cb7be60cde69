//! Crate-level error type.
//!
//! Every subsystem error folds into [`ConnectorError`], which carries a stable
//! machine-readable code for the host framework alongside the message.

use thiserror::Error;

use crate::auth::TokenError;
use crate::context::constants::{error_codes, GENERAL_ERROR_MSG};
use crate::pool::{IllegalTransition, PoolError};

/// Errors surfaced to connector callers.
#[derive(Debug, Error)]
pub enum ConnectorError {
    /// Missing, blank or malformed configuration.
    #[error("{0}")]
    Config(String),

    /// The pool could not hand out a connection (breaker open included).
    #[error(transparent)]
    Connection(PoolError),

    /// Token endpoint call failed.
    #[error(transparent)]
    Token(#[from] TokenError),

    /// An invalid breaker state transition was attempted.
    #[error(transparent)]
    IllegalState(#[from] IllegalTransition),
}

impl From<PoolError> for ConnectorError {
    fn from(err: PoolError) -> Self {
        match err {
            PoolError::IllegalTransition(e) => ConnectorError::IllegalState(e),
            other => ConnectorError::Connection(other),
        }
    }
}

impl ConnectorError {
    /// Stable error code reported to the host.
    pub fn code(&self) -> &'static str {
        match self {
            ConnectorError::Config(_) => error_codes::INVALID_CONFIG,
            ConnectorError::Connection(_) => error_codes::CONNECTION_ERROR,
            ConnectorError::Token(_) => error_codes::TOKEN_ERROR,
            ConnectorError::IllegalState(_) => error_codes::GENERAL_ERROR,
        }
    }

    /// Finer-grained reason, e.g. to tell an open breaker from an exhausted pool.
    pub fn reason(&self) -> &'static str {
        match self {
            ConnectorError::Config(_) => "invalid_config",
            ConnectorError::Connection(e) => e.reason(),
            ConnectorError::Token(e) => e.reason(),
            ConnectorError::IllegalState(_) => "illegal_state",
        }
    }

    /// Message reported to the host, with the connector prefix.
    pub fn error_message(&self) -> String {
        format!("{}{}", GENERAL_ERROR_MSG, self)
    }

    pub fn is_timeout(&self) -> bool {
        match self {
            ConnectorError::Connection(e) => e.is_timeout(),
            ConnectorError::Token(e) => e.is_timeout(),
            _ => false,
        }
    }
}

/// Result type for connector operations.
pub type ConnectorResult<T> = Result<T, ConnectorError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::BreakerState;
    use std::time::Duration;

    #[test]
    fn test_codes() {
        assert_eq!(ConnectorError::Config("x".into()).code(), "701002");
        assert_eq!(ConnectorError::from(PoolError::BreakerOpen).code(), "701004");
        assert_eq!(ConnectorError::from(TokenError::MissingEntity).code(), "701003");

        let illegal = IllegalTransition {
            from: BreakerState::Closed,
            to: BreakerState::HalfOpen,
        };
        assert_eq!(ConnectorError::from(illegal).code(), "701001");
    }

    #[test]
    fn test_breaker_open_and_exhausted_are_distinguishable() {
        let open = ConnectorError::from(PoolError::BreakerOpen);
        let exhausted = ConnectorError::from(PoolError::Exhausted { max_active: 4 });

        assert_eq!(open.code(), exhausted.code());
        assert_ne!(open.reason(), exhausted.reason());
        assert_ne!(open.to_string(), exhausted.to_string());
    }

    #[test]
    fn test_illegal_transition_inside_pool_error_is_illegal_state() {
        let err = ConnectorError::from(PoolError::IllegalTransition(IllegalTransition {
            from: BreakerState::Open,
            to: BreakerState::Closed,
        }));
        assert!(matches!(err, ConnectorError::IllegalState(_)));
    }

    #[test]
    fn test_error_message_prefix_and_timeout() {
        let err = ConnectorError::from(PoolError::Timeout(Duration::from_millis(100)));
        assert!(err.error_message().starts_with("Connector encountered an error: "));
        assert!(err.is_timeout());
        assert!(!ConnectorError::Config("x".into()).is_timeout());
    }
}
