//! Connection pooling subsystem.
//!
//! # Data Flow
//! ```text
//! borrow()
//!     → circuit_breaker.rs (gate on state.rs, fail fast while Open)
//!     → connection_pool.rs (permit, idle reuse or factory.rs create)
//!     → outcome recorded: failures counted, breaker tripped/closed
//!     → Pooled<C> handed to caller
//!
//! release(Pooled<C>)
//!     → validate → back to idle, or destroy
//! ```
//!
//! # Design Decisions
//! - The breaker decorates the pool; the pool knows nothing about it
//! - Borrow decisions are serialized per breaker instance
//! - Open timer is checked lazily on the next borrow (no timer task)
//! - Breaker-open and pool failures share one error type, split by reason

pub mod backoff;
pub mod circuit_breaker;
pub mod connection_pool;
pub mod factory;
pub mod state;

use std::time::Duration;

use thiserror::Error;

pub use circuit_breaker::CircuitBreakerConnectionPool;
pub use connection_pool::{ConnectionPool, Pooled};
pub use factory::{ConnectTimeout, ConnectionFactory, FactoryError, TcpConnectionFactory};
pub use state::{BreakerState, IllegalTransition, PoolState};

/// Errors raised while borrowing from a pool.
#[derive(Debug, Error)]
pub enum PoolError {
    /// The breaker is open and rejected the borrow without touching the pool.
    #[error("Circuit breaker is OPEN. Requests are blocked.")]
    BreakerOpen,

    /// Every permit is in use and the pool is configured to fail.
    #[error("Connection pool exhausted: all {max_active} connections are in use")]
    Exhausted { max_active: usize },

    /// A blocked borrow waited longer than `max_wait`, or creating a
    /// connection outlived `create_timeout` or the factory's own deadline.
    #[error("Timed out after {0:?} waiting for a pooled connection")]
    Timeout(Duration),

    /// The factory could not create a connection.
    #[error("Failed to create connection: {0}")]
    Create(String),

    /// The pool has been closed.
    #[error("Connection pool is closed")]
    Closed,

    #[error(transparent)]
    IllegalTransition(#[from] IllegalTransition),
}

impl PoolError {
    /// Machine-readable reason for monitoring.
    pub fn reason(&self) -> &'static str {
        match self {
            PoolError::BreakerOpen => "breaker_open",
            PoolError::Exhausted { .. } => "pool_exhausted",
            PoolError::Timeout(_) => "wait_timeout",
            PoolError::Create(_) => "create_failed",
            PoolError::Closed => "pool_closed",
            PoolError::IllegalTransition(_) => "illegal_state",
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, PoolError::Timeout(_))
    }
}

/// Result type for pool operations.
pub type PoolResult<T> = Result<T, PoolError>;
