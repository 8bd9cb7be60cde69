//! Connector core library.
//!
//! Shared runtime pieces for outbound connectors: a connection pool guarded
//! by a circuit breaker, and a refresh-token credential handler with a
//! shared token cache.
//!
//! # Architecture Overview
//!
//! ```text
//!     host message                ┌──────────────────────────────────────────────┐
//!     (parameters/properties)     │                 CONNECTOR CORE               │
//!     ────────────────────────────┼─▶ context ──▶ auth::ClientCredentialsHandler │
//!                                 │                  │            │              │
//!                                 │                  ▼            ▼              │
//!                                 │           TokenManager   TokenEndpoint ──────┼──▶ OAuth2 server
//!                                 │                                              │
//!     borrow / release            │  pool::CircuitBreakerConnectionPool          │
//!     ────────────────────────────┼─▶   │ PoolState (closed/open/half_open)      │
//!                                 │     ▼                                        │
//!                                 │  pool::ConnectionPool ──▶ ConnectionFactory ─┼──▶ backend
//!                                 │                                              │
//!                                 │  ┌────────────────────────────────────────┐  │
//!                                 │  │ config │ error │ observability         │  │
//!                                 │  └────────────────────────────────────────┘  │
//!                                 └──────────────────────────────────────────────┘
//! ```

// Core subsystems
pub mod auth;
pub mod pool;

// Host integration
pub mod context;

// Cross-cutting concerns
pub mod config;
pub mod error;
pub mod observability;

pub use auth::{ClientCredentialsHandler, Credentials, Token, TokenManager};
pub use config::ConnectorConfig;
pub use context::{ConnectorOperation, ConnectorResponse, MessageContext};
pub use error::{ConnectorError, ConnectorResult};
pub use pool::{BreakerState, CircuitBreakerConnectionPool, ConnectionPool, PoolState};
