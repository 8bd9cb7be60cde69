//! Credential refresh subsystem.
//!
//! # Data Flow
//! ```text
//! get_valid_token(connection, credentials, token_endpoint)
//!     → handler.rs (validate inputs, derive cache key)
//!     → token.rs TokenManager (fast path: active token, no I/O)
//!     → on miss/expiry: refresh lock → endpoint.rs (form POST)
//!     → TokenManager::add_token → access token to caller
//! ```
//!
//! # Design Decisions
//! - Lazy expiry: dead entries are dropped when next looked up
//! - One refresh in flight per handler; waiters re-check the cache
//! - The cache is injected, so tests and tenants get isolated instances
//! - A failed refresh never leaves an entry behind

pub mod endpoint;
pub mod handler;
pub mod token;

use thiserror::Error;

pub use endpoint::{HttpTokenEndpoint, TokenEndpoint};
pub use handler::{token_key, ClientCredentialsHandler, Credentials};
pub use token::{Token, TokenManager};

/// Errors from the token endpoint.
#[derive(Debug, Error)]
pub enum TokenError {
    /// Non-200 response from the token endpoint.
    #[error("Error occurred while retrieving access token. Response: [Status : {status} Message: {body}]")]
    Status { status: u16, body: String },

    /// The response carried no body.
    #[error("Failed to retrieve access token : No entity received.")]
    MissingEntity,

    /// A 200 response without a usable `access_token`/`expires_in`.
    #[error("Failed to parse access token response: {0}")]
    Malformed(String),

    /// The HTTP client timed out.
    #[error("Timed out while retrieving access token")]
    Timeout,

    /// Connection or protocol failure.
    #[error("Error occurred while retrieving access token: {0}")]
    Transport(String),

    /// The token endpoint is not a valid URL.
    #[error("Invalid token endpoint: {0}")]
    InvalidEndpoint(String),
}

impl TokenError {
    pub fn reason(&self) -> &'static str {
        match self {
            TokenError::Status { .. } => "token_status",
            TokenError::MissingEntity => "token_missing_entity",
            TokenError::Malformed(_) => "token_malformed",
            TokenError::Timeout => "token_timeout",
            TokenError::Transport(_) => "token_transport",
            TokenError::InvalidEndpoint(_) => "token_invalid_endpoint",
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, TokenError::Timeout)
    }

    /// Upstream HTTP status, when the endpoint answered.
    pub fn status(&self) -> Option<u16> {
        match self {
            TokenError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}
