//! Connection factories.
//!
//! # Responsibilities
//! - Create new connections for the pool
//! - Decide whether an idle connection is still usable
//! - Tear down connections leaving the pool

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tokio::net::TcpStream;
use tokio::time::timeout;

/// Boxed error returned by factories.
pub type FactoryError = Box<dyn std::error::Error + Send + Sync>;

/// A factory gave up connecting within its own deadline.
///
/// The pool reports this as a timeout rather than a create failure.
#[derive(Debug, Clone, Error)]
#[error("connect to {address} timed out after {timeout:?}")]
pub struct ConnectTimeout {
    pub address: String,
    pub timeout: Duration,
}

/// Creates, validates and destroys pooled connections.
#[async_trait]
pub trait ConnectionFactory: Send + Sync + 'static {
    type Connection: Send + 'static;

    /// Open a new connection.
    async fn create(&self) -> Result<Self::Connection, FactoryError>;

    /// Whether a connection may be handed out (or kept idle) again.
    fn validate(&self, conn: &Self::Connection) -> bool;

    /// Tear down a connection that is leaving the pool.
    fn destroy(&self, conn: Self::Connection) {
        drop(conn);
    }
}

/// Factory for plain TCP connections.
#[derive(Debug, Clone)]
pub struct TcpConnectionFactory {
    address: String,
    connect_timeout: Duration,
}

impl TcpConnectionFactory {
    pub fn new(address: impl Into<String>, connect_timeout: Duration) -> Self {
        Self {
            address: address.into(),
            connect_timeout,
        }
    }

    pub fn address(&self) -> &str {
        &self.address
    }
}

#[async_trait]
impl ConnectionFactory for TcpConnectionFactory {
    type Connection = TcpStream;

    async fn create(&self) -> Result<TcpStream, FactoryError> {
        match timeout(self.connect_timeout, TcpStream::connect(&self.address)).await {
            Ok(Ok(stream)) => {
                tracing::debug!(addr = %self.address, "Opened TCP connection");
                Ok(stream)
            }
            Ok(Err(e)) => Err(format!("connect to {} failed: {}", self.address, e).into()),
            Err(_) => Err(ConnectTimeout {
                address: self.address.clone(),
                timeout: self.connect_timeout,
            }
            .into()),
        }
    }

    fn validate(&self, conn: &TcpStream) -> bool {
        conn.peer_addr().is_ok()
    }
}
