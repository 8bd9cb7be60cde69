//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → ConnectorConfig (validated, immutable)
//!
//! Per message:
//!     PoolConfig::apply_parameters overlays host parameters
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError};
pub use schema::BreakerConfig;
pub use schema::ConnectorConfig;
pub use schema::ExhaustedAction;
pub use schema::ObservabilityConfig;
pub use schema::PoolConfig;
pub use schema::TokenClientConfig;
