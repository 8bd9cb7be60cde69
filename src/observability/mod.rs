//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! pool / auth subsystems produce:
//!     → logging.rs (structured tracing events)
//!     → metrics.rs (counters, gauges)
//!
//! Consumers:
//!     → stdout (plain or JSON lines)
//!     → Prometheus scrape endpoint (optional)
//! ```
//!
//! # Design Decisions
//! - Library code only emits; installing subscribers/recorders is the
//!   binary's job
//! - Without an installed recorder every metric call is a no-op

pub mod logging;
pub mod metrics;
