//! Metrics collection and exposition.
//!
//! # Metrics
//! - `connector_pool_borrows_total` (counter): borrows by pool, outcome
//! - `connector_breaker_transitions_total` (counter): transitions by pool, target state
//! - `connector_breaker_state` (gauge): 0=closed, 1=half_open, 2=open
//! - `connector_token_requests_total` (counter): token lookups by result
//! - `connector_token_cache_size` (gauge): cached tokens

use std::net::SocketAddr;

use metrics::{counter, gauge};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

use crate::pool::BreakerState;

/// Install the Prometheus recorder and its HTTP listener.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

pub fn record_borrow(pool: &str, outcome: &'static str) {
    counter!("connector_pool_borrows_total", "pool" => pool.to_string(), "outcome" => outcome)
        .increment(1);
}

pub fn record_breaker_transition(pool: &str, to: BreakerState) {
    counter!("connector_breaker_transitions_total", "pool" => pool.to_string(), "to" => to.as_str())
        .increment(1);
    let value = match to {
        BreakerState::Closed => 0.0,
        BreakerState::HalfOpen => 1.0,
        BreakerState::Open => 2.0,
    };
    gauge!("connector_breaker_state", "pool" => pool.to_string()).set(value);
}

pub fn record_token_request(result: &'static str) {
    counter!("connector_token_requests_total", "result" => result).increment(1);
}

pub fn record_token_cache_size(size: usize) {
    gauge!("connector_token_cache_size").set(size as f64);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_install_failure_is_returned() {
        let addr: SocketAddr = "127.0.0.1:0".parse().unwrap();
        // Only one global recorder may exist per process.
        let _ = init_metrics(addr);
        assert!(init_metrics(addr).is_err());
    }
}
