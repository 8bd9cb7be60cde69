//! Circuit breaker around a connection pool.
//!
//! # States
//! - Closed: borrows go to the pool, failures are counted
//! - Open: borrows fail fast without touching the pool
//! - Half-Open: one probe borrow is let through
//!
//! # State Transitions
//! ```text
//! Closed → Open:      failure_count >= failure_threshold (base open duration)
//! Open → Half-Open:   next borrow after current open duration elapsed
//! Half-Open → Closed: probe borrow succeeds (counters reset)
//! Half-Open → Open:   probe borrow fails (open duration escalated)
//! ```
//!
//! # Design Decisions
//! - One async mutex per pool covers check, delegate and update, so
//!   concurrent borrows cannot race the counter or double-trip
//! - Only the probe's own failure escalates the open duration
//! - A success while Closed resets the count, so only consecutive failures trip

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;

use crate::config::{BreakerConfig, PoolConfig};
use crate::observability::metrics;
use crate::pool::backoff::{as_duration, next_open_duration};
use crate::pool::connection_pool::{ConnectionPool, Pooled};
use crate::pool::factory::ConnectionFactory;
use crate::pool::state::{BreakerState, PoolState};
use crate::pool::{PoolError, PoolResult};

#[derive(Debug)]
struct Counters {
    failure_count: u32,
    current_open_duration_ms: u64,
}

/// A connection pool that stops lending once its backend keeps failing.
pub struct CircuitBreakerConnectionPool<F: ConnectionFactory> {
    name: String,
    pool: Arc<ConnectionPool<F>>,
    state: Arc<PoolState>,
    config: BreakerConfig,
    counters: Mutex<Counters>,
}

impl<F: ConnectionFactory> CircuitBreakerConnectionPool<F> {
    /// Create a breaker-protected pool.
    ///
    /// The breaker settings come from `config.circuit_breaker`.
    pub fn new(name: impl Into<String>, factory: F, config: PoolConfig, state: Arc<PoolState>) -> Self {
        let breaker = config.circuit_breaker.clone();
        Self {
            name: name.into(),
            pool: Arc::new(ConnectionPool::new(factory, config)),
            state,
            counters: Mutex::new(Counters {
                failure_count: 0,
                current_open_duration_ms: breaker.open_duration_ms,
            }),
            config: breaker,
        }
    }

    /// Borrow a connection through the breaker.
    pub async fn borrow(&self) -> PoolResult<Pooled<F::Connection>> {
        let mut counters = self.counters.lock().await;

        if self.state.state() == BreakerState::Open {
            let elapsed = self
                .state
                .opened_at()
                .map(|opened| opened.elapsed())
                .unwrap_or(Duration::MAX);
            if elapsed >= as_duration(counters.current_open_duration_ms) {
                tracing::info!(pool = %self.name, "Switching circuit breaker to HALF_OPEN state after open duration expired");
                self.state.half_open()?;
                metrics::record_breaker_transition(&self.name, BreakerState::HalfOpen);
            } else {
                metrics::record_borrow(&self.name, PoolError::BreakerOpen.reason());
                return Err(PoolError::BreakerOpen);
            }
        }

        match self.pool.borrow().await {
            Ok(conn) => {
                if self.state.state() == BreakerState::HalfOpen {
                    self.close_breaker(&mut counters)?;
                } else {
                    counters.failure_count = 0;
                }
                metrics::record_borrow(&self.name, "ok");
                Ok(conn)
            }
            Err(err) => {
                match self.state.state() {
                    BreakerState::Closed => {
                        counters.failure_count += 1;
                        if counters.failure_count >= self.config.failure_threshold {
                            tracing::warn!(
                                pool = %self.name,
                                failures = counters.failure_count,
                                error = %err,
                                "Circuit breaker tripped, switching to OPEN state"
                            );
                            self.trip_breaker(&mut counters, false);
                        }
                    }
                    BreakerState::HalfOpen => {
                        tracing::warn!(pool = %self.name, error = %err, "Connection failed in HALF_OPEN state, switching to OPEN state");
                        self.trip_breaker(&mut counters, true);
                    }
                    BreakerState::Open => {}
                }
                metrics::record_borrow(&self.name, err.reason());
                Err(err)
            }
        }
    }

    /// Return a connection to the underlying pool.
    pub fn release(&self, conn: Pooled<F::Connection>) {
        self.pool.release(conn);
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn state(&self) -> BreakerState {
        self.state.state()
    }

    pub fn pool_state(&self) -> &Arc<PoolState> {
        &self.state
    }

    /// The wrapped pool, for stats, eviction and shutdown.
    pub fn pool(&self) -> &Arc<ConnectionPool<F>> {
        &self.pool
    }

    pub async fn failure_count(&self) -> u32 {
        self.counters.lock().await.failure_count
    }

    pub async fn current_open_duration(&self) -> Duration {
        as_duration(self.counters.lock().await.current_open_duration_ms)
    }

    fn trip_breaker(&self, counters: &mut Counters, escalate: bool) {
        self.state.open();
        if escalate {
            counters.current_open_duration_ms = next_open_duration(
                counters.current_open_duration_ms,
                self.config.open_duration_progress_factor,
                self.config.max_open_duration_ms,
            );
        }
        counters.failure_count = 0;
        tracing::info!(
            pool = %self.name,
            open_duration_ms = counters.current_open_duration_ms,
            "Circuit breaker OPEN"
        );
        metrics::record_breaker_transition(&self.name, BreakerState::Open);
    }

    fn close_breaker(&self, counters: &mut Counters) -> PoolResult<()> {
        self.state.close()?;
        counters.failure_count = 0;
        counters.current_open_duration_ms = self.config.open_duration_ms;
        tracing::info!(pool = %self.name, "Probe succeeded, circuit breaker CLOSED");
        metrics::record_breaker_transition(&self.name, BreakerState::Closed);
        Ok(())
    }
}
