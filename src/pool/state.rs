//! Circuit breaker state machine.
//!
//! # States
//! - Closed: normal operation, borrows pass through
//! - Open: backend assumed down, borrows fail fast
//! - Half-Open: a single probe borrow decides recovery
//!
//! # State Transitions
//! ```text
//! any       → Open:      open()       (stamps opened_at)
//! Open      → Half-Open: half_open()
//! Half-Open → Closed:    close()      (clears opened_at)
//! ```
//!
//! # Design Decisions
//! - `open()` is accepted from every state so a failed probe can re-arm
//! - `opened_at` survives Half-Open; it is only cleared on close
//! - Guarded by its own mutex, shared with the owning pool via `Arc`

use parking_lot::Mutex;
use thiserror::Error;
use tokio::time::Instant;

/// Breaker status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakerState {
    Closed,
    Open,
    HalfOpen,
}

impl BreakerState {
    /// Stable lowercase name for logs and metric labels.
    pub fn as_str(&self) -> &'static str {
        match self {
            BreakerState::Closed => "closed",
            BreakerState::Open => "open",
            BreakerState::HalfOpen => "half_open",
        }
    }
}

impl std::fmt::Display for BreakerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.as_str())
    }
}

/// An invalid transition was requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("cannot transition to {to} from state {from}")]
pub struct IllegalTransition {
    pub from: BreakerState,
    pub to: BreakerState,
}

#[derive(Debug)]
struct Inner {
    state: BreakerState,
    opened_at: Option<Instant>,
}

/// Thread-safe breaker state.
#[derive(Debug)]
pub struct PoolState {
    inner: Mutex<Inner>,
}

impl PoolState {
    /// Create a new state machine in the Closed state.
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                state: BreakerState::Closed,
                opened_at: None,
            }),
        }
    }

    /// Move to Open and record the open time.
    pub fn open(&self) {
        let mut inner = self.inner.lock();
        inner.state = BreakerState::Open;
        inner.opened_at = Some(Instant::now());
    }

    /// Move from Open to Half-Open.
    pub fn half_open(&self) -> Result<(), IllegalTransition> {
        let mut inner = self.inner.lock();
        if inner.state != BreakerState::Open {
            return Err(IllegalTransition {
                from: inner.state,
                to: BreakerState::HalfOpen,
            });
        }
        inner.state = BreakerState::HalfOpen;
        Ok(())
    }

    /// Move from Half-Open to Closed.
    pub fn close(&self) -> Result<(), IllegalTransition> {
        let mut inner = self.inner.lock();
        if inner.state != BreakerState::HalfOpen {
            return Err(IllegalTransition {
                from: inner.state,
                to: BreakerState::Closed,
            });
        }
        inner.state = BreakerState::Closed;
        inner.opened_at = None;
        Ok(())
    }

    pub fn state(&self) -> BreakerState {
        self.inner.lock().state
    }

    pub fn opened_at(&self) -> Option<Instant> {
        self.inner.lock().opened_at
    }
}

impl Default for PoolState {
    fn default() -> Self {
        Self::new()
    }
}
