//! Open-duration escalation for the circuit breaker.

use std::time::Duration;

/// Fallback used when the escalated duration overflows.
pub const DEFAULT_OPEN_DURATION_MS: u64 = 60_000;

/// Calculate the next open duration after a failed probe.
///
/// `min(current * factor, max)`, falling back to the default (still capped
/// at `max`) when the multiplication overflows.
pub fn next_open_duration(current_ms: u64, factor: u32, max_ms: u64) -> u64 {
    match current_ms.checked_mul(u64::from(factor)) {
        Some(next) => next.min(max_ms),
        None => DEFAULT_OPEN_DURATION_MS.min(max_ms),
    }
}

/// Millisecond helper for comparisons against `Instant::elapsed`.
pub fn as_duration(ms: u64) -> Duration {
    Duration::from_millis(ms)
}
