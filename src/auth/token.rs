//! Access tokens and the shared token cache.

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use dashmap::DashMap;

use crate::observability::metrics;

/// Milliseconds since the Unix epoch.
pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

/// An access token with its lifetime.
#[derive(Clone, PartialEq, Eq)]
pub struct Token {
    access_token: String,
    issued_at_ms: u64,
    ttl_ms: u64,
}

impl Token {
    pub fn new(access_token: impl Into<String>, issued_at_ms: u64, ttl_ms: u64) -> Self {
        Self {
            access_token: access_token.into(),
            issued_at_ms,
            ttl_ms,
        }
    }

    pub fn access_token(&self) -> &str {
        &self.access_token
    }

    pub fn issued_at_ms(&self) -> u64 {
        self.issued_at_ms
    }

    pub fn ttl_ms(&self) -> u64 {
        self.ttl_ms
    }

    /// Check if the token is still usable.
    pub fn is_active(&self) -> bool {
        self.is_active_at(now_millis())
    }

    /// Check liveness against an explicit clock reading.
    pub fn is_active_at(&self, now_ms: u64) -> bool {
        now_ms.saturating_sub(self.issued_at_ms) < self.ttl_ms
    }
}

impl std::fmt::Debug for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Token")
            .field("access_token", &"<redacted>")
            .field("issued_at_ms", &self.issued_at_ms)
            .field("ttl_ms", &self.ttl_ms)
            .finish()
    }
}

/// A thread-safe cache of tokens keyed by connection fingerprint.
///
/// Cloning shares the same underlying map.
#[derive(Clone, Default)]
pub struct TokenManager {
    inner: Arc<DashMap<String, Token>>,
}

impl TokenManager {
    /// Create a new empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the cached token, active or not.
    pub fn get_token(&self, key: &str) -> Option<Token> {
        self.inner.get(key).map(|r| r.value().clone())
    }

    pub fn add_token(&self, key: impl Into<String>, token: Token) {
        self.inner.insert(key.into(), token);
        metrics::record_token_cache_size(self.inner.len());
    }

    pub fn remove_token(&self, key: &str) -> Option<Token> {
        let removed = self.inner.remove(key).map(|(_, token)| token);
        metrics::record_token_cache_size(self.inner.len());
        removed
    }

    /// Remove the entry only if it is no longer active.
    ///
    /// A fresh token inserted concurrently under the same key is left alone.
    pub fn remove_if_inactive(&self, key: &str) -> bool {
        let removed = self.inner.remove_if(key, |_, token| !token.is_active()).is_some();
        if removed {
            metrics::record_token_cache_size(self.inner.len());
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn clear(&self) {
        self.inner.clear();
        metrics::record_token_cache_size(0);
    }

    /// Get a summary of active/expired entries.
    pub fn get_summary(&self) -> (usize, usize) {
        let now = now_millis();
        let mut active = 0;
        let mut expired = 0;
        for r in self.inner.iter() {
            if r.value().is_active_at(now) {
                active += 1;
            } else {
                expired += 1;
            }
        }
        (active, expired)
    }
}

impl std::fmt::Debug for TokenManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenManager").field("entries", &self.inner.len()).finish()
    }
}
