//! Bounded connection pool.
//!
//! # Responsibilities
//! - Bound concurrent borrows with a semaphore (`max_active`)
//! - Reuse idle connections (LIFO), validating them on the way out
//! - Apply the exhausted action: fail, block up to `max_wait`, or grow
//! - Evict connections idle longer than `min_eviction_time`
//!
//! # Design Decisions
//! - A borrowed connection carries its permit; dropping it frees the slot
//! - Factory I/O never happens while the idle lock is held
//! - Blocking borrows are always bounded by `max_wait`, creation by `create_timeout`
//! - A borrow dropped without `release` is destroyed through the factory

use std::collections::VecDeque;
use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::{broadcast, OwnedSemaphorePermit, Semaphore, TryAcquireError};
use tokio::task::JoinHandle;
use tokio::time::{self, Instant};

use crate::config::{ExhaustedAction, PoolConfig};
use crate::pool::factory::{ConnectTimeout, ConnectionFactory};
use crate::pool::{PoolError, PoolResult};

type Destroyer<C> = Arc<dyn Fn(C) + Send + Sync>;

struct IdleEntry<C> {
    conn: C,
    idle_since: Instant,
}

/// A generic pool of connections produced by a [`ConnectionFactory`].
pub struct ConnectionPool<F: ConnectionFactory> {
    factory: Arc<F>,
    destroyer: Destroyer<F::Connection>,
    config: PoolConfig,
    permits: Arc<Semaphore>,
    idle: Mutex<VecDeque<IdleEntry<F::Connection>>>,
    active: Arc<AtomicUsize>,
    closed: AtomicBool,
}

impl<F: ConnectionFactory> ConnectionPool<F> {
    /// Create a new, empty pool.
    pub fn new(factory: F, config: PoolConfig) -> Self {
        let factory = Arc::new(factory);
        let destroyer: Destroyer<F::Connection> = {
            let factory = Arc::clone(&factory);
            Arc::new(move |conn: F::Connection| factory.destroy(conn))
        };
        Self {
            factory,
            destroyer,
            permits: Arc::new(Semaphore::new(config.max_active)),
            idle: Mutex::new(VecDeque::new()),
            active: Arc::new(AtomicUsize::new(0)),
            closed: AtomicBool::new(false),
            config,
        }
    }

    /// Borrow a connection, reusing an idle one when it still validates.
    pub async fn borrow(&self) -> PoolResult<Pooled<F::Connection>> {
        if self.closed.load(Ordering::Acquire) {
            return Err(PoolError::Closed);
        }

        let permit = self.acquire_permit().await?;

        while let Some(entry) = self.pop_idle() {
            if self.factory.validate(&entry.conn) {
                return Ok(self.hand_out(entry.conn, permit));
            }
            tracing::debug!("Discarding idle connection that failed validation");
            self.factory.destroy(entry.conn);
        }

        let conn = self.create().await?;
        Ok(self.hand_out(conn, permit))
    }

    /// Return a connection to the pool.
    ///
    /// Connections that fail validation, overflow `max_idle`, or come back
    /// after `close()` are destroyed instead.
    pub fn release(&self, mut pooled: Pooled<F::Connection>) {
        let Some(conn) = pooled.conn.take() else {
            return;
        };

        if self.closed.load(Ordering::Acquire) || !self.factory.validate(&conn) {
            self.factory.destroy(conn);
            return;
        }

        let overflow = {
            let mut idle = self.idle.lock();
            if idle.len() < self.config.max_idle {
                idle.push_back(IdleEntry {
                    conn,
                    idle_since: Instant::now(),
                });
                None
            } else {
                Some(conn)
            }
        };
        if let Some(conn) = overflow {
            self.factory.destroy(conn);
        }
        // The permit goes back only after the connection is idle again.
        drop(pooled);
    }

    /// Destroy idle connections older than `min_eviction_time`.
    pub fn evict_idle(&self) -> usize {
        let min_age = self.config.min_eviction_time();
        let expired: Vec<F::Connection> = {
            let mut idle = self.idle.lock();
            let (keep, evict): (VecDeque<_>, VecDeque<_>) = idle
                .drain(..)
                .partition(|entry| entry.idle_since.elapsed() < min_age);
            *idle = keep;
            evict.into_iter().map(|entry| entry.conn).collect()
        };

        let count = expired.len();
        for conn in expired {
            self.factory.destroy(conn);
        }
        if count > 0 {
            tracing::debug!(evicted = count, "Evicted idle connections");
        }
        count
    }

    /// Run `evict_idle` periodically until shutdown.
    ///
    /// Returns `None` when the eviction interval is disabled.
    pub fn spawn_evictor(
        self: &Arc<Self>,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Option<JoinHandle<()>> {
        let interval = self.config.eviction_check_interval()?;
        let pool = Arc::clone(self);

        Some(tokio::spawn(async move {
            let mut ticker = time::interval(interval);
            // The first tick completes immediately.
            ticker.tick().await;
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        pool.evict_idle();
                    }
                    _ = shutdown.recv() => {
                        tracing::debug!("Evictor received shutdown signal, exiting loop");
                        break;
                    }
                }
            }
        }))
    }

    /// Stop handing out connections and destroy idle ones.
    pub fn close(&self) {
        self.closed.store(true, Ordering::Release);
        self.permits.close();
        let drained: Vec<_> = self.idle.lock().drain(..).collect();
        for entry in drained {
            self.factory.destroy(entry.conn);
        }
    }

    /// Connections currently borrowed.
    pub fn active(&self) -> usize {
        self.active.load(Ordering::Relaxed)
    }

    /// Connections waiting in the idle queue.
    pub fn idle(&self) -> usize {
        self.idle.lock().len()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    pub fn config(&self) -> &PoolConfig {
        &self.config
    }

    pub fn factory(&self) -> &F {
        &self.factory
    }

    async fn acquire_permit(&self) -> PoolResult<Option<OwnedSemaphorePermit>> {
        let max_active = self.config.max_active;
        match self.config.exhausted_action {
            ExhaustedAction::Fail => match Arc::clone(&self.permits).try_acquire_owned() {
                Ok(permit) => Ok(Some(permit)),
                Err(TryAcquireError::NoPermits) => Err(PoolError::Exhausted { max_active }),
                Err(TryAcquireError::Closed) => Err(PoolError::Closed),
            },
            ExhaustedAction::Block => {
                let wait = self.config.max_wait();
                match time::timeout(wait, Arc::clone(&self.permits).acquire_owned()).await {
                    Ok(Ok(permit)) => Ok(Some(permit)),
                    Ok(Err(_)) => Err(PoolError::Closed),
                    Err(_) => {
                        tracing::debug!(max_active, wait_ms = wait.as_millis() as u64, "Timed out waiting for a connection");
                        Err(PoolError::Timeout(wait))
                    }
                }
            }
            ExhaustedAction::Grow => match Arc::clone(&self.permits).try_acquire_owned() {
                Ok(permit) => Ok(Some(permit)),
                Err(TryAcquireError::NoPermits) => Ok(None),
                Err(TryAcquireError::Closed) => Err(PoolError::Closed),
            },
        }
    }

    async fn create(&self) -> PoolResult<F::Connection> {
        let limit = self.config.create_timeout();
        match time::timeout(limit, self.factory.create()).await {
            Ok(Ok(conn)) => Ok(conn),
            Ok(Err(e)) => match e.downcast_ref::<ConnectTimeout>() {
                Some(t) => Err(PoolError::Timeout(t.timeout)),
                None => Err(PoolError::Create(e.to_string())),
            },
            Err(_) => {
                tracing::warn!(timeout_ms = limit.as_millis() as u64, "Connection creation timed out");
                Err(PoolError::Timeout(limit))
            }
        }
    }

    fn pop_idle(&self) -> Option<IdleEntry<F::Connection>> {
        self.idle.lock().pop_back()
    }

    fn hand_out(&self, conn: F::Connection, permit: Option<OwnedSemaphorePermit>) -> Pooled<F::Connection> {
        self.active.fetch_add(1, Ordering::Relaxed);
        Pooled {
            conn: Some(conn),
            permit,
            active: Arc::clone(&self.active),
            destroyer: Arc::clone(&self.destroyer),
        }
    }
}

/// A borrowed connection.
///
/// Give it back with `release`; dropping it destroys the connection through
/// the factory and frees its slot.
pub struct Pooled<C> {
    conn: Option<C>,
    permit: Option<OwnedSemaphorePermit>,
    active: Arc<AtomicUsize>,
    destroyer: Destroyer<C>,
}

impl<C> Pooled<C> {
    /// Take the connection out of the pool's accounting for good.
    ///
    /// The factory does not destroy a detached connection.
    pub fn detach(mut self) -> Option<C> {
        self.conn.take()
    }

    /// Whether this borrow was created beyond `max_active`.
    pub fn is_overflow(&self) -> bool {
        self.permit.is_none()
    }
}

impl<C> Deref for Pooled<C> {
    type Target = C;

    fn deref(&self) -> &C {
        match &self.conn {
            Some(conn) => conn,
            None => unreachable!("connection is only taken when the guard is consumed"),
        }
    }
}

impl<C> DerefMut for Pooled<C> {
    fn deref_mut(&mut self) -> &mut C {
        match &mut self.conn {
            Some(conn) => conn,
            None => unreachable!("connection is only taken when the guard is consumed"),
        }
    }
}

impl<C> Drop for Pooled<C> {
    fn drop(&mut self) {
        if let Some(conn) = self.conn.take() {
            (self.destroyer)(conn);
        }
        self.active.fetch_sub(1, Ordering::Relaxed);
    }
}

impl<C: std::fmt::Debug> std::fmt::Debug for Pooled<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pooled")
            .field("conn", &self.conn)
            .field("overflow", &self.permit.is_none())
            .finish()
    }
}
