//! Fixed-size session pool with lease-based checkout
//!
//! The semaphore holds one permit per idle session, so `acquire` can only
//! succeed when a session is actually waiting in the idle queue.

use crate::pool::rate::RateLimiter;
use crate::pool::session::{Session, SessionError, SessionFactory};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::Semaphore;

/// Errors raised by the session pool
#[derive(Debug, Error)]
pub enum PoolError {
    #[error("No session became available within {0:?}")]
    Unavailable(Duration),

    #[error("None of the {requested} requested sessions could be created")]
    NoSessions { requested: usize },

    #[error("Session pool is shut down")]
    Closed,

    #[error("Session error: {0}")]
    Session(#[from] SessionError),
}

/// Whether a lease came from the pool or was created on exhaustion
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeaseKind {
    Pooled,
    Overflow,
}

type IdleQueue<S> = Arc<Mutex<VecDeque<(String, S)>>>;

/// Exclusive handle on one session
///
/// Dropping a pooled lease returns its session to the pool. Dropping an
/// overflow lease closes the session in the background.
pub struct SessionLease<S: Session> {
    session: Option<S>,
    label: String,
    kind: LeaseKind,
    idle: IdleQueue<S>,
    permits: Arc<Semaphore>,
}

impl<S: Session> SessionLease<S> {
    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn kind(&self) -> LeaseKind {
        self.kind
    }

    /// Mutable access to the leased session
    pub fn session(&mut self) -> Result<&mut S, PoolError> {
        self.session.as_mut().ok_or(PoolError::Closed)
    }

    /// Closes the session instead of returning it to the pool
    ///
    /// Used when a session is known to be broken. Pool capacity shrinks by one.
    pub async fn discard(mut self) {
        if let Some(mut session) = self.session.take() {
            if let Err(e) = session.close().await {
                tracing::debug!("Error closing discarded session {}: {}", self.label, e);
            }
            if self.kind == LeaseKind::Pooled {
                tracing::warn!("Discarded broken session {}", self.label);
            }
        }
    }
}

impl<S: Session> Drop for SessionLease<S> {
    fn drop(&mut self) {
        let Some(mut session) = self.session.take() else {
            return;
        };

        match self.kind {
            LeaseKind::Pooled => {
                if self.permits.is_closed() {
                    close_in_background(session, std::mem::take(&mut self.label));
                    return;
                }
                self.idle
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .push_back((std::mem::take(&mut self.label), session));
                self.permits.add_permits(1);
            }
            LeaseKind::Overflow => {
                tracing::debug!("Closing overflow session {}", self.label);
                close_in_background(session, std::mem::take(&mut self.label));
            }
        }
    }
}

fn close_in_background<S: Session>(mut session: S, label: String) {
    if let Ok(handle) = tokio::runtime::Handle::try_current() {
        handle.spawn(async move {
            if let Err(e) = session.close().await {
                tracing::debug!("Error closing session {}: {}", label, e);
            }
        });
    }
}

/// Bounded pool of automation sessions plus the shared rate limiter
pub struct SessionPool<F: SessionFactory> {
    factory: F,
    idle: IdleQueue<F::Session>,
    permits: Arc<Semaphore>,
    capacity: usize,
    limiter: Arc<RateLimiter>,
    overflow_count: AtomicUsize,
}

impl<F: SessionFactory> SessionPool<F> {
    /// Creates the pool and eagerly opens `size` sessions
    ///
    /// A session that fails to open is logged and skipped, shrinking the
    /// pool. Only a pool with no sessions at all is an error.
    ///
    /// # Arguments
    ///
    /// * `factory` - Creates the sessions (also used later for overflow)
    /// * `size` - Number of sessions to create
    /// * `limiter` - Rate limiter shared with every consumer of the pool
    ///
    /// # Returns
    ///
    /// * `Ok(SessionPool)` - At least one session was created
    /// * `Err(PoolError::NoSessions)` - Every creation attempt failed
    pub async fn initialize(
        factory: F,
        size: usize,
        limiter: Arc<RateLimiter>,
    ) -> Result<Self, PoolError> {
        let mut idle = VecDeque::with_capacity(size);

        for index in 0..size {
            let label = format!("session-{}", index);
            match factory.create(&label).await {
                Ok(session) => {
                    tracing::debug!("Created {}", label);
                    idle.push_back((label, session));
                }
                Err(e) => {
                    tracing::warn!("Failed to create {}: {}", label, e);
                }
            }
        }

        if idle.is_empty() {
            return Err(PoolError::NoSessions { requested: size });
        }

        let capacity = idle.len();
        if capacity < size {
            tracing::warn!(
                "Session pool running with {} of {} sessions",
                capacity,
                size
            );
        } else {
            tracing::info!("Session pool ready with {} sessions", capacity);
        }

        Ok(Self {
            factory,
            idle: Arc::new(Mutex::new(idle)),
            permits: Arc::new(Semaphore::new(capacity)),
            capacity,
            limiter,
            overflow_count: AtomicUsize::new(0),
        })
    }

    /// Checks out a pooled session, waiting at most `timeout`
    pub async fn acquire(&self, timeout: Duration) -> Result<SessionLease<F::Session>, PoolError> {
        let permit = match tokio::time::timeout(timeout, self.permits.acquire()).await {
            Ok(Ok(permit)) => permit,
            Ok(Err(_)) => return Err(PoolError::Closed),
            Err(_) => return Err(PoolError::Unavailable(timeout)),
        };
        // The permit travels with the lease and is restored on return
        permit.forget();

        let entry = self
            .idle
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front();

        match entry {
            Some((label, session)) => {
                tracing::trace!("Acquired {}", label);
                Ok(self.lease(label, session, LeaseKind::Pooled))
            }
            None => Err(PoolError::Unavailable(timeout)),
        }
    }

    /// Checks out a pooled session, or creates a single-use one on timeout
    pub async fn acquire_or_overflow(
        &self,
        timeout: Duration,
    ) -> Result<SessionLease<F::Session>, PoolError> {
        match self.acquire(timeout).await {
            Err(PoolError::Unavailable(_)) => {
                let index = self.overflow_count.fetch_add(1, Ordering::Relaxed);
                let label = format!("overflow-{}", index);
                tracing::info!("Pool exhausted, creating {}", label);

                let session = self.factory.create(&label).await?;
                Ok(self.lease(label, session, LeaseKind::Overflow))
            }
            other => other,
        }
    }

    /// Returns a lease to the pool (overflow sessions are closed instead)
    pub async fn release(&self, mut lease: SessionLease<F::Session>) {
        if lease.kind == LeaseKind::Overflow {
            if let Some(mut session) = lease.session.take() {
                if let Err(e) = session.close().await {
                    tracing::debug!("Error closing {}: {}", lease.label, e);
                }
            }
        }
        drop(lease);
    }

    /// Renders a page with a leased session, throttled per consumer key
    ///
    /// Broken sessions are discarded; everything else goes back to the pool.
    pub async fn render(
        &self,
        consumer: &str,
        timeout: Duration,
        url: &str,
        wait_for: Option<&str>,
    ) -> Result<String, PoolError> {
        let mut lease = self.acquire_or_overflow(timeout).await?;
        self.limiter.throttle(consumer).await;

        let result = lease.session()?.render(url, wait_for).await;
        match result {
            Ok(html) => {
                self.release(lease).await;
                Ok(html)
            }
            Err(e) if e.is_fatal() => {
                lease.discard().await;
                Err(e.into())
            }
            Err(e) => {
                self.release(lease).await;
                Err(e.into())
            }
        }
    }

    pub fn limiter(&self) -> &Arc<RateLimiter> {
        &self.limiter
    }

    /// Sessions created at startup
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Sessions currently idle in the pool
    pub fn available(&self) -> usize {
        self.permits.available_permits()
    }

    /// Overflow sessions created so far
    pub fn overflow_created(&self) -> usize {
        self.overflow_count.load(Ordering::Relaxed)
    }

    /// Closes every idle session and refuses further checkouts
    ///
    /// Sessions still leased out are closed when their lease is dropped.
    pub async fn shutdown(&self) {
        self.permits.close();

        let sessions: Vec<_> = self
            .idle
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .drain(..)
            .collect();

        for (label, mut session) in sessions {
            if let Err(e) = session.close().await {
                tracing::warn!("Error closing {}: {}", label, e);
            }
        }
        tracing::info!("Session pool shut down");
    }

    fn lease(&self, label: String, session: F::Session, kind: LeaseKind) -> SessionLease<F::Session> {
        SessionLease {
            session: Some(session),
            label,
            kind,
            idle: Arc::clone(&self.idle),
            permits: Arc::clone(&self.permits),
        }
    }
}
