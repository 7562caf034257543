//! Per-consumer request pacing
//!
//! Each consumer key gets its own schedule. The lock only covers the
//! bookkeeping: a caller reserves its slot under the lock, releases it, and
//! then sleeps until the slot arrives.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;
use tokio::time::Instant;

/// Enforces a minimum interval between requests issued by the same consumer
#[derive(Debug)]
pub struct RateLimiter {
    base_delay: Duration,

    /// Earliest instant at which each consumer may issue its next request
    state: Mutex<HashMap<String, Instant>>,
}

impl RateLimiter {
    pub fn new(base_delay: Duration) -> Self {
        Self {
            base_delay,
            state: Mutex::new(HashMap::new()),
        }
    }

    pub fn base_delay(&self) -> Duration {
        self.base_delay
    }

    /// Claims the next request slot for `key` and returns how long to wait for it
    ///
    /// # Arguments
    ///
    /// * `key` - The consumer identity
    /// * `now` - The current time instant
    ///
    /// # Returns
    ///
    /// Zero if the consumer may proceed immediately, otherwise the remaining
    /// part of the base delay since its previous request.
    fn reserve(&self, key: &str, now: Instant) -> Duration {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);

        let slot = match state.get(key) {
            Some(next_allowed) if *next_allowed > now => *next_allowed,
            _ => now,
        };
        state.insert(key.to_string(), slot + self.base_delay);

        slot.saturating_duration_since(now)
    }

    /// Waits until `key` may issue another request
    ///
    /// Returns the time spent sleeping.
    pub async fn throttle(&self, key: &str) -> Duration {
        let wait = self.reserve(key, Instant::now());

        if !wait.is_zero() {
            tracing::trace!("Throttling '{}' for {:?}", key, wait);
            tokio::time::sleep(wait).await;
        }

        wait
    }

    /// Time until `key` could issue a request without waiting
    ///
    /// Returns `None` if it could go right now.
    #[cfg(test)]
    fn time_until_ready(&self, key: &str) -> Option<Duration> {
        let now = Instant::now();
        let state = self.state.lock().unwrap_or_else(PoisonError::into_inner);

        state
            .get(key)
            .filter(|next_allowed| **next_allowed > now)
            .map(|next_allowed| next_allowed.saturating_duration_since(now))
    }

    /// Number of consumers seen so far
    #[cfg(test)]
    fn tracked_consumers(&self) -> usize {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}
