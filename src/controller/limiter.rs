use crate::core::Timestamp;
use chrono::{DateTime, Duration};
use tracing::debug;

/// Minimum spacing between outbound fetches for the active base.
#[derive(Debug, Clone)]
pub struct RateLimiter {
    min_interval: Duration,
    last_fetch_at: Timestamp,
}

impl RateLimiter {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_fetch_at: DateTime::UNIX_EPOCH,
        }
    }

    pub fn allow(&self, now: Timestamp) -> bool {
        let allowed = now - self.last_fetch_at >= self.min_interval;
        if !allowed {
            debug!(
                last_fetch_at = %self.last_fetch_at,
                "Rate limit: too many requests, skipping fetch"
            );
        }
        allowed
    }

    pub fn record(&mut self, now: Timestamp) {
        self.last_fetch_at = now;
    }

    /// Forgets the last fetch so the next attempt is always allowed.
    pub fn reset(&mut self) {
        self.last_fetch_at = DateTime::UNIX_EPOCH;
    }

    pub fn last_fetch_at(&self) -> Timestamp {
        self.last_fetch_at
    }
}
