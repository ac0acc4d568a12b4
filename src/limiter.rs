//! Throttling for outbound catalog requests.
//!
//! The public Jikan API bans clients that exceed a few requests per second,
//! so every remote call waits on one shared limiter first.

use std::time::Duration;

use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};

/// Grants at most one request per `min_gap`, shared by every caller.
pub(crate) struct RequestLimiter {
    limiter: Option<DefaultDirectRateLimiter>,
    min_gap: Duration,
}

impl RequestLimiter {
    /// A zero gap disables throttling entirely.
    pub(crate) fn new(min_gap: Duration) -> Self {
        // Burst of one: a grant is only available `min_gap` after the previous one.
        let limiter = Quota::with_period(min_gap).map(RateLimiter::direct);
        Self { limiter, min_gap }
    }

    pub(crate) fn unthrottled() -> Self {
        Self::new(Duration::ZERO)
    }

    pub(crate) fn min_gap(&self) -> Duration {
        self.min_gap
    }

    /// Waits until the next request slot is available.
    pub(crate) async fn acquire(&self) {
        if let Some(limiter) = &self.limiter {
            limiter.until_ready().await;
        }
    }
}
