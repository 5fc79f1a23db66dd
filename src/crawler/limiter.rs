//! Shared token-bucket rate limiter
//!
//! One limiter models the external request quota of the whole crawl and is
//! shared by every worker. Its only state is the theoretical arrival time of
//! the next token, advanced with a single compare-and-swap; a caller that
//! finds the bucket empty gets back the exact time it has to wait and sleeps
//! on its own, so one throttled worker never holds up the limiter.

use crate::config::RateLimitConfig;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::time::Instant;

/// Token bucket refilling one token every `interval`, holding at most `burst`
#[derive(Debug)]
pub struct TokenBucket {
    /// Time between two refilled tokens, in nanoseconds
    interval: u64,

    /// How far ahead of the refill schedule a burst may run, in nanoseconds
    tolerance: u64,

    /// Theoretical arrival time of the next token, relative to `epoch`
    next_token: AtomicU64,

    epoch: Instant,
}

impl TokenBucket {
    /// Creates a bucket that permits `burst` back-to-back requests and one
    /// more per `interval` thereafter
    pub fn new(interval: Duration, burst: u32) -> Self {
        let interval = interval.as_nanos().min(u64::MAX as u128) as u64;
        let tolerance = interval.saturating_mul(u64::from(burst.max(1) - 1));

        Self {
            interval,
            tolerance,
            next_token: AtomicU64::new(0),
            epoch: Instant::now(),
        }
    }

    /// Creates a bucket from the configured request budget
    pub fn from_config(config: &RateLimitConfig) -> Self {
        Self::new(config.interval(), config.burst)
    }

    /// Reserves one token and returns how long the caller must wait before
    /// using it (zero when the budget has capacity right now)
    pub fn reserve(&self) -> Duration {
        let now = self.elapsed_nanos();
        let mut current = self.next_token.load(Ordering::Acquire);

        loop {
            let start = current.max(now);
            let next = start.saturating_add(self.interval);

            match self.next_token.compare_exchange_weak(
                current,
                next,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => {
                    let ready_at = start.saturating_sub(self.tolerance);
                    return Duration::from_nanos(ready_at.saturating_sub(now));
                }
                Err(actual) => current = actual,
            }
        }
    }

    /// Waits until a token is available for the calling task
    pub async fn acquire(&self) {
        let wait = self.reserve();
        if !wait.is_zero() {
            tracing::debug!("Rate limit has been reached, waiting {:?}", wait);
            tokio::time::sleep(wait).await;
        }
    }

    fn elapsed_nanos(&self) -> u64 {
        Instant::now()
            .duration_since(self.epoch)
            .as_nanos()
            .min(u64::MAX as u128) as u64
    }
}
