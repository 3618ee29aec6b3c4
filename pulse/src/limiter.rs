use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;

/// Fixed-interval rate limiter for throttling outbound calls.
///
/// Constructed with a target rate in operations per second; `acquire()`
/// returns only once at least `1/rate` has elapsed since the previous
/// `acquire()` returned anywhere, across all callers.
///
/// The lock is held for the whole read/sleep/update sequence, so concurrent
/// acquirers are fully serialized: correct spacing, not maximal throughput.
/// This is a leaky-bucket-of-size-1 limiter, no burst allowance.
#[derive(Debug)]
pub struct RateLimiter {
    min_interval: Duration,
    last_call: Mutex<Option<Instant>>,
}

impl RateLimiter {
    /// Create a limiter allowing at most `rate` operations per second.
    ///
    /// `rate` must be positive.
    pub fn new(rate: f64) -> Self {
        assert!(rate > 0.0, "rate must be positive, got {rate}");
        Self {
            min_interval: Duration::from_secs_f64(1.0 / rate),
            last_call: Mutex::new(None),
        }
    }

    /// Create a limiter with an explicit minimum interval between calls.
    pub fn with_interval(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_call: Mutex::new(None),
        }
    }

    /// The minimum spacing between two `acquire()` completions.
    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    /// Wait until the rate limit allows execution.
    pub async fn acquire(&self) {
        // Sleeping inside the critical section is what makes the
        // check-and-update atomic with respect to other acquirers.
        let mut last_call = self.last_call.lock().await;
        if let Some(last) = *last_call {
            let elapsed = last.elapsed();
            if elapsed < self.min_interval {
                tokio::time::sleep(self.min_interval - elapsed).await;
            }
        }
        *last_call = Some(Instant::now());
    }
}
