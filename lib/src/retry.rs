use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use tokio::sync::Mutex;
use tokio::time::Instant;

/// Source of the random component added to each backoff delay.
pub trait JitterSource: Send + Sync {
    /// Returns a duration in `[0, max)`.
    fn jitter(&self, max: Duration) -> Duration;
}

/// Uniform jitter from the thread-local RNG.
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomJitter;

impl JitterSource for RandomJitter {
    fn jitter(&self, max: Duration) -> Duration {
        let max_ms = u64::try_from(max.as_millis()).unwrap_or(u64::MAX);
        if max_ms == 0 {
            return Duration::ZERO;
        }
        Duration::from_millis(rand::rng().random_range(0..max_ms))
    }
}

/// Always returns the same jitter, clamped below `max`. Used to make
/// backoff deterministic.
#[derive(Debug, Clone, Copy)]
pub struct FixedJitter(pub Duration);

impl JitterSource for FixedJitter {
    fn jitter(&self, max: Duration) -> Duration {
        if max.is_zero() {
            Duration::ZERO
        } else {
            self.0.min(max.saturating_sub(Duration::from_millis(1)))
        }
    }
}

#[derive(Clone)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
    jitter: Arc<dyn JitterSource>,
}

impl RetryPolicy {
    pub fn new(max_retries: u32, base_delay: Duration) -> Self {
        Self {
            max_retries,
            base_delay,
            jitter: Arc::new(RandomJitter),
        }
    }

    /// Policy that never retries.
    pub fn none() -> Self {
        Self::new(0, Duration::ZERO)
    }

    pub fn with_jitter(mut self, jitter: impl JitterSource + 'static) -> Self {
        self.jitter = Arc::new(jitter);
        self
    }

    /// Delay before the retry that follows failed attempt number `attempt`
    /// (zero-based): `base_delay * 2^attempt + jitter(0, base_delay)`.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt);
        self.base_delay.saturating_mul(factor) + self.jitter.jitter(self.base_delay)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(2, Duration::from_millis(500))
    }
}

impl fmt::Debug for RetryPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryPolicy")
            .field("max_retries", &self.max_retries)
            .field("base_delay", &self.base_delay)
            .finish_non_exhaustive()
    }
}

/// Enforces a minimum interval between consecutive request starts.
#[derive(Debug)]
pub struct RateLimiter {
    interval: Duration,
    last: Mutex<Option<Instant>>,
}

impl RateLimiter {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last: Mutex::new(None),
        }
    }

    /// Waits until `interval` has passed since the previous call returned.
    pub async fn acquire(&self) {
        let mut last = self.last.lock().await;
        if let Some(previous) = *last {
            let elapsed = previous.elapsed();
            if elapsed < self.interval {
                tokio::time::sleep(self.interval - elapsed).await;
            }
        }
        *last = Some(Instant::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delay_doubles_per_attempt() {
        let policy = RetryPolicy::new(3, Duration::from_millis(100))
            .with_jitter(FixedJitter(Duration::ZERO));

        assert_eq!(policy.delay_for(0), Duration::from_millis(100));
        assert_eq!(policy.delay_for(1), Duration::from_millis(200));
        assert_eq!(policy.delay_for(2), Duration::from_millis(400));
    }

    #[test]
    fn test_random_jitter_stays_below_base_delay() {
        let policy = RetryPolicy::new(3, Duration::from_millis(50));
        for attempt in 0..3 {
            let floor = Duration::from_millis(50) * 2u32.pow(attempt);
            let delay = policy.delay_for(attempt);
            assert!(delay >= floor);
            assert!(delay < floor + Duration::from_millis(50));
        }
    }

    #[test]
    fn test_fixed_jitter_is_clamped() {
        let jitter = FixedJitter(Duration::from_secs(10));
        assert_eq!(
            jitter.jitter(Duration::from_millis(100)),
            Duration::from_millis(99)
        );
        assert_eq!(jitter.jitter(Duration::ZERO), Duration::ZERO);
    }

    #[test]
    fn test_random_jitter_saturates_huge_bounds() {
        let max = Duration::MAX;

        let jitter = RandomJitter.jitter(max);

        assert!(jitter < max);
        assert!(jitter <= Duration::from_millis(u64::MAX));
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_limiter_spaces_calls() {
        let limiter = RateLimiter::new(Duration::from_millis(1200));
        let start = Instant::now();

        limiter.acquire().await;
        limiter.acquire().await;
        limiter.acquire().await;

        assert!(start.elapsed() >= Duration::from_millis(2400));
    }
}
