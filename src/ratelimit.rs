/// Inter-batch rate limiting for fan-out fetch runs.
///
/// Providers meter requests per unit time, not per batch, so the pause is
/// measured against wall-clock batch duration: a batch that already took
/// longer than the target spacing is not paused at all.

use std::thread;
use std::time::{Duration, Instant};

pub struct RateLimiter {
    pause: Duration,
}

impl RateLimiter {
    pub fn new(pause: Duration) -> Self {
        Self { pause }
    }

    pub fn from_millis(pause_ms: u64) -> Self {
        Self::new(Duration::from_millis(pause_ms))
    }

    /// Block the calling thread until at least the configured pause has
    /// elapsed since `batch_started`. Returns the duration actually slept.
    pub fn pace(&self, batch_started: Instant) -> Duration {
        let elapsed = batch_started.elapsed();
        if elapsed >= self.pause {
            return Duration::ZERO;
        }
        let remaining = self.pause - elapsed;
        thread::sleep(remaining);
        remaining
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fast_batch_waits_out_the_remainder() {
        let limiter = RateLimiter::from_millis(60);
        let started = Instant::now();
        thread::sleep(Duration::from_millis(10));

        let slept = limiter.pace(started);

        assert!(slept > Duration::ZERO, "a fast batch must be paced");
        let total = started.elapsed();
        assert!(
            total >= Duration::from_millis(60),
            "total spacing must reach the pause target, got {:?}",
            total
        );
    }

    #[test]
    fn test_slow_batch_is_not_paused() {
        let limiter = RateLimiter::from_millis(20);
        let started = Instant::now();
        thread::sleep(Duration::from_millis(30));

        let before = Instant::now();
        let slept = limiter.pace(started);

        assert_eq!(slept, Duration::ZERO);
        assert!(
            before.elapsed() < Duration::from_millis(15),
            "pace() must return immediately when the batch overran the target"
        );
    }
}
