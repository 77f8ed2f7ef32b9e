//! Minimum spacing between outbound translation requests.
//!
//! This is client-side self-throttling: `wait()` sleeps until at least
//! `60 / calls_per_minute` seconds have passed since the previous `wait()`
//! returned. Server rate-limit headers are not consulted.

use std::sync::Mutex;
use std::time::{Duration, Instant};
use tracing::debug;

/// Blocking spacer for a single caller.
#[derive(Debug)]
pub struct RateLimiter {
    /// `None` disables limiting.
    interval: Option<Duration>,
    last_call: Mutex<Option<Instant>>,
}

impl RateLimiter {
    /// `calls_per_minute == 0` disables limiting.
    pub fn new(calls_per_minute: u32) -> Self {
        let interval = (calls_per_minute > 0)
            .then(|| Duration::from_secs_f64(60.0 / calls_per_minute as f64));
        Self {
            interval,
            last_call: Mutex::new(None),
        }
    }

    pub fn interval(&self) -> Option<Duration> {
        self.interval
    }

    /// Block until the next call is allowed, then record it.
    pub fn wait(&self) {
        let Some(interval) = self.interval else {
            return;
        };
        // A poisoned lock only means another caller panicked mid-wait; the
        // timestamp inside is still usable.
        let mut last = self
            .last_call
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        if let Some(prev) = *last {
            let elapsed = prev.elapsed();
            if elapsed < interval {
                let pause = interval - elapsed;
                debug!("Rate limiter sleeping {:?}", pause);
                std::thread::sleep(pause);
            }
        }
        *last = Some(Instant::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_call_does_not_wait() {
        let limiter = RateLimiter::new(1);
        let start = Instant::now();
        limiter.wait();
        assert!(start.elapsed() < Duration::from_millis(500));
    }

    #[test]
    fn consecutive_calls_are_spaced() {
        // 1200/min ⇒ 50 ms spacing.
        let limiter = RateLimiter::new(1200);
        assert_eq!(limiter.interval(), Some(Duration::from_millis(50)));
        let start = Instant::now();
        for _ in 0..3 {
            limiter.wait();
        }
        assert!(start.elapsed() >= Duration::from_millis(100));
    }

    #[test]
    fn default_rate_is_two_seconds() {
        assert_eq!(RateLimiter::new(30).interval(), Some(Duration::from_secs(2)));
    }

    #[test]
    fn zero_disables_limiting() {
        let limiter = RateLimiter::new(0);
        assert_eq!(limiter.interval(), None);
        let start = Instant::now();
        for _ in 0..100 {
            limiter.wait();
        }
        assert!(start.elapsed() < Duration::from_millis(500));
    }
}
