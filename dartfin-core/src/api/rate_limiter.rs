//! Token-bucket pacing shared by every outbound call.
//!
//! The remote API enforces one global request ceiling, so a single limiter is
//! created per run and handed (behind an `Arc`) to the resolver, classifier and
//! retrieval engine. With the default burst of 1 this degenerates to a fixed
//! minimum spacing between calls. The pace is fixed; it does not react to
//! throttling responses.

use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

/// Default spacing between remote calls.
pub const DEFAULT_MIN_INTERVAL: Duration = Duration::from_millis(200);

#[derive(Debug)]
struct Bucket {
    tokens: f64,
    last_refill: Instant,
}

/// Blocking token bucket.
#[derive(Debug)]
pub struct RateLimiter {
    bucket: Mutex<Bucket>,
    interval: Duration,
    burst: u32,
}

impl RateLimiter {
    /// One token refilled per `interval`, at most `burst` held at once.
    pub fn new(interval: Duration, burst: u32) -> Self {
        let burst = burst.max(1);
        Self {
            bucket: Mutex::new(Bucket {
                tokens: f64::from(burst),
                last_refill: Instant::now(),
            }),
            interval,
            burst,
        }
    }

    /// Fixed minimum spacing between calls.
    pub fn fixed(interval: Duration) -> Self {
        Self::new(interval, 1)
    }

    /// A limiter that never waits.
    pub fn unlimited() -> Self {
        Self::new(Duration::ZERO, 1)
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn burst(&self) -> u32 {
        self.burst
    }

    /// Block until a token is available, then take it. Returns the time spent waiting.
    pub fn acquire(&self) -> Duration {
        if self.interval.is_zero() {
            return Duration::ZERO;
        }

        let started = Instant::now();
        loop {
            let wait = {
                let mut bucket = self.bucket.lock().unwrap_or_else(PoisonError::into_inner);
                self.refill(&mut bucket);
                if bucket.tokens >= 1.0 {
                    bucket.tokens -= 1.0;
                    return started.elapsed();
                }
                self.interval.mul_f64(1.0 - bucket.tokens)
            };
            std::thread::sleep(wait);
        }
    }

    fn refill(&self, bucket: &mut Bucket) {
        let now = Instant::now();
        let elapsed = now.duration_since(bucket.last_refill);
        let earned = elapsed.as_secs_f64() / self.interval.as_secs_f64();
        bucket.tokens = (bucket.tokens + earned).min(f64::from(self.burst));
        bucket.last_refill = now;
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::fixed(DEFAULT_MIN_INTERVAL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn first_call_is_free() {
        let limiter = RateLimiter::fixed(Duration::from_secs(60));
        assert!(limiter.acquire() < Duration::from_millis(50));
    }

    #[test]
    fn enforces_min_spacing() {
        let limiter = RateLimiter::fixed(Duration::from_millis(40));
        let start = Instant::now();
        for _ in 0..4 {
            limiter.acquire();
        }
        // First is immediate, the next three wait one interval each.
        assert!(start.elapsed() >= Duration::from_millis(115));
    }

    #[test]
    fn burst_allows_immediate_calls() {
        let limiter = RateLimiter::new(Duration::from_secs(60), 3);
        let start = Instant::now();
        for _ in 0..3 {
            limiter.acquire();
        }
        assert!(start.elapsed() < Duration::from_millis(50));
    }

    #[test]
    fn zero_burst_treated_as_one() {
        assert_eq!(RateLimiter::new(Duration::from_millis(5), 0).burst(), 1);
    }

    #[test]
    fn unlimited_never_waits() {
        let limiter = RateLimiter::unlimited();
        for _ in 0..100 {
            assert_eq!(limiter.acquire(), Duration::ZERO);
        }
    }

    #[test]
    fn shared_across_threads() {
        let limiter = Arc::new(RateLimiter::fixed(Duration::from_millis(30)));
        let start = Instant::now();
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let l = Arc::clone(&limiter);
                std::thread::spawn(move || l.acquire())
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        // Four tokens from a burst-1 bucket: at least three intervals total.
        assert!(start.elapsed() >= Duration::from_millis(85));
    }
}
