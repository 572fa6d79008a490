//! Bounded exponential backoff with jitter.

use rand::Rng;
use std::time::Duration;
use tracing::warn;

/// How many times to repeat a failed call and how long to wait between tries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
    /// Add up to 50% random extra delay per attempt.
    pub jitter: bool,
}

impl RetryPolicy {
    pub const fn none() -> Self {
        Self {
            max_retries: 0,
            base_delay: Duration::ZERO,
            jitter: false,
        }
    }

    /// One extra attempt, no waiting.
    pub const fn single() -> Self {
        Self {
            max_retries: 1,
            base_delay: Duration::ZERO,
            jitter: false,
        }
    }

    pub const fn exponential(max_retries: u32, base_delay: Duration) -> Self {
        Self {
            max_retries,
            base_delay,
            jitter: true,
        }
    }

    /// Delay before retry number `attempt` (1-based): `base * 2^(attempt-1)` plus jitter.
    pub fn delay_for(&self, attempt: u32, rng: &mut impl Rng) -> Duration {
        if attempt == 0 || self.base_delay.is_zero() {
            return Duration::ZERO;
        }
        let factor = 2u32.saturating_pow(attempt - 1);
        let delay = self.base_delay.saturating_mul(factor);
        if self.jitter {
            delay + delay.mul_f64(rng.gen_range(0.0..0.5))
        } else {
            delay
        }
    }

    /// Run `op` until it succeeds, fails with a non-retryable error, or the budget is spent.
    pub fn run<T, E: std::fmt::Display>(
        &self,
        what: &str,
        mut op: impl FnMut() -> Result<T, E>,
        retryable: impl Fn(&E) -> bool,
    ) -> Result<T, E> {
        let mut rng = rand::thread_rng();
        let mut attempt = 0;
        loop {
            match op() {
                Ok(v) => return Ok(v),
                Err(e) if attempt < self.max_retries && retryable(&e) => {
                    attempt += 1;
                    let delay = self.delay_for(attempt, &mut rng);
                    warn!(%e, attempt, ?delay, "{what} failed, retrying");
                    std::thread::sleep(delay);
                }
                Err(e) => return Err(e),
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::none()
    }
}
