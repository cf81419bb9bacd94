//! # Per-key Failure Backoff
//!
//! Exponential per-item rate limiter for failed reconciliations.
//!
//! Each key that fails is retried after `base * 2^n`, where `n` is the number
//! of failures recorded for that key since it last succeeded, capped at `max`.
//! A success calls [`RateLimiter::forget`], so the next failure starts over
//! from `base`.
//!
//! ## Usage
//!
//! ```rust
//! use devops_controller::controller::backoff::RateLimiter;
//! use std::time::Duration;
//!
//! let limiter = RateLimiter::new(Duration::from_millis(5), Duration::from_secs(1000));
//! assert_eq!(limiter.when("demo/build"), Duration::from_millis(5));
//! assert_eq!(limiter.when("demo/build"), Duration::from_millis(10));
//! assert_eq!(limiter.num_requeues("demo/build"), 2);
//! limiter.forget("demo/build");
//! assert_eq!(limiter.when("demo/build"), Duration::from_millis(5));
//! ```

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

/// Exponential backoff keyed by resource (`namespace/name`)
#[derive(Debug)]
pub struct RateLimiter {
    base: Duration,
    max: Duration,
    failures: Mutex<HashMap<String, u32>>,
}

impl RateLimiter {
    #[must_use]
    pub fn new(base: Duration, max: Duration) -> Self {
        Self {
            base,
            max,
            failures: Mutex::new(HashMap::new()),
        }
    }

    /// Record a failure for `key` and return how long to wait before retrying it
    pub fn when(&self, key: &str) -> Duration {
        let mut failures = self
            .failures
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        let count = failures.entry(key.to_string()).or_insert(0);
        let exponent = *count;
        *count = count.saturating_add(1);
        self.delay_for(exponent)
    }

    /// Clear the failure history of `key`
    pub fn forget(&self, key: &str) {
        self.failures
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .remove(key);
    }

    /// Failures recorded for `key` since it last succeeded
    pub fn num_requeues(&self, key: &str) -> u32 {
        self.failures
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .get(key)
            .copied()
            .unwrap_or(0)
    }

    /// Drop the history of every key `keep` rejects
    ///
    /// Returns how many keys were dropped.
    pub fn retain(&self, mut keep: impl FnMut(&str) -> bool) -> usize {
        let mut failures = self
            .failures
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        let before = failures.len();
        failures.retain(|key, _| keep(key));
        before - failures.len()
    }

    /// The ceiling, used for errors that retrying soon cannot fix
    pub fn max_delay(&self) -> Duration {
        self.max
    }

    fn delay_for(&self, exponent: u32) -> Duration {
        // 2^31 * base overflows any sane ceiling anyway
        let factor = 1u32.checked_shl(exponent.min(31)).unwrap_or(u32::MAX);
        self.base
            .checked_mul(factor)
            .map_or(self.max, |d| d.min(self.max))
    }
}
