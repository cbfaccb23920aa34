//! Retry policy for page fetches.
//!
//! One policy object, applied uniformly by the crawler around every page
//! fetch. The retryable-condition predicate is
//! [`CrawlError::is_transient`](crate::error::CrawlError::is_transient);
//! non-transient failures are never retried.

use std::time::Duration;

use rand::Rng;
use serde::{Deserialize, Serialize};

/// Configuration for retry behavior.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Total attempts, including the first.
    pub max_attempts: u32,
    /// Delay before the first retry.
    pub base_delay_ms: u64,
    /// Upper bound on a single backoff delay.
    pub max_delay_ms: u64,
    /// Apply full jitter to each delay.
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 500,
            max_delay_ms: 30_000,
            jitter: true,
        }
    }
}

impl RetryConfig {
    /// Backoff delay after a failed attempt (1-based).
    ///
    /// Exponential growth capped at `max_delay_ms`; with jitter enabled the
    /// delay is drawn uniformly from [delay/2, delay] so concurrent
    /// crawlers do not retry in lockstep.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exp = self
            .base_delay_ms
            .saturating_mul(2u64.saturating_pow(attempt.saturating_sub(1)));
        let capped = exp.min(self.max_delay_ms);
        let millis = if self.jitter && capped > 1 {
            rand::thread_rng().gen_range(capped / 2..=capped)
        } else {
            capped
        };
        Duration::from_millis(millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_jitter() -> RetryConfig {
        RetryConfig {
            jitter: false,
            ..RetryConfig::default()
        }
    }

    #[test]
    fn delays_grow_exponentially() {
        let config = no_jitter();
        assert_eq!(config.delay_for(1), Duration::from_millis(500));
        assert_eq!(config.delay_for(2), Duration::from_millis(1000));
        assert_eq!(config.delay_for(3), Duration::from_millis(2000));
    }

    #[test]
    fn delays_are_capped() {
        let config = no_jitter();
        assert_eq!(config.delay_for(30), Duration::from_millis(30_000));
    }

    #[test]
    fn jitter_stays_within_half_to_full_delay() {
        let config = RetryConfig::default();
        for _ in 0..100 {
            let delay = config.delay_for(2);
            assert!(delay >= Duration::from_millis(500));
            assert!(delay <= Duration::from_millis(1000));
        }
    }

    #[test]
    fn huge_attempt_counts_do_not_overflow() {
        let config = no_jitter();
        assert_eq!(config.delay_for(u32::MAX), Duration::from_millis(30_000));
    }
}
