//! Per-block retry policy

use crate::config::RetryConfig;
use rand::Rng;
use std::time::Duration;

/// Bounded attempts with a randomized pause between them
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    backoff_min: Duration,
    backoff_max: Duration,
}

impl RetryPolicy {
    /// `max_attempts` is clamped to at least one attempt and the bounds are
    /// swapped if given in the wrong order.
    pub fn new(max_attempts: u32, backoff_min: Duration, backoff_max: Duration) -> Self {
        let (backoff_min, backoff_max) = if backoff_min <= backoff_max {
            (backoff_min, backoff_max)
        } else {
            (backoff_max, backoff_min)
        };
        Self {
            max_attempts: max_attempts.max(1),
            backoff_min,
            backoff_max,
        }
    }

    /// Retry immediately, for tests
    pub fn immediate(max_attempts: u32) -> Self {
        Self::new(max_attempts, Duration::ZERO, Duration::ZERO)
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Whether another attempt may follow attempt number `attempt` (1-based)
    pub fn allows_retry_after(&self, attempt: u32) -> bool {
        attempt < self.max_attempts
    }

    /// Pause before the next attempt
    pub fn backoff(&self) -> Duration {
        if self.backoff_min == self.backoff_max {
            return self.backoff_min;
        }
        let min = self.backoff_min.as_millis() as u64;
        let max = self.backoff_max.as_millis() as u64;
        Duration::from_millis(rand::rng().random_range(min..=max))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&RetryConfig::default())
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self::new(
            config.max_attempts,
            Duration::from_millis(config.backoff_min_millis),
            Duration::from_millis(config.backoff_max_millis),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_policy() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_attempts(), 3);
        for _ in 0..100 {
            let delay = policy.backoff();
            assert!(delay >= Duration::from_secs(5));
            assert!(delay <= Duration::from_secs(10));
        }
    }

    #[test]
    fn test_attempt_cap() {
        let policy = RetryPolicy::immediate(3);
        assert!(policy.allows_retry_after(1));
        assert!(policy.allows_retry_after(2));
        assert!(!policy.allows_retry_after(3));
    }

    #[test]
    fn test_single_attempt_never_retries() {
        let policy = RetryPolicy::immediate(0);
        assert_eq!(policy.max_attempts(), 1);
        assert!(!policy.allows_retry_after(1));
    }

    #[test]
    fn test_immediate_has_no_delay() {
        assert_eq!(RetryPolicy::immediate(3).backoff(), Duration::ZERO);
    }

    #[test]
    fn test_inverted_bounds_are_swapped() {
        let policy = RetryPolicy::new(2, Duration::from_millis(20), Duration::from_millis(10));
        let delay = policy.backoff();
        assert!(delay >= Duration::from_millis(10) && delay <= Duration::from_millis(20));
    }
}
