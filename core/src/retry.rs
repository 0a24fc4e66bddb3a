//! Exponential backoff shared by the request engine and the query adapter.

use std::time::Duration;

pub const DEFAULT_MAX_RETRIES: u32 = 3;
pub const DEFAULT_BACKOFF_BASE: Duration = Duration::from_secs(1);

/// Retry ceiling plus the base of the doubling delay.
///
/// `delay(attempt) = base_delay * 2^attempt`, with `attempt` starting at 0.
/// No jitter is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            base_delay: DEFAULT_BACKOFF_BASE,
        }
    }
}

impl RetryPolicy {
    pub fn new(max_retries: u32, base_delay: Duration) -> Self {
        Self {
            max_retries,
            base_delay,
        }
    }

    pub fn delay(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(2u32.saturating_pow(attempt))
    }

    /// `delay(attempt)` in whole milliseconds, clamped to `u64::MAX`.
    pub fn delay_millis(&self, attempt: u32) -> u64 {
        u64::try_from(self.delay(attempt).as_millis()).unwrap_or(u64::MAX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_policy_doubles_from_one_second() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_retries, 3);
        assert_eq!(policy.delay(0), Duration::from_secs(1));
        assert_eq!(policy.delay(1), Duration::from_secs(2));
        assert_eq!(policy.delay(2), Duration::from_secs(4));
        assert_eq!(policy.delay(3), Duration::from_secs(8));
    }

    #[test]
    fn reduced_base_keeps_doubling() {
        let policy = RetryPolicy::new(5, Duration::from_millis(10));
        for attempt in 0..5 {
            assert_eq!(policy.delay(attempt + 1), policy.delay(attempt) * 2);
        }
    }

    #[test]
    fn huge_attempt_saturates() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay(64), Duration::from_secs(u64::from(u32::MAX)));
    }

    #[test]
    fn delay_millis_clamps_instead_of_wrapping() {
        assert_eq!(RetryPolicy::default().delay_millis(2), 4_000);
        let policy = RetryPolicy::new(3, Duration::MAX);
        assert_eq!(policy.delay(1), Duration::MAX);
        assert_eq!(policy.delay_millis(1), u64::MAX);
    }
}
