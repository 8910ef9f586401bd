//! Retry delays for failed polls.

use std::time::Duration;

use rand::Rng;

/// Exponential delay schedule, capped, with up to 10% jitter on top.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryBackoff {
    base: Duration,
    max: Duration,
}

impl RetryBackoff {
    pub fn new(base: Duration, max: Duration) -> Self {
        Self { base, max }
    }

    pub fn from_millis(base_ms: u64, max_ms: u64) -> Self {
        Self::new(Duration::from_millis(base_ms), Duration::from_millis(max_ms))
    }

    /// Delay after `failures` consecutive failures: `base`, `2 * base`, `4 * base`, ...
    /// up to `max`. Zero failures means no delay.
    pub fn delay(&self, failures: u32) -> Duration {
        if failures == 0 {
            return Duration::ZERO;
        }
        let factor = 1u32.checked_shl(failures - 1).unwrap_or(u32::MAX);
        let capped = self.base.saturating_mul(factor).min(self.max);
        capped + jitter(capped)
    }
}

// spreads out pollers that failed at the same moment
fn jitter(delay: Duration) -> Duration {
    let range = (delay.as_millis() / 10) as u64;
    if range == 0 {
        return Duration::ZERO;
    }
    Duration::from_millis(rand::thread_rng().gen_range(0..range))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn within(d: Duration, low_ms: u128, high_ms: u128) -> bool {
        d.as_millis() >= low_ms && d.as_millis() < high_ms
    }

    #[test]
    fn test_delay_doubles_until_capped() {
        let backoff = RetryBackoff::from_millis(100, 1_000);
        assert_eq!(backoff.delay(0), Duration::ZERO);
        assert!(within(backoff.delay(1), 100, 110));
        assert!(within(backoff.delay(2), 200, 220));
        assert!(within(backoff.delay(3), 400, 440));
        assert!(within(backoff.delay(10), 1_000, 1_100));
    }

    #[test]
    fn test_large_failure_counts_saturate() {
        let backoff = RetryBackoff::from_millis(1_000, 60_000);
        assert!(within(backoff.delay(40), 60_000, 66_000));
        assert!(within(backoff.delay(u32::MAX), 60_000, 66_000));
    }

    #[test]
    fn test_tiny_delays_have_no_jitter() {
        let backoff = RetryBackoff::from_millis(5, 5);
        assert_eq!(backoff.delay(1), Duration::from_millis(5));
    }
}
