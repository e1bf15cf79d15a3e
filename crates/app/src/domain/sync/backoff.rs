//! Retry Policy

use jiff::SignedDuration;

/// Attempt ceiling and capped exponential backoff.
///
/// The delay after the `n`-th failed attempt is `base * 2^(n-1)` minutes,
/// never more than `cap`. A claimed job that reports nothing within
/// `lease_minutes` counts as a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_minutes: u32,
    pub cap_minutes: u32,
    pub lease_minutes: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_minutes: 5,
            cap_minutes: 30,
            lease_minutes: 10,
        }
    }
}

impl RetryPolicy {
    /// Backoff in minutes after `attempts` started attempts.
    #[must_use]
    pub fn delay_minutes(&self, attempts: u32) -> u32 {
        let exponent = attempts.saturating_sub(1);
        let factor = 1_u32.checked_shl(exponent).unwrap_or(u32::MAX);

        self.base_minutes.saturating_mul(factor).min(self.cap_minutes)
    }

    #[must_use]
    pub fn delay(&self, attempts: u32) -> SignedDuration {
        SignedDuration::from_mins(i64::from(self.delay_minutes(attempts)))
    }

    /// How long a claim stays valid without a report.
    #[must_use]
    pub fn lease(&self) -> SignedDuration {
        SignedDuration::from_mins(i64::from(self.lease_minutes.max(1)))
    }

    /// Whether another attempt may follow the `attempts`-th one.
    #[must_use]
    pub fn may_retry(&self, attempts: u32) -> bool {
        attempts < self.max_attempts
    }
}
