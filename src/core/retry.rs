//! Back-off policy shared by the broadcast dispatcher.
//!
//! Two delays are derived from the same exponential margin:
//! - plain retries wait `min(base * 2^attempt, cap)`
//! - rate-limited retries wait the server hint plus that same margin

use std::time::Duration;

use crate::core::config;

/// Exponential back-off configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffPolicy {
    /// Delay before the first retry
    pub base: Duration,
    /// Largest margin ever added
    pub cap: Duration,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            base: Duration::from_secs(1),
            cap: config::broadcast::backoff_cap(),
        }
    }
}

impl BackoffPolicy {
    /// Creates a policy with the default base (1s) and cap (30s).
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the base delay.
    #[must_use]
    pub fn base(mut self, base: Duration) -> Self {
        self.base = base;
        self
    }

    /// Sets the margin cap.
    #[must_use]
    pub fn cap(mut self, cap: Duration) -> Self {
        self.cap = cap;
        self
    }

    /// Margin for a given zero-based attempt number.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        // 2^31 * anything already exceeds any sane cap
        let factor = 1u32.checked_shl(attempt.min(31)).unwrap_or(u32::MAX);
        self.base.saturating_mul(factor).min(self.cap)
    }

    /// Wait after a rate-limit rejection: the server hint, never shortened,
    /// plus the capped exponential margin.
    pub fn retry_after_delay(&self, hint: Duration, attempt: u32) -> Duration {
        hint.saturating_add(self.delay_for_attempt(attempt))
    }
}
