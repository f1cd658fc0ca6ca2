//! Bounded exponential backoff for stream network errors

use std::time::Duration;

/// Counts consecutive network failures and hands out backoff delays
///
/// Attempt `n` (1-based) waits `base * 2^n`: 2s, 4s, 8s with a 1s base.
#[derive(Debug, Clone)]
pub struct NetworkRetry {
    attempts: u32,
    max_attempts: u32,
    base_delay: Duration,
}

impl NetworkRetry {
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            attempts: 0,
            max_attempts,
            base_delay,
        }
    }

    /// Delay before the next retry, or `None` once the budget is spent
    ///
    /// Returning `None` also resets the counter so a later failure starts a
    /// fresh sequence.
    pub fn next_delay(&mut self) -> Option<Duration> {
        if self.attempts < self.max_attempts {
            self.attempts += 1;
            let factor = 2u32.saturating_pow(self.attempts);
            Some(self.base_delay.saturating_mul(factor))
        } else {
            self.attempts = 0;
            None
        }
    }

    /// Forget previous failures
    pub fn reset(&mut self) {
        self.attempts = 0;
    }

    /// Retries handed out in the current sequence
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }
}
