//! Reconnect backoff schedule.

use std::time::Duration;

/// Exponential backoff: attempt `n` (1-based) waits `base * 2^(n-1)`.
///
/// After `max_attempts` delays have been handed out, [`Backoff::next_delay`]
/// returns `None` until [`Backoff::reset`] is called.
#[derive(Debug, Clone)]
pub struct Backoff {
    base: Duration,
    max_attempts: u32,
    attempt: u32,
}

impl Backoff {
    pub fn new(base: Duration, max_attempts: u32) -> Self {
        Self {
            base,
            max_attempts,
            attempt: 0,
        }
    }

    /// Advance to the next attempt and return its delay.
    pub fn next_delay(&mut self) -> Option<Duration> {
        if self.attempt >= self.max_attempts {
            return None;
        }
        self.attempt += 1;
        let factor = 1u32.checked_shl(self.attempt - 1).unwrap_or(u32::MAX);
        Some(self.base.saturating_mul(factor))
    }

    /// Back to attempt 0 (called on a successful open).
    pub fn reset(&mut self) {
        self.attempt = 0;
    }

    /// Attempts consumed since the last reset.
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn is_exhausted(&self) -> bool {
        self.attempt >= self.max_attempts
    }
}
