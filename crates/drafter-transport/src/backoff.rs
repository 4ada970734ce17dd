//! Bounded exponential reconnect backoff.

use std::time::Duration;

/// Computes reconnect delays of `base * 2^(attempt-1)` up to a bounded
/// attempt cap.
///
/// The channel never retries indefinitely: once the cap is hit,
/// [`next_delay`](Self::next_delay) returns `None` and the caller surfaces
/// a terminal exhaustion signal instead of scheduling another timer.
#[derive(Debug, Clone)]
pub struct ReconnectBackoff {
    base: Duration,
    max_attempts: u32,
    attempt: u32,
}

impl ReconnectBackoff {
    /// Creates a backoff with the given base delay and attempt cap.
    pub fn new(base: Duration, max_attempts: u32) -> Self {
        Self {
            base,
            max_attempts,
            attempt: 0,
        }
    }

    /// Registers a failure and returns the delay before the next attempt,
    /// or `None` once the cap is exhausted.
    pub fn next_delay(&mut self) -> Option<Duration> {
        if self.attempt >= self.max_attempts {
            return None;
        }
        self.attempt += 1;
        Some(self.base * 2u32.saturating_pow(self.attempt - 1))
    }

    /// Attempt number of the most recent delay (1-based; 0 before the first
    /// failure).
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    /// Whether the cap has been reached.
    pub fn is_exhausted(&self) -> bool {
        self.attempt >= self.max_attempts
    }

    /// Resets the counter. Called on every successful open.
    pub fn reset(&mut self) {
        self.attempt = 0;
    }
}
