use std::time::Duration;

/// Retry budget and backoff schedule for pin attempts.
///
/// The delay before retry *i* (0-indexed) is `backoff * 2^i`, with no
/// jitter and no delay after the final attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    attempts: u32,
    backoff: Duration,
}

impl RetryPolicy {
    /// Creates a policy; the attempt budget is clamped to at least one.
    pub fn new(attempts: u32, backoff: Duration) -> Self {
        RetryPolicy {
            attempts: attempts.max(1),
            backoff,
        }
    }

    /// One attempt, no backoff loop. Used for operator-driven manual retries.
    pub fn single_shot() -> Self {
        RetryPolicy {
            attempts: 1,
            backoff: Duration::ZERO,
        }
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Delay inserted after failed attempt `attempt` (0-indexed).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        self.backoff * 2u32.saturating_pow(attempt)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy {
            attempts: 3,
            backoff: Duration::from_millis(500),
        }
    }
}
