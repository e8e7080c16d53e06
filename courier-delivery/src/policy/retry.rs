//! Retry policy for delivery operations.
//!
//! A message is abandoned once it has used up its attempts or has been
//! around longer than the retry window, whichever comes first. The policy is
//! consulted before every attempt, so a message that is already out of budget
//! never reaches the transport, and again after every failure.

use std::time::Duration;

/// Why a message was abandoned
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GiveUpReason {
    AttemptsExhausted { attempts: u32, max_attempts: u32 },
    WindowElapsed { age: Duration, window: Duration },
}

impl std::fmt::Display for GiveUpReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::AttemptsExhausted {
                attempts,
                max_attempts,
            } => write!(
                f,
                "Retry budget exhausted after {attempts} attempts (max {max_attempts})"
            ),
            Self::WindowElapsed { age, window } => write!(
                f,
                "Retry window of {}s elapsed (message age {}s)",
                window.as_secs(),
                age.as_secs()
            ),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    Proceed,
    GiveUp(GiveUpReason),
}

/// Retry budget for a message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Attempts allowed before giving up
    pub max_attempts: u32,
    /// Maximum age, measured from creation, before giving up
    pub max_retry_window: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            max_retry_window: Duration::from_secs(3600),
        }
    }
}

impl RetryPolicy {
    #[must_use]
    pub const fn new(max_attempts: u32, max_retry_window: Duration) -> Self {
        Self {
            max_attempts,
            max_retry_window,
        }
    }

    /// Decide whether a message with `attempts` made so far and the given age
    /// may be attempted (again)
    ///
    /// The attempt budget is checked first, so a message that is both out of
    /// attempts and out of time reports `AttemptsExhausted`.
    #[must_use]
    pub const fn evaluate(&self, attempts: u32, age: Duration) -> RetryDecision {
        if attempts >= self.max_attempts {
            return RetryDecision::GiveUp(GiveUpReason::AttemptsExhausted {
                attempts,
                max_attempts: self.max_attempts,
            });
        }

        if age.as_nanos() > self.max_retry_window.as_nanos() {
            return RetryDecision::GiveUp(GiveUpReason::WindowElapsed {
                age,
                window: self.max_retry_window,
            });
        }

        RetryDecision::Proceed
    }

    /// Attempts left before the budget is exhausted
    #[must_use]
    pub const fn remaining_attempts(&self, attempts: u32) -> u32 {
        self.max_attempts.saturating_sub(attempts)
    }
}
