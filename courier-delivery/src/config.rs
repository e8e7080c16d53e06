use std::time::Duration;

use serde::Deserialize;

use crate::policy::RetryPolicy;

const fn default_max_attempts() -> u32 {
    3
}

const fn default_max_retry_window() -> u64 {
    3600 // 1 hour
}

const fn default_reconciliation_interval() -> u64 {
    5000 // 5 seconds
}

const fn default_queue_capacity() -> usize {
    100
}

const fn default_attempt_timeout() -> u64 {
    30_000 // 30 seconds
}

const fn default_reconciliation_batch_size() -> usize {
    10
}

/// Configuration for the [`Dispatcher`](crate::Dispatcher)
///
/// Every field is optional in the configuration file. A zero value is treated
/// as missing and falls back to the default; unknown keys are ignored.
///
/// ```ron
/// delivery: (
///     max_attempts: 5,
///     max_retry_window_secs: 7200,
///     reconciliation_interval_ms: 1000,
/// ),
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DispatcherConfig {
    /// Maximum number of delivery attempts before giving up
    ///
    /// Default: 3
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Maximum age of a message, from creation, before giving up (in seconds)
    ///
    /// Default: 3600 seconds (1 hour)
    #[serde(default = "default_max_retry_window")]
    pub max_retry_window_secs: u64,

    /// How often the pending partition is swept for work (in milliseconds)
    ///
    /// Default: 5000 milliseconds
    #[serde(default = "default_reconciliation_interval")]
    pub reconciliation_interval_ms: u64,

    /// Capacity of the in-memory work queue
    ///
    /// Submissions beyond this are still persisted and are picked up by the
    /// reconciliation sweep.
    ///
    /// Default: 100
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    /// Upper bound on a single delivery attempt (in milliseconds)
    ///
    /// Default: 30000 milliseconds
    #[serde(default = "default_attempt_timeout")]
    pub attempt_timeout_ms: u64,

    /// Pending records processed per reconciliation sweep
    ///
    /// Default: 10
    #[serde(default = "default_reconciliation_batch_size")]
    pub reconciliation_batch_size: usize,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            max_retry_window_secs: default_max_retry_window(),
            reconciliation_interval_ms: default_reconciliation_interval(),
            queue_capacity: default_queue_capacity(),
            attempt_timeout_ms: default_attempt_timeout(),
            reconciliation_batch_size: default_reconciliation_batch_size(),
        }
    }
}

impl DispatcherConfig {
    /// Replace zero values with their defaults
    #[must_use]
    pub fn normalised(mut self) -> Self {
        let defaults = Self::default();

        if self.max_attempts == 0 {
            self.max_attempts = defaults.max_attempts;
        }
        if self.max_retry_window_secs == 0 {
            self.max_retry_window_secs = defaults.max_retry_window_secs;
        }
        if self.reconciliation_interval_ms == 0 {
            self.reconciliation_interval_ms = defaults.reconciliation_interval_ms;
        }
        if self.queue_capacity == 0 {
            self.queue_capacity = defaults.queue_capacity;
        }
        if self.attempt_timeout_ms == 0 {
            self.attempt_timeout_ms = defaults.attempt_timeout_ms;
        }
        if self.reconciliation_batch_size == 0 {
            self.reconciliation_batch_size = defaults.reconciliation_batch_size;
        }

        self
    }

    #[must_use]
    pub const fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.max_attempts,
            Duration::from_secs(self.max_retry_window_secs),
        )
    }

    #[must_use]
    pub const fn reconciliation_interval(&self) -> Duration {
        Duration::from_millis(self.reconciliation_interval_ms)
    }

    #[must_use]
    pub const fn attempt_timeout(&self) -> Duration {
        Duration::from_millis(self.attempt_timeout_ms)
    }
}
