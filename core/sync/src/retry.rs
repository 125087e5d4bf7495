//! Linear retry policy for save attempts.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Retry policy for the save pipeline.
///
/// Attempts are numbered from 1. A failed attempt `n` below the bound is
/// retried after `base_delay × n`, so a three-attempt cycle is spaced
/// roughly 1×, 2× the base unit before it is declared terminal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Maximum number of write attempts per change cycle.
    pub max_attempts: u32,
    /// Base unit for the linear backoff.
    pub base_delay: Duration,
}

impl RetryPolicy {
    /// Create a policy with the given attempt bound.
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            base_delay: Duration::from_secs(1),
        }
    }

    /// Set the backoff base unit.
    pub fn with_base_delay(mut self, delay: Duration) -> Self {
        self.base_delay = delay;
        self
    }

    /// Whether another attempt may follow the given failed attempt.
    pub fn should_retry(&self, failed_attempt: u32) -> bool {
        failed_attempt < self.max_attempts
    }

    /// Delay before the attempt that follows `failed_attempt`.
    pub fn delay_after_attempt(&self, failed_attempt: u32) -> Duration {
        self.base_delay * failed_attempt
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3)
    }
}
