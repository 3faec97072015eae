//! RetryPolicy - リトライか放棄かを決める

use crate::domain::Decision;

/// Retry policy for failed tasks.
///
/// There is no backoff at this layer: a retried task is rescheduled at "now"
/// and competes with everything else already due. The policy only bounds how
/// many times a task may run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total number of executions allowed for one task (first run included).
    pub max_attempts: u32,
}

impl RetryPolicy {
    pub const DEFAULT_MAX_ATTEMPTS: u32 = 10;

    pub fn new(max_attempts: u32) -> Self {
        Self { max_attempts }
    }

    /// Decide what happens after the `attempts`-th execution failed.
    ///
    /// # Arguments
    /// * `attempts` - Number of executions already made (1-indexed).
    pub fn decide(&self, attempts: u32) -> Decision {
        if attempts < self.max_attempts {
            Decision::Retry
        } else {
            Decision::Abandon
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(Self::DEFAULT_MAX_ATTEMPTS)
    }
}
