//! Scheduler configuration.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::queue::RetryPolicy;

/// Tunables for the task scheduler.
///
/// Every field has a default, so an empty JSON object is a valid config.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Total executions allowed per task before it is abandoned.
    pub max_attempts: u32,

    /// Recovery scope of this process. Must stay the same across restarts:
    /// recovery only reloads rows written under it.
    pub instance_id: String,

    /// Name of the consumer thread.
    pub consumer_thread_name: String,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            max_attempts: RetryPolicy::DEFAULT_MAX_ATTEMPTS,
            instance_id: Self::DEFAULT_INSTANCE_ID.to_string(),
            consumer_thread_name: "task-manager-consumer".to_string(),
        }
    }
}

impl SchedulerConfig {
    pub const DEFAULT_INSTANCE_ID: &'static str = "local";

    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&json)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_attempts == 0 {
            return Err(ConfigError::Invalid(
                "max_attempts must be at least 1".to_string(),
            ));
        }
        if self.consumer_thread_name.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "consumer_thread_name must not be empty".to_string(),
            ));
        }
        if self.instance_id.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "instance_id must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_attempts)
    }
}
