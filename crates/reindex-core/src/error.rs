use std::error::Error as StdError;
use std::path::PathBuf;

use thiserror::Error;

use crate::domain::PartitionId;

/// Failure reported by a [`crate::ports::TaskStore`] or partition enumerator.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("query failed for partition {partition}: {message}")]
    Query {
        partition: PartitionId,
        message: String,
    },

    #[error(transparent)]
    Other(#[from] Box<dyn StdError + Send + Sync>),
}

/// Failure reported by a [`crate::ports::TaskExecutor`].
#[derive(Debug, Error)]
pub enum ExecutionError {
    /// The consumer should stop: the process is shutting down.
    #[error("execution interrupted")]
    Interrupted,

    #[error("{0}")]
    Failed(String),

    #[error(transparent)]
    Other(#[from] Box<dyn StdError + Send + Sync>),
}

impl ExecutionError {
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed(message.into())
    }
}

#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("failed to list the partitions")]
    PartitionListing(#[source] StoreError),

    #[error("failed to get tasks for partition [{partition}]")]
    Recovery {
        partition: PartitionId,
        #[source]
        source: StoreError,
    },

    #[error("task scheduler is already initialized")]
    AlreadyInitialized,

    #[error("task scheduler is not initialized")]
    NotInitialized,

    #[error("consumer thread already started")]
    AlreadyStarted,

    #[error("task scheduler is disposed")]
    Disposed,

    #[error("failed to spawn the consumer thread")]
    ThreadSpawn(#[source] std::io::Error),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config")]
    Parse(#[from] serde_json::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Message of the innermost error in a `source()` chain.
///
/// Log lines carry the root cause rather than the full chain.
pub fn root_cause_message(err: &(dyn StdError + 'static)) -> String {
    let mut current = err;
    while let Some(source) = current.source() {
        current = source;
    }
    current.to_string()
}
