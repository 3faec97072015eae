//! reindex-core
//!
//! Durable, in-process scheduler for document indexing tasks.
//!
//! Producers enqueue `(partition, doc_id, version, task_type)` tasks; a single
//! consumer thread runs them oldest-first through a pluggable executor,
//! retrying failures up to a configured attempt count. Every task is mirrored
//! into a [`ports::TaskStore`] so that unfinished work survives a restart.
//!
//! # Modules
//! - **domain**: identifiers, task records, completion handles
//! - **ports**: collaborator traits (TaskStore, TaskExecutor, PartitionEnumerator, Clock, ...)
//! - **queue**: timestamp-ordered blocking queue and retry policy
//! - **app**: builder, scheduler, consumer loop, queue stats
//! - **impls**: in-memory implementations for tests and local runs
//! - **config** / **error**: configuration and error types

pub mod app;
pub mod config;
pub mod domain;
pub mod error;
pub mod impls;
pub mod ports;
pub mod queue;

pub use app::{BuildError, QueueStats, SchedulerBuilder, TaskScheduler};
pub use config::SchedulerConfig;
pub use domain::{CompletionHandle, PartitionId, TaskData, TaskStatus, TaskType};
pub use error::{ExecutionError, SchedulerError, StoreError};
