//! Task record: identity + scheduling metadata + completion handle.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::completion::CompletionHandle;
use super::ids::{InstanceId, PartitionId, TaskType};

/// Logical identity of a task: `(partition, task_type, doc_id)`.
///
/// Version and timestamp never participate, so two records for different
/// revisions of the same document are "the same task" for replace and recovery.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TaskKey {
    pub partition: PartitionId,
    pub task_type: TaskType,
    pub doc_id: i64,
}

impl fmt::Display for TaskKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.partition, self.task_type, self.doc_id)
    }
}

/// Persisted shape of a task, as exchanged with a [`crate::ports::TaskStore`].
///
/// The partition is not part of the row: stores key their rows per partition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredTask {
    pub doc_id: i64,
    pub version: String,
    pub task_type: TaskType,
    pub instance_id: InstanceId,
    pub timestamp: DateTime<Utc>,
}

impl StoredTask {
    /// Same logical task (ignores version, instance and timestamp).
    pub fn same_task(&self, other: &StoredTask) -> bool {
        self.doc_id == other.doc_id && self.task_type == other.task_type
    }
}

/// A unit of work in the scheduling queue.
///
/// Design:
/// - Identity fields are immutable once created.
/// - Only the consumer mutates `attempts` and `timestamp`, and only while it
///   owns the record (between `take` and re-enqueue).
/// - `created_at` never changes: it is the timestamp of the persisted row, so a
///   retried record still deletes exactly its own row.
/// - The completion handle is shared with the producer that created it.
#[derive(Debug, Clone)]
pub struct TaskData {
    partition: PartitionId,
    doc_id: i64,
    version: String,
    task_type: TaskType,

    /// Scheduling key, also the not-before time of a retry.
    timestamp: DateTime<Utc>,

    created_at: DateTime<Utc>,

    /// Number of times this record has been dequeued for execution.
    attempts: u32,

    completion: CompletionHandle,
}

impl TaskData {
    pub fn new(
        partition: PartitionId,
        doc_id: i64,
        version: impl Into<String>,
        task_type: TaskType,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            partition,
            doc_id,
            version: version.into(),
            task_type,
            timestamp,
            created_at: timestamp,
            attempts: 0,
            completion: CompletionHandle::new(),
        }
    }

    /// Rebuild a queue record from a persisted row (recovery).
    pub fn from_stored(partition: &PartitionId, stored: &StoredTask) -> Self {
        Self::new(
            partition.clone(),
            stored.doc_id,
            stored.version.clone(),
            stored.task_type.clone(),
            stored.timestamp,
        )
    }

    pub fn to_stored(&self, instance_id: &InstanceId) -> StoredTask {
        StoredTask {
            doc_id: self.doc_id,
            version: self.version.clone(),
            task_type: self.task_type.clone(),
            instance_id: instance_id.clone(),
            timestamp: self.created_at,
        }
    }

    pub fn key(&self) -> TaskKey {
        TaskKey {
            partition: self.partition.clone(),
            task_type: self.task_type.clone(),
            doc_id: self.doc_id,
        }
    }

    pub fn is_same_task(&self, key: &TaskKey) -> bool {
        self.doc_id == key.doc_id && self.task_type == key.task_type && self.partition == key.partition
    }

    pub fn partition(&self) -> &PartitionId {
        &self.partition
    }

    pub fn doc_id(&self) -> i64 {
        self.doc_id
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn task_type(&self) -> &TaskType {
        &self.task_type
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn completion(&self) -> &CompletionHandle {
        &self.completion
    }

    /// A record is deprecated once its handle is cancelled (superseded by a
    /// replace, or cancelled by its producer). Deprecated records never run.
    pub fn is_deprecated(&self) -> bool {
        self.completion.is_cancelled()
    }

    /// Count one more dequeue. Returns the new attempt number (1-indexed).
    pub(crate) fn start_attempt(&mut self) -> u32 {
        self.attempts = self.attempts.saturating_add(1);
        self.attempts
    }

    /// Push the record back into contention at `now`.
    pub(crate) fn reschedule(&mut self, now: DateTime<Utc>) {
        self.timestamp = now;
    }
}

impl fmt::Display for TaskData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "task[partition={}, type={}, doc_id={}, version={}, attempts={}]",
            self.partition, self.task_type, self.doc_id, self.version, self.attempts
        )
    }
}
