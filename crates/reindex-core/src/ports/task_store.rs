//! TaskStore - タスク行の永続化（パーティション単位）
//!
//! 再起動をまたぐ正本はストア側。インメモリのキューは起動時にここから
//! 再構築される（[`crate::app::TaskScheduler::initialize`] を参照）。

use crate::domain::{InstanceId, PartitionId, StoredTask};
use crate::error::StoreError;

/// Durable persistence of task rows.
///
/// # Contract
/// - Implementations must be safe to call from many producer threads and the
///   consumer thread at once (`Send + Sync`).
/// - `replace_task` supersedes every row of the same logical task
///   (`task_type` + `doc_id`) in the partition before storing the new one.
/// - `get_all_tasks` returns the unfinished rows written under `instance_id`.
/// - `delete_task` removes the row matching version, instance and timestamp
///   exactly; a row stored by a later replace is left alone, even when it
///   carries the same version.
pub trait TaskStore: Send + Sync {
    fn add_task(&self, partition: &PartitionId, task: &StoredTask) -> Result<(), StoreError>;

    fn replace_task(&self, partition: &PartitionId, task: &StoredTask) -> Result<(), StoreError>;

    fn get_all_tasks(
        &self,
        partition: &PartitionId,
        instance_id: &InstanceId,
    ) -> Result<Vec<StoredTask>, StoreError>;

    fn delete_task(&self, partition: &PartitionId, task: &StoredTask) -> Result<(), StoreError>;
}
