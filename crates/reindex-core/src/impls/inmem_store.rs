//! InMemoryTaskStore - テスト・開発用のタスク行ストア
//!
//! # 実装詳細
//! - HashMap<PartitionId, Vec<StoredTask>> を Mutex で保護
//! - 書き込み失敗・読み込み失敗を注入できる（エラー経路のテスト用）
//! - スケジューラを作り直しても行は残るので、DB なしでリカバリを試せる

use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::domain::{InstanceId, PartitionId, StoredTask};
use crate::error::StoreError;
use crate::ports::TaskStore;

#[derive(Default)]
struct StoreState {
    rows: HashMap<PartitionId, Vec<StoredTask>>,
    fail_writes: bool,
    failing_reads: HashSet<PartitionId>,
}

/// InMemoryTaskStore はスレッドセーフな partition → rows のマップ
#[derive(Default)]
pub struct InMemoryTaskStore {
    state: Mutex<StoreState>,
}

impl InMemoryTaskStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, StoreState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// `add_task` / `replace_task` / `delete_task` をすべて失敗させる
    pub fn set_fail_writes(&self, fail: bool) {
        self.lock().fail_writes = fail;
    }

    /// `partition` に対する `get_all_tasks` を失敗させる
    pub fn fail_reads_for(&self, partition: impl Into<PartitionId>) {
        self.lock().failing_reads.insert(partition.into());
    }

    /// Copy of every row in `partition`, regardless of instance.
    pub fn rows(&self, partition: &PartitionId) -> Vec<StoredTask> {
        self.lock().rows.get(partition).cloned().unwrap_or_default()
    }

    pub fn total_rows(&self) -> usize {
        self.lock().rows.values().map(Vec::len).sum()
    }

    fn writable(&self) -> Result<MutexGuard<'_, StoreState>, StoreError> {
        let state = self.lock();
        if state.fail_writes {
            return Err(StoreError::Unavailable("writes disabled".to_string()));
        }
        Ok(state)
    }
}

impl TaskStore for InMemoryTaskStore {
    fn add_task(&self, partition: &PartitionId, task: &StoredTask) -> Result<(), StoreError> {
        let mut state = self.writable()?;
        state
            .rows
            .entry(partition.clone())
            .or_default()
            .push(task.clone());
        Ok(())
    }

    fn replace_task(&self, partition: &PartitionId, task: &StoredTask) -> Result<(), StoreError> {
        let mut state = self.writable()?;
        let rows = state.rows.entry(partition.clone()).or_default();
        rows.retain(|row| !row.same_task(task));
        rows.push(task.clone());
        Ok(())
    }

    fn get_all_tasks(
        &self,
        partition: &PartitionId,
        instance_id: &InstanceId,
    ) -> Result<Vec<StoredTask>, StoreError> {
        let state = self.lock();
        if state.failing_reads.contains(partition) {
            return Err(StoreError::Query {
                partition: partition.clone(),
                message: "reads disabled".to_string(),
            });
        }
        Ok(state
            .rows
            .get(partition)
            .map(|rows| {
                rows.iter()
                    .filter(|row| &row.instance_id == instance_id)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    fn delete_task(&self, partition: &PartitionId, task: &StoredTask) -> Result<(), StoreError> {
        let mut state = self.writable()?;
        if let Some(rows) = state.rows.get_mut(partition) {
            rows.retain(|row| {
                !(row.same_task(task)
                    && row.version == task.version
                    && row.instance_id == task.instance_id
                    && row.timestamp == task.timestamp)
            });
        }
        Ok(())
    }
}
