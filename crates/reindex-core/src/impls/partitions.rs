//! StaticPartitions - 固定のパーティション一覧

use crate::domain::PartitionId;
use crate::error::StoreError;
use crate::ports::PartitionEnumerator;

/// 事前に分かっている一覧を返す
#[derive(Debug, Clone, Default)]
pub struct StaticPartitions {
    partitions: Vec<PartitionId>,
}

impl StaticPartitions {
    pub fn new<I, P>(partitions: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PartitionId>,
    {
        Self {
            partitions: partitions.into_iter().map(Into::into).collect(),
        }
    }
}

impl PartitionEnumerator for StaticPartitions {
    fn list_partitions(&self) -> Result<Vec<PartitionId>, StoreError> {
        Ok(self.partitions.clone())
    }
}

/// 常に失敗する列挙（初期化失敗のテスト用）
#[derive(Debug, Clone)]
pub struct UnavailablePartitions {
    reason: String,
}

impl UnavailablePartitions {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

impl PartitionEnumerator for UnavailablePartitions {
    fn list_partitions(&self) -> Result<Vec<PartitionId>, StoreError> {
        Err(StoreError::Unavailable(self.reason.clone()))
    }
}
