//! PartitionEnumerator - 起動時にリカバリするパーティションを列挙する port

use crate::domain::PartitionId;
use crate::error::StoreError;

pub trait PartitionEnumerator: Send + Sync {
    fn list_partitions(&self) -> Result<Vec<PartitionId>, StoreError>;
}
