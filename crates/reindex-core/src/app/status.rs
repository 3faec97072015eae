//! Status - 監視向けのキュー統計

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::domain::TaskType;
use crate::ports::QueueStatsSource;
use crate::queue::PriorityQueue;

/// Point-in-time queue statistics.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueStats {
    pub total: usize,
    pub by_type: BTreeMap<String, usize>,
}

impl QueueStats {
    pub fn from_counts(counts: BTreeMap<TaskType, usize>) -> Self {
        let total = counts.values().sum();
        let by_type = counts
            .into_iter()
            .map(|(task_type, count)| (task_type.as_str().to_string(), count))
            .collect();
        Self { total, by_type }
    }
}

/// Read-only view registered with the monitoring facade.
pub struct QueueView {
    queue: Arc<PriorityQueue>,
}

impl QueueView {
    pub fn new(queue: Arc<PriorityQueue>) -> Self {
        Self { queue }
    }

    pub fn stats(&self) -> QueueStats {
        QueueStats::from_counts(self.queue.counts_by_type())
    }
}

impl QueueStatsSource for QueueView {
    fn current_size(&self) -> usize {
        self.queue.len()
    }

    fn size_by_type(&self) -> BTreeMap<TaskType, usize> {
        self.queue.counts_by_type()
    }
}
