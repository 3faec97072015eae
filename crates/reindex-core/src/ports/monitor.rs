//! Monitor - 外部の監視ファサード向けの読み取り専用 port

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::domain::TaskType;

/// Read-only view over the queue. Never mutates scheduler state.
pub trait QueueStatsSource: Send + Sync {
    fn current_size(&self) -> usize;

    fn size_by_type(&self) -> BTreeMap<TaskType, usize>;
}

/// Where the scheduler publishes its view while it is running.
pub trait MonitorRegistry: Send + Sync {
    fn register(&self, name: &str, source: Arc<dyn QueueStatsSource>);

    fn unregister(&self, name: &str);
}

/// 何もしないレジストリ（監視なし）
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopMonitorRegistry;

impl MonitorRegistry for NoopMonitorRegistry {
    fn register(&self, _name: &str, _source: Arc<dyn QueueStatsSource>) {}

    fn unregister(&self, _name: &str) {}
}
