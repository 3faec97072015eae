//! SchedulerBuilder - コラボレーターを TaskScheduler に組み立てる
//!
//! `build()` は Fail-fast：コラボレーターの不足や不正な設定は、
//! 何かを登録したりスレッドを起動したりする前に BuildError として返す。

use std::sync::Arc;

use super::scheduler::TaskScheduler;
use crate::config::SchedulerConfig;
use crate::domain::InstanceId;
use crate::error::ConfigError;
use crate::ports::{
    Clock, MonitorRegistry, NoopMonitorRegistry, PartitionEnumerator, SystemClock, TaskExecutor,
    TaskStore,
};

/// # Example
/// ```ignore
/// let scheduler = SchedulerBuilder::new()
///     .config(config)
///     .store(store)
///     .executor(indexer)
///     .partitions(wikis)
///     .build()?;
/// scheduler.initialize()?;
/// let consumer = scheduler.start_consumer()?;
/// ```
///
/// `monitors` defaults to [`NoopMonitorRegistry`] and `clock` to
/// [`SystemClock`]; the store, executor and partitions are required.
#[derive(Default)]
pub struct SchedulerBuilder {
    config: SchedulerConfig,
    store: Option<Arc<dyn TaskStore>>,
    executor: Option<Arc<dyn TaskExecutor>>,
    partitions: Option<Arc<dyn PartitionEnumerator>>,
    monitors: Option<Arc<dyn MonitorRegistry>>,
    clock: Option<Arc<dyn Clock>>,
}

#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("missing collaborator: {0}")]
    MissingCollaborator(&'static str),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl SchedulerBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn config(mut self, config: SchedulerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn store(mut self, store: Arc<dyn TaskStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn executor(mut self, executor: Arc<dyn TaskExecutor>) -> Self {
        self.executor = Some(executor);
        self
    }

    pub fn partitions(mut self, partitions: Arc<dyn PartitionEnumerator>) -> Self {
        self.partitions = Some(partitions);
        self
    }

    pub fn monitors(mut self, monitors: Arc<dyn MonitorRegistry>) -> Self {
        self.monitors = Some(monitors);
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn build(self) -> Result<TaskScheduler, BuildError> {
        self.config.validate()?;

        let store = self.store.ok_or(BuildError::MissingCollaborator("store"))?;
        let executor = self
            .executor
            .ok_or(BuildError::MissingCollaborator("executor"))?;
        let partitions = self
            .partitions
            .ok_or(BuildError::MissingCollaborator("partitions"))?;
        let monitors = self
            .monitors
            .unwrap_or_else(|| Arc::new(NoopMonitorRegistry));
        let clock = self.clock.unwrap_or_else(|| Arc::new(SystemClock));

        let instance_id = InstanceId::new(self.config.instance_id.as_str());

        Ok(TaskScheduler::new(
            store,
            executor,
            partitions,
            monitors,
            clock,
            self.config,
            instance_id,
        ))
    }
}
