//! TaskScheduler - producer とホストプロセスが触る窓口

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::JoinHandle;

use tracing::{debug, info, warn};

use super::consumer::Consumer;
use super::gate::ProducerGate;
use super::status::{QueueStats, QueueView};
use crate::config::SchedulerConfig;
use crate::domain::{
    CompletionHandle, ConsumerState, InstanceId, PartitionId, TaskData, TaskKey, TaskType,
};
use crate::error::{SchedulerError, root_cause_message};
use crate::ports::{Clock, MonitorRegistry, PartitionEnumerator, TaskExecutor, TaskStore};
use crate::queue::{PriorityQueue, RetryPolicy};

/// Name under which the queue view is registered with the monitoring facade.
pub const MONITOR_NAME: &str = "index";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Lifecycle {
    Created,
    Ready,
    Started,
    Disposed,
}

/// Durable, in-process scheduler for document indexing tasks.
///
/// # Lifecycle
/// 1. [`TaskScheduler::initialize`] reloads unfinished tasks from the store
/// 2. [`TaskScheduler::start_consumer`] spawns the single consumer thread
/// 3. [`TaskScheduler::dispose`] enqueues the stop sentinel
///
/// Producers may call [`TaskScheduler::add_task`] / [`TaskScheduler::replace_task`]
/// at any point, including before and during recovery.
pub struct TaskScheduler {
    store: Arc<dyn TaskStore>,
    executor: Arc<dyn TaskExecutor>,
    partitions: Arc<dyn PartitionEnumerator>,
    monitors: Arc<dyn MonitorRegistry>,
    clock: Arc<dyn Clock>,

    config: SchedulerConfig,
    retry_policy: RetryPolicy,
    instance_id: InstanceId,

    queue: Arc<PriorityQueue>,
    gate: ProducerGate,
    lifecycle: Mutex<Lifecycle>,
}

impl TaskScheduler {
    pub(crate) fn new(
        store: Arc<dyn TaskStore>,
        executor: Arc<dyn TaskExecutor>,
        partitions: Arc<dyn PartitionEnumerator>,
        monitors: Arc<dyn MonitorRegistry>,
        clock: Arc<dyn Clock>,
        config: SchedulerConfig,
        instance_id: InstanceId,
    ) -> Self {
        let retry_policy = config.retry_policy();
        Self {
            store,
            executor,
            partitions,
            monitors,
            clock,
            config,
            retry_policy,
            instance_id,
            queue: Arc::new(PriorityQueue::new()),
            gate: ProducerGate::default(),
            lifecycle: Mutex::new(Lifecycle::Created),
        }
    }

    fn lifecycle(&self) -> MutexGuard<'_, Lifecycle> {
        self.lifecycle.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn instance_id(&self) -> &InstanceId {
        &self.instance_id
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Schedule a task. Returns as soon as it is queued.
    ///
    /// Persistence is best-effort: if the store rejects the row the task still
    /// runs in this process, but is lost if the process stops first.
    pub fn add_task(
        &self,
        partition: impl Into<PartitionId>,
        doc_id: i64,
        version: impl Into<String>,
        task_type: impl Into<TaskType>,
    ) -> CompletionHandle {
        let task = self.new_task(partition.into(), doc_id, version.into(), task_type.into());
        let completion = task.completion().clone();

        let _producer = self.gate.producer();
        if let Err(err) = self.store.add_task(task.partition(), &task.to_stored(&self.instance_id)) {
            warn!(
                partition = %task.partition(),
                doc_id,
                task_type = %task.task_type(),
                version = task.version(),
                cause = %root_cause_message(&err),
                "failed to persist task; it is queued but will not be restarted if not completed before the process stops"
            );
        }
        self.queue.put(task);
        completion
    }

    /// Schedule a task, superseding every queued task with the same
    /// `(partition, task_type, doc_id)`. Superseded handles are cancelled
    /// before this returns.
    pub fn replace_task(
        &self,
        partition: impl Into<PartitionId>,
        doc_id: i64,
        version: impl Into<String>,
        task_type: impl Into<TaskType>,
    ) -> CompletionHandle {
        let task = self.new_task(partition.into(), doc_id, version.into(), task_type.into());
        let completion = task.completion().clone();

        let _producer = self.gate.producer();
        if let Err(err) =
            self.store.replace_task(task.partition(), &task.to_stored(&self.instance_id))
        {
            warn!(
                partition = %task.partition(),
                doc_id,
                task_type = %task.task_type(),
                version = task.version(),
                cause = %root_cause_message(&err),
                "failed to persist replacing task; it is queued but will not be restarted if not completed before the process stops"
            );
        }
        let superseded = self.queue.replace(task);
        debug!(doc_id, superseded, "task replaced");
        completion
    }

    fn new_task(
        &self,
        partition: PartitionId,
        doc_id: i64,
        version: String,
        task_type: TaskType,
    ) -> TaskData {
        TaskData::new(partition, doc_id, version, task_type, self.clock.now())
    }

    /// Register the monitoring view and reload persisted tasks.
    ///
    /// A failure here is fatal: the consumer must not start with a partial
    /// backlog. Calling `initialize` again after a failure retries recovery.
    pub fn initialize(&self) -> Result<(), SchedulerError> {
        let mut lifecycle = self.lifecycle();
        match *lifecycle {
            Lifecycle::Created => {}
            Lifecycle::Ready | Lifecycle::Started => return Err(SchedulerError::AlreadyInitialized),
            Lifecycle::Disposed => return Err(SchedulerError::Disposed),
        }

        self.monitors.register(
            MONITOR_NAME,
            Arc::new(QueueView::new(Arc::clone(&self.queue))),
        );
        if let Err(err) = self.recover() {
            self.monitors.unregister(MONITOR_NAME);
            return Err(err);
        }

        *lifecycle = Lifecycle::Ready;
        info!(
            instance_id = %self.instance_id,
            queued = self.queue.len(),
            "task scheduler initialized"
        );
        Ok(())
    }

    fn recover(&self) -> Result<(), SchedulerError> {
        let partitions = self
            .partitions
            .list_partitions()
            .map_err(SchedulerError::PartitionListing)?;
        for partition in &partitions {
            self.recover_partition(partition)?;
        }
        Ok(())
    }

    /// Reload one partition's rows.
    ///
    /// Rows are read first and the queue is snapshotted second, under the
    /// recovery side of the gate: a producer that wrote its row before the
    /// read is already queued by the time the snapshot is taken, and a
    /// producer that writes after the read is not among the loaded rows.
    /// Lookups go through the snapshot set, so this is linear in the number
    /// of rows rather than rows x queue length.
    fn recover_partition(&self, partition: &PartitionId) -> Result<(), SchedulerError> {
        let rows = self
            .store
            .get_all_tasks(partition, &self.instance_id)
            .map_err(|source| SchedulerError::Recovery {
                partition: partition.clone(),
                source,
            })?;

        let existing: HashSet<TaskKey> = {
            let _recovery = self.gate.recovery();
            self.queue.keys()
        };

        let mut restored = 0usize;
        for row in &rows {
            let task = TaskData::from_stored(partition, row);
            if !existing.contains(&task.key()) {
                self.queue.put(task);
                restored += 1;
            }
        }
        info!(
            partition = %partition,
            stored = rows.len(),
            restored,
            "recovered persisted tasks"
        );
        Ok(())
    }

    /// Spawn the consumer thread. Requires a successful [`Self::initialize`].
    pub fn start_consumer(&self) -> Result<JoinHandle<ConsumerState>, SchedulerError> {
        let mut lifecycle = self.lifecycle();
        match *lifecycle {
            Lifecycle::Ready => {}
            Lifecycle::Created => return Err(SchedulerError::NotInitialized),
            Lifecycle::Started => return Err(SchedulerError::AlreadyStarted),
            Lifecycle::Disposed => return Err(SchedulerError::Disposed),
        }

        let consumer = Consumer::new(
            Arc::clone(&self.queue),
            Arc::clone(&self.executor),
            Arc::clone(&self.store),
            Arc::clone(&self.clock),
            self.retry_policy.clone(),
            self.instance_id.clone(),
        );
        let handle = std::thread::Builder::new()
            .name(self.config.consumer_thread_name.clone())
            .spawn(move || consumer.run())
            .map_err(SchedulerError::ThreadSpawn)?;

        *lifecycle = Lifecycle::Started;
        Ok(handle)
    }

    /// Stop the consumer after the task it is currently running (if any).
    ///
    /// Queued tasks stay in the store and are recovered on the next start.
    pub fn dispose(&self) {
        let mut lifecycle = self.lifecycle();
        match *lifecycle {
            Lifecycle::Disposed => return,
            Lifecycle::Ready | Lifecycle::Started => self.monitors.unregister(MONITOR_NAME),
            Lifecycle::Created => {}
        }
        *lifecycle = Lifecycle::Disposed;
        self.queue.put_stop();
        info!(pending = self.queue.len(), "task scheduler disposed");
    }

    pub fn queue_size(&self) -> usize {
        self.queue.len()
    }

    pub fn queue_size_of_type(&self, task_type: &str) -> usize {
        self.queue.len_of_type(&TaskType::new(task_type))
    }

    pub fn stats(&self) -> QueueStats {
        QueueStats::from_counts(self.queue.counts_by_type())
    }
}
