//! Consumer - 期限の来たタスクを 1 件ずつ実行するループ

use std::sync::Arc;

use tracing::{debug, error, info, warn};

use crate::domain::{ConsumerState, Decision, InstanceId, TaskData};
use crate::error::{ExecutionError, root_cause_message};
use crate::ports::{Clock, TaskExecutor, TaskStore};
use crate::queue::{PriorityQueue, QueueEntry, RetryPolicy};

/// The single consumer of the task queue.
///
/// # Flow
/// 1. `take` the next due entry (blocks while the queue is empty)
/// 2. stop sentinel: halt
/// 3. count the attempt; skip the task if it was superseded meanwhile
/// 4. execute, then resolve / retry / abandon
///
/// Halting is only observable through the sentinel (or an interrupted
/// executor); there is no shared flag to poll.
pub struct Consumer {
    queue: Arc<PriorityQueue>,
    executor: Arc<dyn TaskExecutor>,
    store: Arc<dyn TaskStore>,
    clock: Arc<dyn Clock>,
    retry_policy: RetryPolicy,
    instance_id: InstanceId,
}

impl Consumer {
    pub(crate) fn new(
        queue: Arc<PriorityQueue>,
        executor: Arc<dyn TaskExecutor>,
        store: Arc<dyn TaskStore>,
        clock: Arc<dyn Clock>,
        retry_policy: RetryPolicy,
        instance_id: InstanceId,
    ) -> Self {
        Self {
            queue,
            executor,
            store,
            clock,
            retry_policy,
            instance_id,
        }
    }

    /// Run until halted. Returns the final state.
    pub fn run(self) -> ConsumerState {
        info!("task consumer started");
        let mut state = ConsumerState::Running;
        while !state.is_terminal() {
            state = self.consume_one();
        }
        info!("task consumer halted");
        state
    }

    /// Take and process a single entry.
    pub(crate) fn consume_one(&self) -> ConsumerState {
        let mut task = match self.queue.take() {
            QueueEntry::Stop => {
                debug!("stop sentinel received");
                return ConsumerState::Halted;
            }
            QueueEntry::Task(task) => task,
        };

        let state = self.process(&mut task);
        self.queue.release_claim();
        state
    }

    fn process(&self, task: &mut TaskData) -> ConsumerState {
        let attempt = task.start_attempt();
        if task.is_deprecated() {
            debug!(task = %task, "skipping superseded task");
            return ConsumerState::Running;
        }

        debug!(task = %task, attempt, "executing task");
        match self.executor.execute(task) {
            Ok(()) => {
                task.completion().resolve();
                self.forget(task);
            }
            Err(ExecutionError::Interrupted) => {
                warn!(task = %task, "the task consumer thread was interrupted");
                return ConsumerState::Halted;
            }
            Err(err) => self.handle_failure(task, &err),
        }
        ConsumerState::Running
    }

    fn handle_failure(&self, task: &mut TaskData, err: &ExecutionError) {
        warn!(
            task = %task,
            cause = %root_cause_message(err),
            "error during the execution of task"
        );
        if task.is_deprecated() {
            return;
        }

        match self.retry_policy.decide(task.attempts()) {
            Decision::Retry => {
                task.reschedule(self.clock.now());
                self.queue.put(task.clone());
            }
            Decision::Abandon => {
                error!(
                    task = %task,
                    max_attempts = self.retry_policy.max_attempts,
                    "task abandoned because it has failed too many times"
                );
                task.completion().cancel();
            }
        }
    }

    /// Drop the persisted row of a task that ran to completion.
    fn forget(&self, task: &TaskData) {
        let stored = task.to_stored(&self.instance_id);
        if let Err(err) = self.store.delete_task(task.partition(), &stored) {
            warn!(
                task = %task,
                cause = %root_cause_message(&err),
                "failed to delete a completed task; it will run again after a restart"
            );
        }
    }
}
