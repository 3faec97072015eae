//! TaskExecutor - 1 件のタスクのインデックス処理を行う port

use crate::domain::TaskData;
use crate::error::ExecutionError;

/// Runs one task synchronously on the consumer thread.
///
/// Deadlines are the executor's business; the consumer waits for as long as
/// `execute` takes. Returning [`ExecutionError::Interrupted`] stops the
/// consumer without retrying or cancelling the task.
pub trait TaskExecutor: Send + Sync {
    fn execute(&self, task: &TaskData) -> Result<(), ExecutionError>;
}
