//! Decision - 失敗したタスクをどう扱うか

/// The next action to take for a task whose execution failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Put the task back into contention at the current time.
    Retry,

    /// Give up: cancel the completion handle and drop the record.
    Abandon,
}
