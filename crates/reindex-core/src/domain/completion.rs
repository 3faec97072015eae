//! Completion handle: the caller-visible outcome of one scheduled task.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::watch;

/// Outcome of a scheduled task as seen by the producer.
///
/// State transitions:
/// - Pending -> Resolved (executor succeeded)
/// - Pending -> Cancelled (superseded by a replace, abandoned, or cancelled by the caller)
///
/// A transient failure keeps the task Pending; only abandonment is reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    Resolved,
    Cancelled,
}

impl TaskStatus {
    /// Is this a terminal state (no further transitions)?
    pub fn is_terminal(self) -> bool {
        matches!(self, TaskStatus::Resolved | TaskStatus::Cancelled)
    }
}

/// Cancellable handle shared by the producer and the queued record.
///
/// Cloning is cheap and every clone observes the same state. The first
/// terminal transition wins: resolving a cancelled handle (or cancelling a
/// resolved one) is a no-op, so producer threads may cancel while the
/// consumer thread resolves.
#[derive(Debug, Clone)]
pub struct CompletionHandle {
    state: Arc<watch::Sender<TaskStatus>>,
}

impl CompletionHandle {
    pub(crate) fn new() -> Self {
        let (tx, _rx) = watch::channel(TaskStatus::Pending);
        Self {
            state: Arc::new(tx),
        }
    }

    pub fn status(&self) -> TaskStatus {
        *self.state.borrow()
    }

    pub fn is_cancelled(&self) -> bool {
        self.status() == TaskStatus::Cancelled
    }

    pub fn is_done(&self) -> bool {
        self.status().is_terminal()
    }

    /// Cancel the task.
    ///
    /// Cooperative: an execution already in flight is not interrupted, only
    /// its outcome is marked. Returns `false` if the handle was already terminal.
    pub fn cancel(&self) -> bool {
        self.transition(TaskStatus::Cancelled)
    }

    pub(crate) fn resolve(&self) -> bool {
        self.transition(TaskStatus::Resolved)
    }

    fn transition(&self, to: TaskStatus) -> bool {
        self.state.send_if_modified(|current| {
            if current.is_terminal() {
                return false;
            }
            *current = to;
            true
        })
    }

    /// Wait until the task is resolved or cancelled.
    pub async fn wait(&self) -> TaskStatus {
        let mut rx = self.state.subscribe();
        match rx.wait_for(|status| status.is_terminal()).await {
            Ok(status) => *status,
            // `self` holds the sender, so it cannot be closed here.
            Err(_) => self.status(),
        }
    }
}
