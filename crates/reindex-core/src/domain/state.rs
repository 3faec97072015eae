//! ConsumerState - consumer ループの状態

use serde::{Deserialize, Serialize};

/// State of the consumer loop.
///
/// State transitions:
/// - Running -> Halted (stop sentinel received, or the executor reported an interruption)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConsumerState {
    Running,
    Halted,
}

impl ConsumerState {
    pub fn is_terminal(self) -> bool {
        matches!(self, ConsumerState::Halted)
    }
}
