//! Domain - ドメインモデル（ids, task, completion, decision, state）

pub mod completion;
pub mod decision;
pub mod ids;
pub mod state;
pub mod task;

pub use completion::{CompletionHandle, TaskStatus};
pub use decision::Decision;
pub use ids::{InstanceId, PartitionId, TaskType};
pub use state::ConsumerState;
pub use task::{StoredTask, TaskData, TaskKey};
