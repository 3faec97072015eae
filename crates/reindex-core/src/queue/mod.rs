//! Queue - タイムスタンプ順のブロッキングキューとリトライポリシー

mod entry;
mod priority;
mod retry;

pub use entry::QueueEntry;
pub use priority::PriorityQueue;
pub use retry::RetryPolicy;
