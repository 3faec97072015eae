//! App - アプリケーション層
//!
//! ports を組み合わせてスケジューラを実装します。
//!
//! # 主要コンポーネント
//! - **SchedulerBuilder**: 構築とワイヤリング（起動時検証）
//! - **TaskScheduler**: producer API、リカバリ、ライフサイクル
//! - **Consumer**: take → execute → resolve / retry / abandon のループ
//! - **QueueView**: 監視用の読み取り専用ビュー

pub mod builder;
pub mod consumer;
pub(crate) mod gate;
pub mod scheduler;
pub mod status;

pub use self::builder::{BuildError, SchedulerBuilder};
pub use self::consumer::Consumer;
pub use self::scheduler::{MONITOR_NAME, TaskScheduler};
pub use self::status::{QueueStats, QueueView};
