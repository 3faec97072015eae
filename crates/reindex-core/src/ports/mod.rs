//! Ports - 抽象化レイヤー
//!
//! キューと consumer スレッドはスケジューラが持つ。外部に触れるもの
//! （永続化、インデックス処理、パーティション列挙、監視、時刻）はすべて
//! これらの trait の向こう側に置く。

pub mod clock;
pub mod executor;
pub mod monitor;
pub mod partitions;
pub mod task_store;

pub use self::clock::{Clock, FixedClock, SystemClock};
pub use self::executor::TaskExecutor;
pub use self::monitor::{MonitorRegistry, NoopMonitorRegistry, QueueStatsSource};
pub use self::partitions::PartitionEnumerator;
pub use self::task_store::TaskStore;
