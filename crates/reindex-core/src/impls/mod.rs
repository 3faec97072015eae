//! Impls - 実装（開発用・テスト用）
//!
//! このモジュールには ports のインメモリ実装を含めます。
//!
//! # 含まれる実装
//! - **InMemoryTaskStore**: テスト用の正本
//! - **StaticPartitions** / **UnavailablePartitions**: パーティション列挙
//! - **FnExecutor**: クロージャで書く TaskExecutor
//! - **InMemoryMonitorRegistry**: 登録されたビューを保持するだけの監視レジストリ
//!
//! 本番では DB ベースの TaskStore とインデクサを別途差し込みます。

pub mod executor;
pub mod inmem_store;
pub mod monitor;
pub mod partitions;

pub use self::executor::FnExecutor;
pub use self::inmem_store::InMemoryTaskStore;
pub use self::monitor::InMemoryMonitorRegistry;
pub use self::partitions::{StaticPartitions, UnavailablePartitions};
