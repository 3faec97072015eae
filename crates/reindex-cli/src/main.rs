use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use anyhow::{Context, Result, anyhow};
use chrono::{DateTime, Utc};
use clap::Parser;
use serde::Serialize;
use tokio::time::{Duration, timeout};
use tracing::{info, warn};

use reindex_core::domain::{InstanceId, StoredTask, TaskData, TaskStatus};
use reindex_core::error::ExecutionError;
use reindex_core::impls::{InMemoryTaskStore, StaticPartitions};
use reindex_core::ports::{TaskExecutor, TaskStore};
use reindex_core::{PartitionId, QueueStats, SchedulerBuilder, SchedulerConfig, TaskType};

/// Run the indexing task scheduler against in-memory collaborators.
#[derive(Debug, Parser)]
#[command(name = "reindex", version)]
struct Cli {
    /// JSON scheduler config
    #[arg(long, env = "REINDEX_CONFIG")]
    config: Option<PathBuf>,

    /// Partitions to schedule tasks in
    #[arg(long, value_delimiter = ',', default_value = "xwiki")]
    partitions: Vec<String>,

    /// Documents per partition
    #[arg(long, default_value_t = 5)]
    docs: i64,

    /// Number of executions that fail before the indexer starts succeeding
    #[arg(long, default_value_t = 2)]
    fail_first: u32,

    /// Overrides `max_attempts` from the config
    #[arg(long)]
    max_attempts: Option<u32>,

    /// Overrides `instance_id` from the config
    #[arg(long, env = "REINDEX_INSTANCE_ID")]
    instance_id: Option<String>,

    /// Seconds to wait for every task to finish
    #[arg(long, default_value_t = 30)]
    wait_secs: u64,
}

/// Indexer that fails its first `n` executions.
struct FlakyIndexer {
    remaining_failures: AtomicU32,
}

impl FlakyIndexer {
    fn new(n: u32) -> Self {
        Self {
            remaining_failures: AtomicU32::new(n),
        }
    }
}

impl TaskExecutor for FlakyIndexer {
    fn execute(&self, task: &TaskData) -> Result<(), ExecutionError> {
        let left = self.remaining_failures.load(Ordering::Relaxed);
        if left > 0 {
            self.remaining_failures.fetch_sub(1, Ordering::Relaxed);
            return Err(ExecutionError::failed(format!(
                "intentional failure (left={left})"
            )));
        }
        info!(task = %task, "indexed");
        Ok(())
    }
}

#[derive(Debug, Default, Serialize)]
struct Summary {
    resolved: usize,
    cancelled: usize,
    pending: usize,
    rows_left: usize,
    queue: QueueStats,
}

impl Summary {
    fn record(&mut self, status: TaskStatus) {
        match status {
            TaskStatus::Resolved => self.resolved += 1,
            TaskStatus::Cancelled => self.cancelled += 1,
            TaskStatus::Pending => self.pending += 1,
        }
    }
}

fn load_config(cli: &Cli) -> Result<SchedulerConfig> {
    let mut config = match &cli.config {
        Some(path) => SchedulerConfig::from_file(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => SchedulerConfig::default(),
    };
    if let Some(max_attempts) = cli.max_attempts {
        config.max_attempts = max_attempts;
    }
    if let Some(instance_id) = &cli.instance_id {
        config.instance_id = instance_id.clone();
    }
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let cli = Cli::parse();
    let config = load_config(&cli)?;
    let partitions: Vec<PartitionId> = cli.partitions.iter().map(PartitionId::new).collect();
    let first = partitions
        .first()
        .cloned()
        .ok_or_else(|| anyhow!("at least one partition is required"))?;

    let store = Arc::new(InMemoryTaskStore::new());

    // Leftover row from a "previous run", picked up by recovery.
    store.add_task(
        &first,
        &StoredTask {
            doc_id: 0,
            version: "0.9".to_string(),
            task_type: TaskType::new("links"),
            instance_id: InstanceId::new(config.instance_id.as_str()),
            timestamp: DateTime::<Utc>::UNIX_EPOCH,
        },
    )?;

    let scheduler = SchedulerBuilder::new()
        .config(config)
        .store(store.clone())
        .executor(Arc::new(FlakyIndexer::new(cli.fail_first)))
        .partitions(Arc::new(StaticPartitions::new(partitions.clone())))
        .build()?;

    scheduler.initialize().context("failed to initialize the scheduler")?;
    info!(recovered = scheduler.queue_size(), "recovery done");
    let consumer = scheduler.start_consumer()?;

    let mut handles = Vec::new();
    for partition in &partitions {
        for doc_id in 1..=cli.docs {
            handles.push(scheduler.add_task(partition.clone(), doc_id, "1.1", "links"));
        }
        // A newer revision of doc 1 supersedes the queued one.
        handles.push(scheduler.replace_task(partition.clone(), 1, "1.2", "links"));
    }

    let mut summary = Summary::default();
    let deadline = Duration::from_secs(cli.wait_secs);
    for handle in &handles {
        match timeout(deadline, handle.wait()).await {
            Ok(status) => summary.record(status),
            Err(_) => {
                warn!("timed out waiting for a task");
                summary.record(handle.status());
            }
        }
    }
    // The recovered task has no handle; give it a chance to drain.
    for _ in 0..50 {
        if scheduler.queue_size() == 0 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }

    summary.queue = scheduler.stats();
    scheduler.dispose();
    let state = tokio::task::spawn_blocking(move || consumer.join())
        .await
        .context("failed to join the consumer")?
        .map_err(|_| anyhow!("consumer thread panicked"))?;
    summary.rows_left = store.total_rows();

    info!(?state, "consumer stopped");
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}
