use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use reindex_core::domain::{ConsumerState, InstanceId, StoredTask, TaskData};
use reindex_core::impls::{
    FnExecutor, InMemoryTaskStore, StaticPartitions, UnavailablePartitions,
};
use reindex_core::ports::{FixedClock, SystemClock, TaskExecutor, TaskStore};
use reindex_core::{
    CompletionHandle, ExecutionError, PartitionId, SchedulerBuilder, SchedulerConfig,
    SchedulerError, TaskScheduler, TaskStatus, TaskType,
};

type Runs = Arc<Mutex<Vec<(i64, String)>>>;

fn config(max_attempts: u32) -> SchedulerConfig {
    SchedulerConfig {
        max_attempts,
        instance_id: "node-1".to_string(),
        ..SchedulerConfig::default()
    }
}

fn recording() -> (Runs, Arc<dyn TaskExecutor>) {
    let runs: Runs = Arc::default();
    let executor = {
        let runs = Arc::clone(&runs);
        FnExecutor::new(move |task: &TaskData| {
            runs.lock()
                .unwrap()
                .push((task.doc_id(), task.version().to_string()));
            Ok(())
        })
    };
    (runs, Arc::new(executor))
}

fn scheduler(
    store: Arc<InMemoryTaskStore>,
    executor: Arc<dyn TaskExecutor>,
    max_attempts: u32,
) -> TaskScheduler {
    SchedulerBuilder::new()
        .config(config(max_attempts))
        .store(store)
        .executor(executor)
        .partitions(Arc::new(StaticPartitions::new(["xwiki", "sub"])))
        .build()
        .unwrap()
}

fn row(doc_id: i64, version: &str, instance: &str) -> StoredTask {
    StoredTask {
        doc_id,
        version: version.to_string(),
        task_type: TaskType::new("links"),
        instance_id: InstanceId::new(instance),
        timestamp: chrono::DateTime::from_timestamp_millis(doc_id).unwrap(),
    }
}

async fn settle(handle: &CompletionHandle) -> TaskStatus {
    tokio::time::timeout(Duration::from_secs(5), handle.wait())
        .await
        .expect("task did not settle in time")
}

#[tokio::test]
async fn tasks_run_in_timestamp_order_and_replace_supersedes() {
    let clock = Arc::new(FixedClock::at_millis(0));
    let (runs, executor) = recording();
    let scheduler = SchedulerBuilder::new()
        .config(config(3))
        .store(Arc::new(InMemoryTaskStore::new()))
        .executor(executor)
        .partitions(Arc::new(StaticPartitions::new(["xwiki"])))
        .clock(clock.clone())
        .build()
        .unwrap();
    scheduler.initialize().unwrap();

    clock.set_millis(100);
    let a = scheduler.add_task("xwiki", 1, "1", "links");
    clock.set_millis(50);
    let b = scheduler.add_task("xwiki", 2, "1", "links");
    clock.set_millis(75);
    let c = scheduler.add_task("xwiki", 3, "1", "links");
    clock.set_millis(200);
    let d = scheduler.replace_task("xwiki", 2, "2", "links");

    assert!(b.is_cancelled());
    assert_eq!(scheduler.queue_size(), 3);

    let consumer = scheduler.start_consumer().unwrap();
    for handle in [&a, &c, &d] {
        assert_eq!(settle(handle).await, TaskStatus::Resolved);
    }
    scheduler.dispose();
    assert_eq!(consumer.join().unwrap(), ConsumerState::Halted);

    let order: Vec<(i64, String)> = runs.lock().unwrap().clone();
    assert_eq!(
        order,
        vec![
            (3, "1".to_string()),
            (1, "1".to_string()),
            (2, "2".to_string()),
        ]
    );
    assert_eq!(b.status(), TaskStatus::Cancelled);
}

#[tokio::test]
async fn without_replace_oldest_runs_first() {
    let clock = Arc::new(FixedClock::at_millis(0));
    let (runs, executor) = recording();
    let scheduler = SchedulerBuilder::new()
        .store(Arc::new(InMemoryTaskStore::new()))
        .executor(executor)
        .partitions(Arc::new(StaticPartitions::new(["xwiki"])))
        .clock(clock.clone())
        .build()
        .unwrap();
    scheduler.initialize().unwrap();

    let mut handles = Vec::new();
    for (doc_id, ts) in [(1, 100), (2, 50), (3, 75)] {
        clock.set_millis(ts);
        handles.push(scheduler.add_task("xwiki", doc_id, "1", "links"));
    }

    let consumer = scheduler.start_consumer().unwrap();
    for handle in &handles {
        settle(handle).await;
    }
    scheduler.dispose();
    consumer.join().unwrap();

    let order: Vec<i64> = runs.lock().unwrap().iter().map(|(id, _)| *id).collect();
    assert_eq!(order, vec![2, 3, 1]);
}

#[tokio::test]
async fn always_failing_task_is_abandoned_after_max_attempts() {
    let store = Arc::new(InMemoryTaskStore::new());
    let executions = Arc::new(Mutex::new(0u32));
    let executor = {
        let executions = Arc::clone(&executions);
        FnExecutor::new(move |_: &TaskData| {
            *executions.lock().unwrap() += 1;
            Err(ExecutionError::failed("index unavailable"))
        })
    };
    let scheduler = scheduler(store.clone(), Arc::new(executor), 4);
    scheduler.initialize().unwrap();
    let consumer = scheduler.start_consumer().unwrap();

    let handle = scheduler.add_task("xwiki", 1, "1.1", "links");
    assert_eq!(settle(&handle).await, TaskStatus::Cancelled);

    scheduler.dispose();
    consumer.join().unwrap();
    assert_eq!(*executions.lock().unwrap(), 4);
    assert_eq!(scheduler.queue_size(), 0);
    // abandoned rows stay in the store
    assert_eq!(store.rows(&PartitionId::new("xwiki")).len(), 1);
}

#[tokio::test]
async fn transient_failure_is_retried_until_success() {
    let store = Arc::new(InMemoryTaskStore::new());
    let executions = Arc::new(Mutex::new(0u32));
    let executor = {
        let executions = Arc::clone(&executions);
        FnExecutor::new(move |_: &TaskData| {
            let mut count = executions.lock().unwrap();
            *count += 1;
            if *count <= 2 {
                Err(ExecutionError::failed("transient"))
            } else {
                Ok(())
            }
        })
    };
    let scheduler = scheduler(store.clone(), Arc::new(executor), 10);
    scheduler.initialize().unwrap();
    let consumer = scheduler.start_consumer().unwrap();

    let handle = scheduler.add_task("xwiki", 1, "1.1", "links");
    assert_eq!(settle(&handle).await, TaskStatus::Resolved);

    scheduler.dispose();
    consumer.join().unwrap();
    assert_eq!(*executions.lock().unwrap(), 3);
    assert!(store.rows(&PartitionId::new("xwiki")).is_empty());
}

#[test]
fn recovery_skips_tasks_already_queued() {
    let store = Arc::new(InMemoryTaskStore::new());
    let xwiki = PartitionId::new("xwiki");
    for doc_id in 1..=5 {
        store.add_task(&xwiki, &row(doc_id, "1.0", "node-1")).unwrap();
    }
    // another process's backlog
    store.add_task(&xwiki, &row(6, "1.0", "node-2")).unwrap();

    let (_, executor) = recording();
    let scheduler = scheduler(store, executor, 3);
    // produced while the process was starting up
    scheduler.add_task("xwiki", 1, "1.1", "links");
    scheduler.add_task("xwiki", 2, "1.1", "links");

    scheduler.initialize().unwrap();

    assert_eq!(scheduler.queue_size(), 5);
    assert_eq!(scheduler.queue_size_of_type("links"), 5);
}

#[test]
fn recovery_failure_is_fatal_and_blocks_the_consumer() {
    let store = Arc::new(InMemoryTaskStore::new());
    store.fail_reads_for("sub");
    let (_, executor) = recording();
    let scheduler = scheduler(store, executor, 3);

    let err = scheduler.initialize().unwrap_err();
    assert!(matches!(
        &err,
        SchedulerError::Recovery { partition, .. } if partition.as_str() == "sub"
    ));
    assert_eq!(err.to_string(), "failed to get tasks for partition [sub]");
    assert!(matches!(
        scheduler.start_consumer(),
        Err(SchedulerError::NotInitialized)
    ));
}

#[test]
fn partition_listing_failure_is_fatal() {
    let (_, executor) = recording();
    let scheduler = SchedulerBuilder::new()
        .store(Arc::new(InMemoryTaskStore::new()))
        .executor(executor)
        .partitions(Arc::new(UnavailablePartitions::new("wiki descriptors down")))
        .build()
        .unwrap();

    assert!(matches!(
        scheduler.initialize(),
        Err(SchedulerError::PartitionListing(_))
    ));
}

#[tokio::test]
async fn persistence_failure_does_not_prevent_execution() {
    let store = Arc::new(InMemoryTaskStore::new());
    store.set_fail_writes(true);
    let (runs, executor) = recording();
    let scheduler = scheduler(store.clone(), executor, 3);
    scheduler.initialize().unwrap();
    let consumer = scheduler.start_consumer().unwrap();

    let handle = scheduler.add_task("xwiki", 1, "1.1", "links");
    assert_eq!(settle(&handle).await, TaskStatus::Resolved);

    scheduler.dispose();
    consumer.join().unwrap();
    assert_eq!(runs.lock().unwrap().len(), 1);
    assert_eq!(store.total_rows(), 0);
}

#[test]
fn dispose_stops_after_the_in_flight_task_and_restart_recovers_the_rest() {
    let store = Arc::new(InMemoryTaskStore::new());
    let (started_tx, started_rx) = mpsc::channel::<i64>();
    let (go_tx, go_rx) = mpsc::channel::<()>();
    let started_tx = Mutex::new(started_tx);
    let go_rx = Mutex::new(go_rx);
    let executor = FnExecutor::new(move |task: &TaskData| {
        started_tx.lock().unwrap().send(task.doc_id()).unwrap();
        go_rx.lock().unwrap().recv().unwrap();
        Ok(())
    });

    let scheduler = scheduler(store.clone(), Arc::new(executor), 3);
    scheduler.initialize().unwrap();
    let handles: Vec<_> = (1..=3)
        .map(|doc_id| scheduler.add_task("xwiki", doc_id, "1.1", "links"))
        .collect();
    let consumer = scheduler.start_consumer().unwrap();

    let first = started_rx.recv_timeout(Duration::from_secs(5)).unwrap();
    scheduler.dispose();
    go_tx.send(()).unwrap();

    assert_eq!(consumer.join().unwrap(), ConsumerState::Halted);
    assert!(started_rx.try_recv().is_err());
    let pending: Vec<_> = handles
        .iter()
        .filter(|h| h.status() == TaskStatus::Pending)
        .collect();
    assert_eq!(pending.len(), 2);
    assert_eq!(scheduler.queue_size(), 2);

    let xwiki = PartitionId::new("xwiki");
    assert_eq!(store.rows(&xwiki).len(), 2);
    assert!(store.rows(&xwiki).iter().all(|r| r.doc_id != first));

    let (_, executor) = recording();
    let restarted = self::scheduler(store, executor, 3);
    restarted.initialize().unwrap();
    assert_eq!(restarted.queue_size(), 2);
}

#[test]
fn interrupted_executor_halts_and_leaves_the_handle_pending() {
    let executor = FnExecutor::new(|_: &TaskData| Err(ExecutionError::Interrupted));
    let scheduler = scheduler(Arc::new(InMemoryTaskStore::new()), Arc::new(executor), 3);
    scheduler.initialize().unwrap();

    let handle = scheduler.add_task("xwiki", 1, "1.1", "links");
    let consumer = scheduler.start_consumer().unwrap();

    assert_eq!(consumer.join().unwrap(), ConsumerState::Halted);
    assert_eq!(handle.status(), TaskStatus::Pending);
}

#[tokio::test]
async fn replace_while_executing_cancels_the_running_record() {
    let store = Arc::new(InMemoryTaskStore::new());
    let (started_tx, started_rx) = mpsc::channel::<String>();
    let (go_tx, go_rx) = mpsc::channel::<()>();
    let started_tx = Mutex::new(started_tx);
    let go_rx = Mutex::new(go_rx);
    let executor = FnExecutor::new(move |task: &TaskData| {
        started_tx
            .lock()
            .unwrap()
            .send(task.version().to_string())
            .unwrap();
        go_rx.lock().unwrap().recv().unwrap();
        Ok(())
    });

    let scheduler = scheduler(store.clone(), Arc::new(executor), 3);
    scheduler.initialize().unwrap();
    let consumer = scheduler.start_consumer().unwrap();

    let old = scheduler.add_task("xwiki", 1, "1.1", "links");
    assert_eq!(
        started_rx.recv_timeout(Duration::from_secs(5)).unwrap(),
        "1.1"
    );
    let new = scheduler.replace_task("xwiki", 1, "1.2", "links");
    assert!(old.is_cancelled());
    go_tx.send(()).unwrap();

    assert_eq!(
        started_rx.recv_timeout(Duration::from_secs(5)).unwrap(),
        "1.2"
    );
    go_tx.send(()).unwrap();
    assert_eq!(settle(&new).await, TaskStatus::Resolved);
    // a success after cancellation does not flip the old handle
    assert_eq!(old.status(), TaskStatus::Cancelled);

    scheduler.dispose();
    consumer.join().unwrap();
    assert_eq!(store.total_rows(), 0);
}

#[tokio::test]
async fn concurrent_producers_all_complete() {
    let store = Arc::new(InMemoryTaskStore::new());
    let (runs, executor) = recording();
    let scheduler = Arc::new(
        SchedulerBuilder::new()
            .config(config(3))
            .store(store.clone())
            .executor(executor)
            .partitions(Arc::new(StaticPartitions::new(["xwiki"])))
            .clock(Arc::new(SystemClock))
            .build()
            .unwrap(),
    );
    scheduler.initialize().unwrap();
    let consumer = scheduler.start_consumer().unwrap();

    let producers: Vec<_> = (0..4)
        .map(|p| {
            let scheduler = Arc::clone(&scheduler);
            thread::spawn(move || {
                (0..25)
                    .map(|i| scheduler.add_task("xwiki", p * 100 + i, "1.0", "links"))
                    .collect::<Vec<_>>()
            })
        })
        .collect();
    let handles: Vec<CompletionHandle> = producers
        .into_iter()
        .flat_map(|producer| producer.join().unwrap())
        .collect();

    for handle in &handles {
        assert_eq!(settle(handle).await, TaskStatus::Resolved);
    }
    scheduler.dispose();
    consumer.join().unwrap();

    assert_eq!(runs.lock().unwrap().len(), 100);
    assert_eq!(store.total_rows(), 0);
}

#[test]
fn restart_with_default_config_recovers_the_backlog() {
    let store = Arc::new(InMemoryTaskStore::new());
    let build = |store: Arc<InMemoryTaskStore>| {
        let (_, executor) = recording();
        SchedulerBuilder::new()
            .config(SchedulerConfig::default())
            .store(store)
            .executor(executor)
            .partitions(Arc::new(StaticPartitions::new(["xwiki"])))
            .build()
            .unwrap()
    };

    let first = build(store.clone());
    first.initialize().unwrap();
    first.add_task("xwiki", 1, "1.1", "links");
    first.add_task("xwiki", 2, "1.1", "links");
    first.dispose();
    assert_eq!(store.total_rows(), 2);

    let restarted = build(store);
    restarted.initialize().unwrap();
    assert_eq!(restarted.queue_size(), 2);
}

#[tokio::test]
async fn replace_persistence_failure_still_runs_the_replacement() {
    let store = Arc::new(InMemoryTaskStore::new());
    let (runs, executor) = recording();
    let scheduler = scheduler(store.clone(), executor, 3);
    scheduler.initialize().unwrap();

    let old = scheduler.add_task("xwiki", 1, "1.1", "links");
    store.set_fail_writes(true);
    let new = scheduler.replace_task("xwiki", 1, "1.2", "links");

    assert!(old.is_cancelled());
    assert_eq!(scheduler.queue_size(), 1);

    let consumer = scheduler.start_consumer().unwrap();
    assert_eq!(settle(&new).await, TaskStatus::Resolved);
    scheduler.dispose();
    consumer.join().unwrap();

    assert_eq!(*runs.lock().unwrap(), vec![(1, "1.2".to_string())]);
    // the store never saw the replacement, so the old row is still there
    let rows = store.rows(&PartitionId::new("xwiki"));
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].version, "1.1");
}

#[tokio::test]
async fn same_version_replace_while_executing_keeps_the_replacement_row() {
    let store = Arc::new(InMemoryTaskStore::new());
    let clock = Arc::new(FixedClock::at_millis(1_000));
    let (started_tx, started_rx) = mpsc::channel::<i64>();
    let (go_tx, go_rx) = mpsc::channel::<()>();
    let started_tx = Mutex::new(started_tx);
    let go_rx = Mutex::new(go_rx);
    let executor = FnExecutor::new(move |task: &TaskData| {
        started_tx
            .lock()
            .unwrap()
            .send(task.created_at().timestamp_millis())
            .unwrap();
        go_rx.lock().unwrap().recv().unwrap();
        Ok(())
    });

    let scheduler = SchedulerBuilder::new()
        .config(config(3))
        .store(store.clone())
        .executor(Arc::new(executor))
        .partitions(Arc::new(StaticPartitions::new(["xwiki"])))
        .clock(clock.clone())
        .build()
        .unwrap();
    scheduler.initialize().unwrap();
    let consumer = scheduler.start_consumer().unwrap();
    let xwiki = PartitionId::new("xwiki");

    let old = scheduler.add_task("xwiki", 1, "1.1", "links");
    assert_eq!(started_rx.recv_timeout(Duration::from_secs(5)).unwrap(), 1_000);

    clock.set_millis(2_000);
    let replacement = scheduler.replace_task("xwiki", 1, "1.1", "links");
    assert!(old.is_cancelled());
    go_tx.send(()).unwrap();

    // the replacement starts only after the old record's row delete ran
    assert_eq!(started_rx.recv_timeout(Duration::from_secs(5)).unwrap(), 2_000);
    let rows = store.rows(&xwiki);
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].timestamp.timestamp_millis(), 2_000);

    go_tx.send(()).unwrap();
    assert_eq!(settle(&replacement).await, TaskStatus::Resolved);
    scheduler.dispose();
    consumer.join().unwrap();
    assert!(store.rows(&xwiki).is_empty());
}
