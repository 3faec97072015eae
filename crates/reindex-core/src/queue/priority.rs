//! Blocking priority queue ordered by task timestamp.

use std::collections::{BTreeMap, BinaryHeap, HashSet};
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};

use super::entry::{QueueEntry, Slot};
use crate::domain::{CompletionHandle, TaskData, TaskKey, TaskType};

/// Record the consumer took and has not released yet.
struct Claim {
    key: TaskKey,
    completion: CompletionHandle,
}

struct QueueState {
    heap: BinaryHeap<Slot>,

    /// Next insertion sequence number (tie-breaker for equal timestamps).
    next_seq: u64,

    claimed: Option<Claim>,
}

impl QueueState {
    fn push(&mut self, entry: QueueEntry) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.heap.push(Slot { seq, entry });
    }

    fn tasks(&self) -> impl Iterator<Item = &TaskData> {
        self.heap.iter().filter_map(Slot::task)
    }
}

/// Unbounded, thread-safe, blocking queue of task records.
///
/// # Implementation
/// - `BinaryHeap` under a `Mutex`; `Condvar` wakes the consumer on `put`.
/// - Many producers, exactly one consumer calling [`PriorityQueue::take`].
/// - The record most recently returned by `take` stays "claimed" until the
///   consumer calls [`PriorityQueue::release_claim`], so that a concurrent
///   [`PriorityQueue::replace`] can still cancel it.
///
/// Size and snapshot accessors never count the stop sentinel.
pub struct PriorityQueue {
    state: Mutex<QueueState>,
    available: Condvar,
}

impl PriorityQueue {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(QueueState {
                heap: BinaryHeap::new(),
                next_seq: 0,
                claimed: None,
            }),
            available: Condvar::new(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, QueueState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn push(&self, entry: QueueEntry) {
        self.lock().push(entry);
        self.available.notify_one();
    }

    /// Enqueue a task. Never blocks beyond the internal lock.
    pub fn put(&self, task: TaskData) {
        self.push(QueueEntry::Task(task));
    }

    /// Enqueue the stop sentinel. It sorts ahead of every task.
    pub fn put_stop(&self) {
        self.push(QueueEntry::Stop);
    }

    /// Take the entry with the smallest timestamp, blocking while empty.
    pub fn take(&self) -> QueueEntry {
        let mut state = self.lock();
        loop {
            if let Some(slot) = state.heap.pop() {
                state.claimed = slot.task().map(|task| Claim {
                    key: task.key(),
                    completion: task.completion().clone(),
                });
                return slot.entry;
            }
            state = self
                .available
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// The consumer is done with the record returned by the last `take`.
    pub fn release_claim(&self) {
        self.lock().claimed = None;
    }

    /// Remove every task matching `predicate`. Returns how many were removed.
    pub fn remove_if<F>(&self, mut predicate: F) -> usize
    where
        F: FnMut(&TaskData) -> bool,
    {
        let mut state = self.lock();
        let before = state.heap.len();
        state.heap.retain(|slot| match slot.task() {
            Some(task) => !predicate(task),
            None => true,
        });
        before - state.heap.len()
    }

    /// Supersede every record with the same key as `task`, then enqueue it.
    ///
    /// Cancel, remove and insert happen under one lock acquisition: once this
    /// returns, no superseded record can be taken as live. A record already
    /// claimed by the consumer is cancelled too, so the consumer skips it as
    /// deprecated unless it already started executing.
    ///
    /// Returns the number of superseded records.
    pub fn replace(&self, task: TaskData) -> usize {
        let key = task.key();
        let superseded = {
            let mut state = self.lock();
            let mut superseded = 0;

            for queued in state.tasks().filter(|queued| queued.is_same_task(&key)) {
                queued.completion().cancel();
                superseded += 1;
            }
            state
                .heap
                .retain(|slot| !slot.task().is_some_and(|queued| queued.is_same_task(&key)));

            if let Some(claim) = state.claimed.as_ref().filter(|claim| claim.key == key)
                && claim.completion.cancel()
            {
                superseded += 1;
            }

            state.push(QueueEntry::Task(task));
            superseded
        };
        self.available.notify_one();
        superseded
    }

    /// Point-in-time copy of the queued tasks (in no particular order).
    pub fn snapshot(&self) -> Vec<TaskData> {
        self.lock().tasks().cloned().collect()
    }

    /// Point-in-time set of the queued task keys.
    pub fn keys(&self) -> HashSet<TaskKey> {
        self.lock().tasks().map(TaskData::key).collect()
    }

    pub fn len(&self) -> usize {
        self.lock().tasks().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn len_of_type(&self, task_type: &TaskType) -> usize {
        self.lock()
            .tasks()
            .filter(|task| task.task_type() == task_type)
            .count()
    }

    pub fn counts_by_type(&self) -> BTreeMap<TaskType, usize> {
        let state = self.lock();
        let mut counts = BTreeMap::new();
        for task in state.tasks() {
            *counts.entry(task.task_type().clone()).or_insert(0) += 1;
        }
        counts
    }
}

impl Default for PriorityQueue {
    fn default() -> Self {
        Self::new()
    }
}
