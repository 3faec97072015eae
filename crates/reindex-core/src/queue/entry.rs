//! Heap entries for the priority queue.

use std::cmp::Ordering;

use chrono::{DateTime, Utc};

use crate::domain::TaskData;

/// What the consumer gets back from [`super::PriorityQueue::take`].
#[derive(Debug)]
pub enum QueueEntry {
    /// Stop sentinel: the consumer must halt.
    Stop,
    Task(TaskData),
}

/// Entry stored in the heap.
///
/// Ordering: the stop sentinel first, then tasks by `(timestamp, seq)`.
/// `seq` is assigned on insertion, so equal timestamps keep insertion order.
/// We use reverse ordering so BinaryHeap acts as a min-heap.
#[derive(Debug)]
pub(crate) struct Slot {
    pub(crate) seq: u64,
    pub(crate) entry: QueueEntry,
}

impl Slot {
    fn sort_key(&self) -> (u8, Option<DateTime<Utc>>, u64) {
        match &self.entry {
            QueueEntry::Stop => (0, None, self.seq),
            QueueEntry::Task(task) => (1, Some(task.timestamp()), self.seq),
        }
    }

    pub(crate) fn task(&self) -> Option<&TaskData> {
        match &self.entry {
            QueueEntry::Task(task) => Some(task),
            QueueEntry::Stop => None,
        }
    }
}

impl PartialEq for Slot {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Slot {}

impl PartialOrd for Slot {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Slot {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse ordering: earlier keys have higher priority
        other.sort_key().cmp(&self.sort_key())
    }
}
