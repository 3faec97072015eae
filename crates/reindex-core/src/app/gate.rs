//! ProducerGate - producer と recovery の順序付け

use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Orders producers against the recovery snapshot.
///
/// - Producer side (shared): held across one producer's store write and
///   queue write. Producers never exclude each other.
/// - Recovery side (exclusive): held only while recovery snapshots the queue,
///   so the snapshot never sees a task that is in the store but not yet queued.
#[derive(Debug, Default)]
pub(crate) struct ProducerGate {
    lock: RwLock<()>,
}

impl ProducerGate {
    pub(crate) fn producer(&self) -> RwLockReadGuard<'_, ()> {
        self.lock.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn recovery(&self) -> RwLockWriteGuard<'_, ()> {
        self.lock.write().unwrap_or_else(PoisonError::into_inner)
    }
}
