//! InMemoryMonitorRegistry - 登録されたビューを HashMap で保持

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::ports::{MonitorRegistry, QueueStatsSource};

#[derive(Default)]
pub struct InMemoryMonitorRegistry {
    sources: Mutex<HashMap<String, Arc<dyn QueueStatsSource>>>,
}

impl InMemoryMonitorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Arc<dyn QueueStatsSource>>> {
        self.sources.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn QueueStatsSource>> {
        self.lock().get(name).cloned()
    }

    pub fn is_registered(&self, name: &str) -> bool {
        self.lock().contains_key(name)
    }
}

impl MonitorRegistry for InMemoryMonitorRegistry {
    fn register(&self, name: &str, source: Arc<dyn QueueStatsSource>) {
        self.lock().insert(name.to_string(), source);
    }

    fn unregister(&self, name: &str) {
        self.lock().remove(name);
    }
}
