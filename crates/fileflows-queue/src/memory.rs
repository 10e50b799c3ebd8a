use std::collections::BTreeSet;

use async_trait::async_trait;
use dashmap::DashMap;
use fileflows_core::{QueueError, QueueKey, WorkQueue};
use tracing::{debug, instrument};

/// In-memory work queue.
///
/// Each key maps to its own set; pops run under the set's shard lock.
#[derive(Debug, Default)]
pub struct MemoryQueue {
    sets: DashMap<String, BTreeSet<String>>,
}

impl MemoryQueue {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl WorkQueue for MemoryQueue {
    #[instrument(skip(self), level = "trace")]
    async fn add(&self, key: &QueueKey, item: &str) -> Result<bool, QueueError> {
        Ok(self
            .sets
            .entry(key.as_str().to_string())
            .or_default()
            .insert(item.to_string()))
    }

    async fn add_many(&self, key: &QueueKey, items: &[String]) -> Result<usize, QueueError> {
        let mut set = self.sets.entry(key.as_str().to_string()).or_default();
        let added = items
            .iter()
            .filter(|item| set.insert((*item).clone()))
            .count();
        debug!("Added {} of {} items to {}", added, items.len(), key);
        Ok(added)
    }

    async fn size(&self, key: &QueueKey) -> Result<usize, QueueError> {
        Ok(self.sets.get(key.as_str()).map(|s| s.len()).unwrap_or(0))
    }

    async fn pop_one(&self, key: &QueueKey) -> Result<Option<String>, QueueError> {
        Ok(self
            .sets
            .get_mut(key.as_str())
            .and_then(|mut set| set.pop_first()))
    }

    async fn remove(&self, key: &QueueKey, item: &str) -> Result<bool, QueueError> {
        Ok(self
            .sets
            .get_mut(key.as_str())
            .map(|mut set| set.remove(item))
            .unwrap_or(false))
    }

    async fn remove_many(&self, key: &QueueKey, items: &[String]) -> Result<usize, QueueError> {
        Ok(self
            .sets
            .get_mut(key.as_str())
            .map(|mut set| items.iter().filter(|item| set.remove(item.as_str())).count())
            .unwrap_or(0))
    }

    async fn members(&self, key: &QueueKey) -> Result<Vec<String>, QueueError> {
        Ok(self
            .sets
            .get(key.as_str())
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default())
    }
}
