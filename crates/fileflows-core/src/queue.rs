use std::fmt;

use async_trait::async_trait;

use crate::error::QueueError;

/// Key used when the caller does not name a queue.
pub const DEFAULT_QUEUE_KEY: &str = "fileflows";

/// Name of one logical queue inside a backing store.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QueueKey(String);

impl QueueKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for QueueKey {
    fn default() -> Self {
        Self(DEFAULT_QUEUE_KEY.to_string())
    }
}

impl From<&str> for QueueKey {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for QueueKey {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl fmt::Display for QueueKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Shared, deduplicated set of work items.
///
/// Items have set semantics: adding an item already present is a no-op.
/// `pop_one` removes and returns an arbitrary item as a single indivisible
/// operation, so no two consumers (in this or another process) ever receive
/// the same item. There is no ordering guarantee.
#[async_trait]
pub trait WorkQueue: Send + Sync {
    /// Insert an item. Returns `true` if it was not already queued.
    async fn add(&self, key: &QueueKey, item: &str) -> Result<bool, QueueError>;

    /// Insert a batch of items. Returns the number of new items.
    async fn add_many(&self, key: &QueueKey, items: &[String]) -> Result<usize, QueueError> {
        let mut added = 0;
        for item in items {
            if self.add(key, item).await? {
                added += 1;
            }
        }
        Ok(added)
    }

    /// Current number of queued items.
    async fn size(&self, key: &QueueKey) -> Result<usize, QueueError>;

    /// Atomically remove and return one item, or `None` once the queue is empty.
    async fn pop_one(&self, key: &QueueKey) -> Result<Option<String>, QueueError>;

    /// Remove a specific item. Returns `true` if it was queued.
    async fn remove(&self, key: &QueueKey, item: &str) -> Result<bool, QueueError>;

    /// Remove a batch of items. Returns the number that were queued.
    async fn remove_many(&self, key: &QueueKey, items: &[String]) -> Result<usize, QueueError> {
        let mut removed = 0;
        for item in items {
            if self.remove(key, item).await? {
                removed += 1;
            }
        }
        Ok(removed)
    }

    /// Snapshot of the queued items.
    async fn members(&self, key: &QueueKey) -> Result<Vec<String>, QueueError>;
}
