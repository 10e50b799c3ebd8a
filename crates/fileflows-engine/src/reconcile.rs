//! Reconciliation of queued intent against the destination folder's contents.

use std::collections::HashMap;
use std::path::Path;

use fileflows_core::{QueueError, QueueKey, RemoteFile, WorkQueue};
use tracing::{debug, info, instrument};

/// Remote title a queue item refers to: the file name of a local path, or the
/// item itself when it has no path structure.
pub fn title_of(item: &str) -> &str {
    Path::new(item)
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or(item)
}

/// Destination folder files indexed by title.
///
/// Folders are excluded. When several files share a title the first one in
/// listing order is kept.
#[derive(Debug, Clone, Default)]
pub struct TitleIndex {
    by_title: HashMap<String, RemoteFile>,
}

impl TitleIndex {
    pub fn build(children: Vec<RemoteFile>) -> Self {
        let mut by_title = HashMap::new();
        for child in children.into_iter().filter(|c| !c.is_folder()) {
            if by_title.contains_key(&child.title) {
                debug!(title = %child.title, id = %child.id, "Ignoring duplicate title");
                continue;
            }
            by_title.insert(child.title.clone(), child);
        }
        Self { by_title }
    }

    pub fn contains(&self, title: &str) -> bool {
        self.by_title.contains_key(title)
    }

    /// Remote file a queue item refers to, if present.
    ///
    /// An exact title match wins; otherwise the item's file name is tried, so
    /// titles containing `/` are never shortened to an unrelated file.
    pub fn lookup(&self, item: &str) -> Option<&RemoteFile> {
        self.by_title
            .get(item)
            .or_else(|| self.by_title.get(title_of(item)))
    }

    pub fn len(&self) -> usize {
        self.by_title.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_title.is_empty()
    }
}

/// Drop every queued item whose file name already exists in the destination.
///
/// Returns the number of items removed.
#[instrument(skip(queue, existing), fields(existing = existing.len()))]
pub async fn prune_existing(
    queue: &dyn WorkQueue,
    key: &QueueKey,
    existing: &TitleIndex,
) -> Result<usize, QueueError> {
    let present: Vec<String> = queue
        .members(key)
        .await?
        .into_iter()
        .filter(|item| existing.contains(title_of(item)))
        .collect();
    debug!("Already present remotely: {:?}", present);

    let removed = if present.is_empty() {
        0
    } else {
        queue.remove_many(key, &present).await?
    };
    info!("Pruned {} items already present in the destination", removed);
    Ok(removed)
}
