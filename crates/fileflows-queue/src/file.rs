use std::collections::BTreeSet;
use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use fileflows_core::{QueueError, QueueKey, WorkQueue};
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, instrument};

/// On-disk representation of one queue.
#[derive(Debug, Default, Serialize, Deserialize)]
struct QueueFile {
    key: String,
    items: BTreeSet<String>,
}

/// Data and lock file locations for one key.
#[derive(Debug, Clone)]
struct QueuePaths {
    data: PathBuf,
    lock: PathBuf,
    temp: PathBuf,
}

/// File-backed work queue.
///
/// Layout of the queue directory:
/// ```text
/// {dir}/
///   {sha256(key)}.json   # {"key": ..., "items": [...]}
///   {sha256(key)}.lock   # advisory lock, held for the duration of each operation
/// ```
/// Every operation opens the lock file, takes an exclusive (or, for reads,
/// shared) lock, reads the set, applies the change, and replaces the data
/// file via temp file + rename before releasing the lock. Independent
/// processes opening the same directory therefore see a single consistent
/// set, and `pop_one` is indivisible across all of them.
#[derive(Debug, Clone)]
pub struct FileQueue {
    dir: PathBuf,
}

impl FileQueue {
    /// Open (creating if needed) a queue directory.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, QueueError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        debug!("Opened file queue at {}", dir.display());
        Ok(Self { dir })
    }

    /// Default queue directory: `<data-local-dir>/fileflows/queues`.
    pub fn default_dir() -> Option<PathBuf> {
        dirs::data_local_dir().map(|d| d.join("fileflows").join("queues"))
    }

    fn paths(&self, key: &QueueKey) -> QueuePaths {
        let stem = hex::encode(Sha256::digest(key.as_str().as_bytes()));
        QueuePaths {
            data: self.dir.join(format!("{}.json", stem)),
            lock: self.dir.join(format!("{}.lock", stem)),
            temp: self.dir.join(format!("{}.json.tmp", stem)),
        }
    }

    /// Run `op` against the key's set under an exclusive lock, persisting the
    /// set afterwards if its size changed.
    async fn update<T, F>(&self, key: &QueueKey, op: F) -> Result<T, QueueError>
    where
        T: Send + 'static,
        F: FnOnce(&mut BTreeSet<String>) -> T + Send + 'static,
    {
        let paths = self.paths(key);
        let key = key.as_str().to_string();
        tokio::task::spawn_blocking(move || {
            let lock = open_lock(&paths.lock)?;
            FileExt::lock_exclusive(&lock)?;

            let mut state = read_state(&paths.data, &key)?;
            let before = state.items.len();
            let result = op(&mut state.items);
            if state.items.len() != before {
                write_state(&paths, &state)?;
            }

            FileExt::unlock(&lock)?;
            Ok(result)
        })
        .await
        .map_err(|e| QueueError::Backend(format!("queue task failed: {}", e)))?
    }

    /// Run `op` against the key's set under a shared lock.
    async fn read<T, F>(&self, key: &QueueKey, op: F) -> Result<T, QueueError>
    where
        T: Send + 'static,
        F: FnOnce(&BTreeSet<String>) -> T + Send + 'static,
    {
        let paths = self.paths(key);
        let key = key.as_str().to_string();
        tokio::task::spawn_blocking(move || {
            let lock = open_lock(&paths.lock)?;
            FileExt::lock_shared(&lock)?;
            let state = read_state(&paths.data, &key)?;
            FileExt::unlock(&lock)?;
            Ok(op(&state.items))
        })
        .await
        .map_err(|e| QueueError::Backend(format!("queue task failed: {}", e)))?
    }
}

fn open_lock(path: &Path) -> Result<File, QueueError> {
    Ok(OpenOptions::new()
        .create(true)
        .truncate(false)
        .read(true)
        .write(true)
        .open(path)?)
}

fn read_state(path: &Path, key: &str) -> Result<QueueFile, QueueError> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Ok(QueueFile {
                key: key.to_string(),
                items: BTreeSet::new(),
            });
        }
        Err(e) => return Err(e.into()),
    };

    let state: QueueFile = serde_json::from_slice(&bytes).map_err(|e| QueueError::Corrupt {
        path: path.display().to_string(),
        message: e.to_string(),
    })?;

    if state.key != key {
        return Err(QueueError::Corrupt {
            path: path.display().to_string(),
            message: format!("file belongs to queue '{}', expected '{}'", state.key, key),
        });
    }
    Ok(state)
}

fn write_state(paths: &QueuePaths, state: &QueueFile) -> Result<(), QueueError> {
    let bytes = serde_json::to_vec(state).map_err(|e| QueueError::Corrupt {
        path: paths.data.display().to_string(),
        message: e.to_string(),
    })?;
    fs::write(&paths.temp, bytes)?;
    fs::rename(&paths.temp, &paths.data)?;
    Ok(())
}

#[async_trait]
impl WorkQueue for FileQueue {
    #[instrument(skip(self), level = "trace")]
    async fn add(&self, key: &QueueKey, item: &str) -> Result<bool, QueueError> {
        let item = item.to_string();
        self.update(key, move |items| items.insert(item)).await
    }

    #[instrument(skip(self, items), level = "debug", fields(count = items.len()))]
    async fn add_many(&self, key: &QueueKey, items: &[String]) -> Result<usize, QueueError> {
        let items = items.to_vec();
        self.update(key, move |set| {
            items
                .into_iter()
                .filter(|item| set.insert(item.clone()))
                .count()
        })
        .await
    }

    async fn size(&self, key: &QueueKey) -> Result<usize, QueueError> {
        self.read(key, |items| items.len()).await
    }

    #[instrument(skip(self), level = "trace")]
    async fn pop_one(&self, key: &QueueKey) -> Result<Option<String>, QueueError> {
        self.update(key, |items| items.pop_first()).await
    }

    async fn remove(&self, key: &QueueKey, item: &str) -> Result<bool, QueueError> {
        let item = item.to_string();
        self.update(key, move |items| items.remove(&item)).await
    }

    #[instrument(skip(self, items), level = "debug", fields(count = items.len()))]
    async fn remove_many(&self, key: &QueueKey, items: &[String]) -> Result<usize, QueueError> {
        let items = items.to_vec();
        self.update(key, move |set| {
            items.iter().filter(|item| set.remove(item.as_str())).count()
        })
        .await
    }

    async fn members(&self, key: &QueueKey) -> Result<Vec<String>, QueueError> {
        self.read(key, |items| items.iter().cloned().collect())
            .await
    }
}
