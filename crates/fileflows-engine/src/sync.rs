//! Upload, delete and rename flows.
//!
//! Each flow resolves the destination folder once, snapshots its children,
//! and hands the read-only folder id and index to every worker unit along
//! with an explicit handle to the remote client.

use std::path::PathBuf;
use std::sync::Arc;

use fileflows_core::{
    FolderPath, QueueKey, RemoteError, RemoteFile, RemoteStorage, SyncError, UploadOptions, WorkQueue,
};
use tracing::{debug, info, instrument};

use crate::pool::{drain_queue, run_pool, ItemOutcome, PoolReport};
use crate::reconcile::{prune_existing, title_of, TitleIndex};
use crate::resolve::{resolve_or_create, DuplicatePolicy};

/// Shared handles for a sync run.
#[derive(Clone)]
pub struct SyncContext {
    pub remote: Arc<dyn RemoteStorage>,
    pub queue: Arc<dyn WorkQueue>,
    pub key: QueueKey,
}

/// Parameters of an upload run.
#[derive(Debug, Clone)]
pub struct UploadRequest {
    pub folder: FolderPath,
    /// Replace the content of same-titled remote files instead of skipping them.
    pub overwrite: bool,
    /// Ask the provider to convert known formats to native documents.
    pub convert: bool,
    pub workers: usize,
    pub policy: DuplicatePolicy,
}

/// Parameters of a delete run.
#[derive(Debug, Clone)]
pub struct DeleteRequest {
    pub folder: FolderPath,
    pub workers: usize,
    pub policy: DuplicatePolicy,
}

/// Summary of a sync run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub folder_id: String,
    /// Queue items dropped because the destination already had them
    pub pruned: usize,
    pub pool: PoolReport,
}

/// Upload every queued local path into `request.folder`.
#[instrument(skip(ctx), fields(folder = %request.folder, key = %ctx.key))]
pub async fn upload(ctx: &SyncContext, request: &UploadRequest) -> Result<SyncReport, SyncError> {
    let folder_id = resolve_or_create(ctx.remote.as_ref(), &request.folder, request.policy).await?;
    let existing = TitleIndex::build(ctx.remote.list_children(&folder_id).await?);

    let pruned = if request.overwrite {
        0
    } else {
        prune_existing(ctx.queue.as_ref(), &ctx.key, &existing).await?
    };

    let queued = ctx.queue.size(&ctx.key).await?;
    info!(
        "Uploading {} queued files to {} ({}) with {} workers",
        queued, request.folder, folder_id, request.workers
    );

    let existing = Arc::new(existing);
    let options = UploadOptions {
        convert: request.convert,
    };
    let overwrite = request.overwrite;

    let pool = run_pool(request.workers, |unit| {
        let remote = ctx.remote.clone();
        let folder_id = folder_id.clone();
        let existing = existing.clone();
        drain_queue(unit, ctx.queue.clone(), ctx.key.clone(), move |item| {
            let remote = remote.clone();
            let folder_id = folder_id.clone();
            let existing = existing.clone();
            async move {
                let replace = if overwrite {
                    existing.lookup(&item).map(|f| f.id.clone())
                } else {
                    None
                };
                let path = PathBuf::from(&item);
                match replace {
                    Some(file_id) => {
                        remote.update_content(&file_id, &path, options).await?;
                        debug!(unit, file_id = %file_id, "Replaced {}", item);
                    }
                    None => {
                        let uploaded = remote
                            .upload_file(&path, title_of(&item), &folder_id, options)
                            .await?;
                        debug!(unit, file_id = %uploaded.id, "Uploaded {}", item);
                    }
                }
                Ok::<_, RemoteError>(ItemOutcome::Done)
            }
        })
    })
    .await;

    Ok(SyncReport {
        folder_id,
        pruned,
        pool,
    })
}

/// Trash every remote file in `request.folder` named by a queued item.
///
/// Items with no matching remote file are skipped.
#[instrument(skip(ctx), fields(folder = %request.folder, key = %ctx.key))]
pub async fn delete(ctx: &SyncContext, request: &DeleteRequest) -> Result<SyncReport, SyncError> {
    let folder_id = resolve_or_create(ctx.remote.as_ref(), &request.folder, request.policy).await?;
    let index = Arc::new(TitleIndex::build(
        ctx.remote.list_children(&folder_id).await?,
    ));

    info!(
        "Deleting queued titles from {} ({}), {} files present, {} workers",
        request.folder,
        folder_id,
        index.len(),
        request.workers
    );

    let pool = run_pool(request.workers, |unit| {
        let remote = ctx.remote.clone();
        let index = index.clone();
        drain_queue(unit, ctx.queue.clone(), ctx.key.clone(), move |item| {
            let remote = remote.clone();
            let target = index.lookup(&item).cloned();
            async move {
                let Some(file) = target else {
                    debug!(unit, "Nothing to delete for {}", item);
                    return Ok(ItemOutcome::Skipped);
                };
                remote.trash(&file.id).await?;
                debug!(unit, file_id = %file.id, "Trashed {}", file.title);
                Ok::<_, RemoteError>(ItemOutcome::Done)
            }
        })
    })
    .await;

    Ok(SyncReport {
        folder_id,
        pruned: 0,
        pool,
    })
}

/// Rename the file titled `from` in `folder` to `to`.
#[instrument(skip(remote), fields(folder = %folder))]
pub async fn rename(
    remote: &dyn RemoteStorage,
    folder: &FolderPath,
    from: &str,
    to: &str,
    policy: DuplicatePolicy,
) -> Result<RemoteFile, SyncError> {
    let folder_id = resolve_or_create(remote, folder, policy).await?;
    let index = TitleIndex::build(remote.list_children(&folder_id).await?);
    let mut file = index
        .lookup(from)
        .cloned()
        .ok_or_else(|| SyncError::TitleNotFound {
            title: from.to_string(),
        })?;

    remote.update_title(&file.id, to).await?;
    info!(file_id = %file.id, "Renamed '{}' to '{}'", from, to);
    file.title = to.to_string();
    Ok(file)
}

#[cfg(test)]
mod tests {
    use fileflows_core::ROOT_FOLDER_ID;
    use fileflows_queue::MemoryQueue;

    use super::*;
    use crate::testing::{FakeDrive, CONVERTED_MIME_TYPE};

    fn context(drive: Arc<FakeDrive>) -> SyncContext {
        SyncContext {
            remote: drive,
            queue: Arc::new(MemoryQueue::new()),
            key: QueueKey::default(),
        }
    }

    fn upload_request(overwrite: bool) -> UploadRequest {
        UploadRequest {
            folder: FolderPath::parse("Reports/2024").unwrap(),
            overwrite,
            convert: false,
            workers: 4,
            policy: DuplicatePolicy::default(),
        }
    }

    async fn enqueue(ctx: &SyncContext, items: &[&str]) {
        for item in items {
            ctx.queue.add(&ctx.key, item).await.unwrap();
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_upload_skips_existing_files() {
        let drive = Arc::new(FakeDrive::new());
        let ctx = context(drive.clone());
        let folder_id = resolve_or_create(
            drive.as_ref(),
            &FolderPath::parse("Reports/2024").unwrap(),
            DuplicatePolicy::default(),
        )
        .await
        .unwrap();
        drive.add_file("x.txt", &folder_id);
        enqueue(&ctx, &["/data/x.txt", "/data/y.txt", "/data/z.txt"]).await;

        let report = upload(&ctx, &upload_request(false)).await.unwrap();

        assert_eq!(report.folder_id, folder_id);
        assert_eq!(report.pruned, 1);
        assert_eq!(report.pool.succeeded, 2);
        let mut titles: Vec<String> = drive.uploads().into_iter().map(|(t, _)| t).collect();
        titles.sort();
        assert_eq!(titles, ["y.txt", "z.txt"]);
        assert!(drive.uploads().iter().all(|(_, parent)| parent == &folder_id));
        assert_eq!(ctx.queue.size(&ctx.key).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_repeated_upload_is_idempotent() {
        let drive = Arc::new(FakeDrive::new());
        let ctx = context(drive.clone());

        enqueue(&ctx, &["/data/a.txt"]).await;
        upload(&ctx, &upload_request(false)).await.unwrap();
        enqueue(&ctx, &["/data/a.txt"]).await;
        let second = upload(&ctx, &upload_request(false)).await.unwrap();

        assert_eq!(second.pruned, 1);
        assert_eq!(second.pool.processed, 0);
        assert_eq!(drive.uploads().len(), 1);
        assert_eq!(drive.created_folders(), 2);
    }

    #[tokio::test]
    async fn test_overwrite_replaces_in_place() {
        let drive = Arc::new(FakeDrive::new());
        let ctx = context(drive.clone());
        let folder_id = resolve_or_create(
            drive.as_ref(),
            &FolderPath::parse("Reports/2024").unwrap(),
            DuplicatePolicy::default(),
        )
        .await
        .unwrap();
        let existing = drive.add_file("x.txt", &folder_id);
        enqueue(&ctx, &["/data/x.txt", "/data/y.txt"]).await;

        let report = upload(&ctx, &upload_request(true)).await.unwrap();

        assert_eq!(report.pruned, 0);
        assert_eq!(report.pool.succeeded, 2);
        assert_eq!(drive.updates(), vec![existing]);
        assert_eq!(drive.uploads(), vec![("y.txt".to_string(), folder_id)]);
    }

    #[tokio::test]
    async fn test_overwrite_with_convert_converts_in_place() {
        let drive = Arc::new(FakeDrive::new());
        let ctx = context(drive.clone());
        let folder_id = resolve_or_create(
            drive.as_ref(),
            &FolderPath::parse("Reports/2024").unwrap(),
            DuplicatePolicy::default(),
        )
        .await
        .unwrap();
        let existing = drive.add_file("sales.csv", &folder_id);
        enqueue(&ctx, &["/data/sales.csv"]).await;

        let request = UploadRequest {
            convert: true,
            ..upload_request(true)
        };
        let report = upload(&ctx, &request).await.unwrap();

        assert_eq!(report.pool.succeeded, 1);
        assert_eq!(drive.updates(), vec![existing.clone()]);
        assert_eq!(drive.mime_of(&existing).as_deref(), Some(CONVERTED_MIME_TYPE));
        assert!(drive.uploads().is_empty());
    }

    #[tokio::test]
    async fn test_failed_upload_is_counted_and_dropped() {
        let drive = Arc::new(FakeDrive::new());
        drive.fail_upload("bad.txt");
        let ctx = context(drive.clone());
        enqueue(&ctx, &["/data/bad.txt", "/data/good.txt"]).await;

        let report = upload(&ctx, &upload_request(false)).await.unwrap();

        assert_eq!(report.pool.failed, 1);
        assert_eq!(report.pool.succeeded, 1);
        assert_eq!(ctx.queue.size(&ctx.key).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_delete_trashes_matches_and_skips_absent() {
        let drive = Arc::new(FakeDrive::new());
        let ctx = context(drive.clone());
        let folder = drive.add_folder("Archive", ROOT_FOLDER_ID);
        let old = drive.add_file("old.csv", &folder);
        drive.add_file("keep.csv", &folder);
        enqueue(&ctx, &["old.csv", "already-gone.csv"]).await;

        let report = delete(
            &ctx,
            &DeleteRequest {
                folder: FolderPath::parse("Archive").unwrap(),
                workers: 2,
                policy: DuplicatePolicy::default(),
            },
        )
        .await
        .unwrap();

        assert_eq!(report.folder_id, folder);
        assert_eq!(report.pool.succeeded, 1);
        assert_eq!(report.pool.skipped, 1);
        assert_eq!(report.pool.failed, 0);
        assert_eq!(drive.trashed(), vec![old]);
    }

    #[tokio::test]
    async fn test_delete_title_with_slash_matches_exactly() {
        let drive = Arc::new(FakeDrive::new());
        let ctx = context(drive.clone());
        let folder = drive.add_folder("Archive", ROOT_FOLDER_ID);
        let nested = drive.add_file("Q1/summary.txt", &folder);
        drive.add_file("summary.txt", &folder);
        enqueue(&ctx, &["Q1/summary.txt"]).await;

        let report = delete(
            &ctx,
            &DeleteRequest {
                folder: FolderPath::parse("Archive").unwrap(),
                workers: 1,
                policy: DuplicatePolicy::default(),
            },
        )
        .await
        .unwrap();

        assert_eq!(report.pool.succeeded, 1);
        assert_eq!(drive.trashed(), vec![nested]);
    }

    #[tokio::test]
    async fn test_rename_title_with_slash_matches_exactly() {
        let drive = FakeDrive::new();
        let folder = drive.add_folder("Archive", ROOT_FOLDER_ID);
        let nested = drive.add_file("Q1/summary.txt", &folder);
        let plain = drive.add_file("summary.txt", &folder);
        let path = FolderPath::parse("Archive").unwrap();

        let renamed = rename(&drive, &path, "Q1/summary.txt", "Q1/final.txt", DuplicatePolicy::default())
            .await
            .unwrap();

        assert_eq!(renamed.id, nested);
        assert_eq!(drive.title_of(&nested).as_deref(), Some("Q1/final.txt"));
        assert_eq!(drive.title_of(&plain).as_deref(), Some("summary.txt"));
    }

    #[tokio::test]
    async fn test_rename() {
        let drive = FakeDrive::new();
        let folder = drive.add_folder("Archive", ROOT_FOLDER_ID);
        let id = drive.add_file("draft.txt", &folder);
        let path = FolderPath::parse("Archive").unwrap();

        let renamed = rename(&drive, &path, "draft.txt", "final.txt", DuplicatePolicy::default())
            .await
            .unwrap();

        assert_eq!(renamed.id, id);
        assert_eq!(drive.title_of(&id).as_deref(), Some("final.txt"));

        let missing =
            rename(&drive, &path, "draft.txt", "other.txt", DuplicatePolicy::default()).await;
        assert!(matches!(missing, Err(SyncError::TitleNotFound { .. })));
    }
}
