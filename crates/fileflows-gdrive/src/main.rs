use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use fileflows_core::{QueueKey, RemoteStorage, WorkQueue};
use fileflows_engine::{
    populate, DeleteRequest, DuplicatePolicy, Filters, SyncContext, SyncReport, UploadRequest,
};
use fileflows_gdrive::config::{AuthArgs, Command, Config, SourceArgs};
use fileflows_gdrive::GDriveClient;
use fileflows_queue::FileQueue;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::parse();

    if let Err(e) = run(config).await {
        error!("{:#}", e);
        std::process::exit(1);
    }
    Ok(())
}

async fn run(config: Config) -> anyhow::Result<()> {
    let queue_dir = config.queue_dir()?;
    let queue: Arc<dyn WorkQueue> = Arc::new(
        FileQueue::open(&queue_dir)
            .with_context(|| format!("cannot open work queue at {}", queue_dir.display()))?,
    );
    let key = QueueKey::new(config.queue_key.clone());
    info!("Work queue '{}' at {}", key, queue_dir.display());

    match config.command {
        Command::Status => {
            let size = queue.size(&key).await?;
            println!("{}: {} queued", key, size);
        }

        Command::Enqueue { source, items } => {
            let added = enqueue(queue.as_ref(), &key, &source, &items).await?;
            let size = queue.size(&key).await?;
            println!("{}: added {}, {} queued", key, added, size);
        }

        Command::Upload {
            destination,
            source,
            overwrite,
            convert,
        } => {
            enqueue(queue.as_ref(), &key, &source, &[]).await?;
            let ctx = SyncContext {
                remote: connect(&config.auth)?,
                queue,
                key,
            };
            let request = UploadRequest {
                folder: destination.folder.clone(),
                overwrite,
                convert,
                workers: destination.workers.into(),
                policy: destination.policy(),
            };
            let report = fileflows_engine::upload(&ctx, &request).await?;
            finish("upload", &report)?;
        }

        Command::Delete {
            destination,
            source,
            titles,
        } => {
            enqueue(queue.as_ref(), &key, &source, &titles).await?;
            let ctx = SyncContext {
                remote: connect(&config.auth)?,
                queue,
                key,
            };
            let request = DeleteRequest {
                folder: destination.folder.clone(),
                workers: destination.workers.into(),
                policy: destination.policy(),
            };
            let report = fileflows_engine::delete(&ctx, &request).await?;
            finish("delete", &report)?;
        }

        Command::Rename {
            folder,
            from,
            to,
            strict_folders,
        } => {
            let remote = connect(&config.auth)?;
            let policy = if strict_folders {
                DuplicatePolicy::Reject
            } else {
                DuplicatePolicy::FirstMatch
            };
            let file = fileflows_engine::rename(remote.as_ref(), &folder, &from, &to, policy).await?;
            println!("renamed {} in {}: '{}' -> '{}'", file.id, folder, from, file.title);
        }
    }

    Ok(())
}

/// Add enumerated sources and raw items to the queue; returns the number added.
async fn enqueue(
    queue: &dyn WorkQueue,
    key: &QueueKey,
    source: &SourceArgs,
    items: &[String],
) -> anyhow::Result<usize> {
    let mut added = 0;

    if !source.sources.is_empty() {
        let filters = Filters::new(source.glob.as_deref(), source.regex.as_deref())?;
        let report = populate(queue, key, &source.sources, &filters).await?;
        info!(
            candidates = report.candidates,
            added = report.added,
            glob_matches = ?report.glob_matches,
            regex_matches = ?report.regex_matches,
            "Enumeration finished"
        );
        added += report.added;
    } else if source.glob.is_some() || source.regex.is_some() {
        warn!("--glob/--regex given without --source, nothing enumerated");
    }

    if !items.is_empty() {
        added += queue.add_many(key, items).await?;
    }

    Ok(added)
}

fn connect(auth: &AuthArgs) -> anyhow::Result<Arc<dyn RemoteStorage>> {
    let tokens = Arc::new(auth.token_manager()?);
    Ok(Arc::new(GDriveClient::new(tokens)))
}

/// Log the run summary and fail if any worker unit stopped early.
fn finish(flow: &str, report: &SyncReport) -> anyhow::Result<()> {
    let pool = &report.pool;
    info!(
        folder_id = %report.folder_id,
        pruned = report.pruned,
        processed = pool.processed,
        succeeded = pool.succeeded,
        skipped = pool.skipped,
        failed = pool.failed,
        "{} finished",
        flow
    );
    if pool.failed > 0 {
        warn!("{} items failed and were dropped from the queue", pool.failed);
    }
    if !pool.completed() {
        anyhow::bail!(
            "{} stopped early: {} units hit a queue error, {} panicked",
            flow,
            pool.queue_errors,
            pool.panicked
        );
    }
    Ok(())
}
