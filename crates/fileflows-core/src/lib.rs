//! Core traits and types for fileflows.
//!
//! This crate defines the abstractions shared between the sync engine and its backends:
//! - `WorkQueue`: Durable, deduplicated set of work items with atomic pop
//! - `RemoteStorage`: Folder/file operations against the remote storage provider
//! - `FolderPath`: Root-relative destination folder path
//! - Error types shared by every crate in the workspace

mod error;
mod path;
mod queue;
mod remote;

pub use error::{QueueError, RemoteError, SyncError};
pub use path::FolderPath;
pub use queue::{QueueKey, WorkQueue, DEFAULT_QUEUE_KEY};
pub use remote::{RemoteFile, RemoteStorage, UploadOptions, FOLDER_MIME_TYPE, ROOT_FOLDER_ID};
