use thiserror::Error;

/// Errors raised by a remote storage client.
#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("api returned {status}: {body}")]
    Api { status: u16, body: String },

    #[error("request failed: {0}")]
    Request(String),

    #[error("authentication failed: {0}")]
    Auth(String),

    #[error("failed to read {path}: {message}")]
    LocalIo { path: String, message: String },
}

impl RemoteError {
    /// Whether the provider reported the target as missing.
    ///
    /// Structured variants are checked first. The message substring check is a
    /// fallback for providers that only report a human-readable message.
    pub fn is_not_found(&self) -> bool {
        match self {
            RemoteError::NotFound(_) => true,
            RemoteError::Api { status: 404, .. } => true,
            RemoteError::LocalIo { .. } => false,
            other => other.to_string().to_ascii_lowercase().contains("not found"),
        }
    }
}

/// Errors raised by a work queue backend.
#[derive(Debug, Error)]
pub enum QueueError {
    #[error("queue I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("queue file {path} is corrupt: {message}")]
    Corrupt { path: String, message: String },

    #[error("queue backend error: {0}")]
    Backend(String),
}

/// Errors that abort a sync run.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("destination folder '{segment}' not found: {source}")]
    FolderNotFound {
        segment: String,
        #[source]
        source: RemoteError,
    },

    #[error("destination folder '{segment}' is ambiguous: {count} folders share that title")]
    AmbiguousFolder { segment: String, count: usize },

    #[error("failed to create folder '{segment}': {source}")]
    CreateFolder {
        segment: String,
        #[source]
        source: RemoteError,
    },

    #[error("invalid folder path: {0}")]
    InvalidFolderPath(String),

    #[error("invalid {kind} pattern '{pattern}': {message}")]
    InvalidPattern {
        kind: &'static str,
        pattern: String,
        message: String,
    },

    #[error("'{title}' not found in destination folder")]
    TitleNotFound { title: String },

    #[error("work queue unavailable: {0}")]
    Queue(#[from] QueueError),

    #[error(transparent)]
    Remote(#[from] RemoteError),
}
