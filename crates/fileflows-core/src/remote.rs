use std::path::Path;

use async_trait::async_trait;

use crate::error::RemoteError;

/// Identifier of the top of the remote folder tree.
pub const ROOT_FOLDER_ID: &str = "root";

/// MIME type the provider uses for folders.
pub const FOLDER_MIME_TYPE: &str = "application/vnd.google-apps.folder";

/// A file or folder in the remote service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteFile {
    /// Provider-specific identifier
    pub id: String,
    /// Display name
    pub title: String,
    /// Identifiers of the containing folders
    pub parent_ids: Vec<String>,
    /// MIME type (if reported)
    pub mime_type: Option<String>,
}

impl RemoteFile {
    pub fn is_folder(&self) -> bool {
        self.mime_type.as_deref() == Some(FOLDER_MIME_TYPE)
    }
}

/// Per-upload options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UploadOptions {
    /// Ask the provider to convert known formats into its native document types.
    pub convert: bool,
}

/// Remote storage client abstraction.
///
/// One instance is shared by every worker unit, so implementations must be
/// safe for concurrent use.
#[async_trait]
pub trait RemoteStorage: Send + Sync {
    /// List the non-trashed children of a folder.
    async fn list_children(&self, folder_id: &str) -> Result<Vec<RemoteFile>, RemoteError>;

    /// Create a folder and return its identifier.
    async fn create_folder(&self, title: &str, parent_id: &str) -> Result<String, RemoteError>;

    /// Upload a local file as a new remote file.
    async fn upload_file(
        &self,
        local_path: &Path,
        title: &str,
        parent_id: &str,
        options: UploadOptions,
    ) -> Result<RemoteFile, RemoteError>;

    /// Replace the content of an existing remote file, keeping its identifier.
    ///
    /// With `options.convert` the file is also switched to the provider's
    /// native type for its format.
    async fn update_content(
        &self,
        file_id: &str,
        local_path: &Path,
        options: UploadOptions,
    ) -> Result<RemoteFile, RemoteError>;

    /// Move a file to the trash.
    async fn trash(&self, file_id: &str) -> Result<(), RemoteError>;

    /// Rename a file.
    async fn update_title(&self, file_id: &str, new_title: &str) -> Result<(), RemoteError>;
}
