//! In-memory `RemoteStorage` used by the engine tests.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;

use async_trait::async_trait;
use fileflows_core::{
    RemoteError, RemoteFile, RemoteStorage, UploadOptions, FOLDER_MIME_TYPE,
};

/// MIME type the fake gives converted files.
pub const CONVERTED_MIME_TYPE: &str = "application/vnd.google-apps.spreadsheet";

/// How `list_children` should fail for a given folder.
#[derive(Debug, Clone, Copy)]
pub enum ListFailure {
    NotFound,
    Transient,
}

#[derive(Debug, Default)]
struct State {
    files: Vec<RemoteFile>,
    trashed: Vec<String>,
    next_id: u64,
    created_folders: usize,
    uploads: Vec<(String, String)>,
    updates: Vec<String>,
    list_failures: HashMap<String, ListFailure>,
    failing_uploads: Vec<String>,
}

#[derive(Debug, Default)]
pub struct FakeDrive {
    state: Mutex<State>,
}

impl FakeDrive {
    pub fn new() -> Self {
        Self::default()
    }

    fn next_id(state: &mut State) -> String {
        state.next_id += 1;
        format!("id-{}", state.next_id)
    }

    pub fn add_folder(&self, title: &str, parent: &str) -> String {
        self.add(title, parent, Some(FOLDER_MIME_TYPE))
    }

    pub fn add_file(&self, title: &str, parent: &str) -> String {
        self.add(title, parent, Some("text/plain"))
    }

    fn add(&self, title: &str, parent: &str, mime: Option<&str>) -> String {
        let mut state = self.state.lock().unwrap();
        let id = Self::next_id(&mut state);
        state.files.push(RemoteFile {
            id: id.clone(),
            title: title.to_string(),
            parent_ids: vec![parent.to_string()],
            mime_type: mime.map(str::to_string),
        });
        id
    }

    pub fn fail_listing(&self, folder_id: &str, failure: ListFailure) {
        self.state
            .lock()
            .unwrap()
            .list_failures
            .insert(folder_id.to_string(), failure);
    }

    pub fn fail_upload(&self, title: &str) {
        self.state
            .lock()
            .unwrap()
            .failing_uploads
            .push(title.to_string());
    }

    pub fn created_folders(&self) -> usize {
        self.state.lock().unwrap().created_folders
    }

    /// `(title, parent_id)` of every upload, in call order.
    pub fn uploads(&self) -> Vec<(String, String)> {
        self.state.lock().unwrap().uploads.clone()
    }

    pub fn updates(&self) -> Vec<String> {
        self.state.lock().unwrap().updates.clone()
    }

    pub fn trashed(&self) -> Vec<String> {
        self.state.lock().unwrap().trashed.clone()
    }

    pub fn mime_of(&self, id: &str) -> Option<String> {
        self.state
            .lock()
            .unwrap()
            .files
            .iter()
            .find(|f| f.id == id)
            .and_then(|f| f.mime_type.clone())
    }

    pub fn title_of(&self, id: &str) -> Option<String> {
        self.state
            .lock()
            .unwrap()
            .files
            .iter()
            .find(|f| f.id == id)
            .map(|f| f.title.clone())
    }
}

#[async_trait]
impl RemoteStorage for FakeDrive {
    async fn list_children(&self, folder_id: &str) -> Result<Vec<RemoteFile>, RemoteError> {
        let state = self.state.lock().unwrap();
        match state.list_failures.get(folder_id) {
            Some(ListFailure::NotFound) => {
                return Err(RemoteError::Api {
                    status: 404,
                    body: format!("File not found: {}", folder_id),
                })
            }
            Some(ListFailure::Transient) => {
                return Err(RemoteError::Api {
                    status: 503,
                    body: "backend error".to_string(),
                })
            }
            None => {}
        }
        Ok(state
            .files
            .iter()
            .filter(|f| f.parent_ids.iter().any(|p| p == folder_id))
            .filter(|f| !state.trashed.contains(&f.id))
            .cloned()
            .collect())
    }

    async fn create_folder(&self, title: &str, parent_id: &str) -> Result<String, RemoteError> {
        let id = self.add_folder(title, parent_id);
        self.state.lock().unwrap().created_folders += 1;
        Ok(id)
    }

    async fn upload_file(
        &self,
        _local_path: &Path,
        title: &str,
        parent_id: &str,
        options: UploadOptions,
    ) -> Result<RemoteFile, RemoteError> {
        if self.state.lock().unwrap().failing_uploads.iter().any(|t| t == title) {
            return Err(RemoteError::Api {
                status: 500,
                body: "upload failed".to_string(),
            });
        }
        let mime = if options.convert {
            CONVERTED_MIME_TYPE
        } else {
            "text/plain"
        };
        let id = self.add(title, parent_id, Some(mime));
        self.state
            .lock()
            .unwrap()
            .uploads
            .push((title.to_string(), parent_id.to_string()));
        Ok(RemoteFile {
            id,
            title: title.to_string(),
            parent_ids: vec![parent_id.to_string()],
            mime_type: Some(mime.to_string()),
        })
    }

    async fn update_content(
        &self,
        file_id: &str,
        _local_path: &Path,
        options: UploadOptions,
    ) -> Result<RemoteFile, RemoteError> {
        let mut state = self.state.lock().unwrap();
        let file = state
            .files
            .iter_mut()
            .find(|f| f.id == file_id)
            .ok_or_else(|| RemoteError::NotFound(file_id.to_string()))?;
        if options.convert {
            file.mime_type = Some(CONVERTED_MIME_TYPE.to_string());
        }
        let file = file.clone();
        state.updates.push(file_id.to_string());
        Ok(file)
    }

    async fn trash(&self, file_id: &str) -> Result<(), RemoteError> {
        self.state.lock().unwrap().trashed.push(file_id.to_string());
        Ok(())
    }

    async fn update_title(&self, file_id: &str, new_title: &str) -> Result<(), RemoteError> {
        let mut state = self.state.lock().unwrap();
        let file = state
            .files
            .iter_mut()
            .find(|f| f.id == file_id)
            .ok_or_else(|| RemoteError::NotFound(file_id.to_string()))?;
        file.title = new_title.to_string();
        Ok(())
    }
}
