//! Google Drive API v3 client.
//!
//! Implements [`RemoteStorage`] on top of the `files` resource. Tokens come
//! from a shared [`TokenManager`] on every call.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use fileflows_core::{RemoteError, RemoteFile, RemoteStorage, UploadOptions, FOLDER_MIME_TYPE};
use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, instrument};

use crate::mime;
use crate::token_manager::TokenManager;

const DEFAULT_API_BASE: &str = "https://www.googleapis.com";
const FILE_FIELDS: &str = "id,name,mimeType,parents";
const LIST_FIELDS: &str = "nextPageToken,files(id,name,mimeType,parents)";
const PAGE_SIZE: &str = "1000";

/// File resource as returned by the Drive API.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DriveFile {
    id: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    mime_type: Option<String>,
    #[serde(default)]
    parents: Vec<String>,
}

impl From<DriveFile> for RemoteFile {
    fn from(f: DriveFile) -> Self {
        RemoteFile {
            id: f.id,
            title: f.name,
            parent_ids: f.parents,
            mime_type: f.mime_type,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FileList {
    #[serde(default)]
    files: Vec<DriveFile>,
    #[serde(default)]
    next_page_token: Option<String>,
}

/// Google Drive API client.
pub struct GDriveClient {
    http: Client,
    api_base: String,
    tokens: Arc<TokenManager>,
}

impl GDriveClient {
    pub fn new(tokens: Arc<TokenManager>) -> Self {
        Self::with_base_url(DEFAULT_API_BASE, tokens)
    }

    /// Client talking to an alternative API host.
    pub fn with_base_url(api_base: impl Into<String>, tokens: Arc<TokenManager>) -> Self {
        Self {
            http: Client::new(),
            api_base: api_base.into().trim_end_matches('/').to_string(),
            tokens,
        }
    }

    fn files_url(&self) -> String {
        format!("{}/drive/v3/files", self.api_base)
    }

    fn file_url(&self, file_id: &str) -> String {
        format!("{}/drive/v3/files/{}", self.api_base, file_id)
    }

    fn upload_url(&self) -> String {
        format!("{}/upload/drive/v3/files", self.api_base)
    }

    async fn read_local(path: &Path) -> Result<Vec<u8>, RemoteError> {
        tokio::fs::read(path)
            .await
            .map_err(|e| RemoteError::LocalIo {
                path: path.display().to_string(),
                message: e.to_string(),
            })
    }
}

fn request_error(e: reqwest::Error) -> RemoteError {
    RemoteError::Request(e.to_string())
}

/// Map a non-success response to a [`RemoteError`].
async fn check(resp: Response, what: &str) -> Result<Response, RemoteError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    Err(match status {
        StatusCode::NOT_FOUND => RemoteError::NotFound(format!("{}: {}", what, body)),
        StatusCode::UNAUTHORIZED => RemoteError::Auth(body),
        _ => RemoteError::Api {
            status: status.as_u16(),
            body,
        },
    })
}

/// Escape a value for use inside a single-quoted Drive query literal.
fn quote_query(value: &str) -> String {
    value.replace('\\', "\\\\").replace('\'', "\\'")
}

/// Build a `multipart/related` body: JSON metadata part then the media part.
fn multipart_related(boundary: &str, metadata: &serde_json::Value, media_type: &str, data: &[u8]) -> Vec<u8> {
    let mut body = Vec::with_capacity(data.len() + 512);
    body.extend_from_slice(format!("--{}\r\n", boundary).as_bytes());
    body.extend_from_slice(b"Content-Type: application/json; charset=UTF-8\r\n\r\n");
    body.extend_from_slice(metadata.to_string().as_bytes());
    body.extend_from_slice(format!("\r\n--{}\r\n", boundary).as_bytes());
    body.extend_from_slice(format!("Content-Type: {}\r\n\r\n", media_type).as_bytes());
    body.extend_from_slice(data);
    body.extend_from_slice(format!("\r\n--{}--\r\n", boundary).as_bytes());
    body
}

#[async_trait]
impl RemoteStorage for GDriveClient {
    #[instrument(skip(self), level = "debug")]
    async fn list_children(&self, folder_id: &str) -> Result<Vec<RemoteFile>, RemoteError> {
        let token = self.tokens.get_valid_token().await?;
        let query = format!("'{}' in parents and trashed = false", quote_query(folder_id));

        let mut children = Vec::new();
        let mut page_token: Option<String> = None;
        loop {
            let mut req = self.http.get(self.files_url()).bearer_auth(&token).query(&[
                ("q", query.as_str()),
                ("fields", LIST_FIELDS),
                ("pageSize", PAGE_SIZE),
            ]);
            if let Some(page) = &page_token {
                req = req.query(&[("pageToken", page.as_str())]);
            }

            let resp = req.send().await.map_err(request_error)?;
            let page: FileList = check(resp, folder_id)
                .await?
                .json()
                .await
                .map_err(request_error)?;
            children.extend(page.files.into_iter().map(RemoteFile::from));

            match page.next_page_token {
                Some(next) if !next.is_empty() => page_token = Some(next),
                _ => break,
            }
        }

        debug!("Listed {} children of {}", children.len(), folder_id);
        Ok(children)
    }

    #[instrument(skip(self), level = "debug")]
    async fn create_folder(&self, title: &str, parent_id: &str) -> Result<String, RemoteError> {
        let token = self.tokens.get_valid_token().await?;
        let resp = self
            .http
            .post(self.files_url())
            .bearer_auth(&token)
            .query(&[("fields", FILE_FIELDS)])
            .json(&json!({
                "name": title,
                "mimeType": FOLDER_MIME_TYPE,
                "parents": [parent_id],
            }))
            .send()
            .await
            .map_err(request_error)?;

        let created: DriveFile = check(resp, parent_id)
            .await?
            .json()
            .await
            .map_err(request_error)?;
        debug!("Created folder '{}' as {}", title, created.id);
        Ok(created.id)
    }

    #[instrument(skip(self), level = "debug")]
    async fn upload_file(
        &self,
        local_path: &Path,
        title: &str,
        parent_id: &str,
        options: UploadOptions,
    ) -> Result<RemoteFile, RemoteError> {
        let data = Self::read_local(local_path).await?;
        let token = self.tokens.get_valid_token().await?;

        let mut metadata = json!({
            "name": title,
            "parents": [parent_id],
        });
        if options.convert {
            if let Some(native) = mime::native_type(local_path) {
                metadata["mimeType"] = json!(native);
            }
        }

        let boundary = format!("fileflows-{}", uuid::Uuid::new_v4().simple());
        let body = multipart_related(&boundary, &metadata, mime::media_type(local_path), &data);

        let resp = self
            .http
            .post(self.upload_url())
            .bearer_auth(&token)
            .query(&[("uploadType", "multipart"), ("fields", FILE_FIELDS)])
            .header(
                "Content-Type",
                format!("multipart/related; boundary={}", boundary),
            )
            .body(body)
            .send()
            .await
            .map_err(request_error)?;

        let uploaded: DriveFile = check(resp, parent_id)
            .await?
            .json()
            .await
            .map_err(request_error)?;
        debug!("Uploaded {} ({} bytes) as {}", title, data.len(), uploaded.id);
        Ok(uploaded.into())
    }

    #[instrument(skip(self), level = "debug")]
    async fn update_content(
        &self,
        file_id: &str,
        local_path: &Path,
        options: UploadOptions,
    ) -> Result<RemoteFile, RemoteError> {
        let data = Self::read_local(local_path).await?;
        let token = self.tokens.get_valid_token().await?;
        let url = format!("{}/{}", self.upload_url(), file_id);
        let len = data.len();
        let media_type = mime::media_type(local_path);

        let native = if options.convert {
            mime::native_type(local_path)
        } else {
            None
        };
        let req = match native {
            // Content and target type in one multipart update.
            Some(native) => {
                let boundary = format!("fileflows-{}", uuid::Uuid::new_v4().simple());
                let metadata = json!({ "mimeType": native });
                self.http
                    .patch(&url)
                    .query(&[("uploadType", "multipart"), ("fields", FILE_FIELDS)])
                    .header(
                        "Content-Type",
                        format!("multipart/related; boundary={}", boundary),
                    )
                    .body(multipart_related(&boundary, &metadata, media_type, &data))
            }
            None => self
                .http
                .patch(&url)
                .query(&[("uploadType", "media"), ("fields", FILE_FIELDS)])
                .header("Content-Type", media_type)
                .body(data),
        };

        let resp = req
            .bearer_auth(&token)
            .send()
            .await
            .map_err(request_error)?;

        let updated: DriveFile = check(resp, file_id)
            .await?
            .json()
            .await
            .map_err(request_error)?;
        debug!("Updated file {} ({} bytes)", file_id, len);
        Ok(updated.into())
    }

    #[instrument(skip(self), level = "debug")]
    async fn trash(&self, file_id: &str) -> Result<(), RemoteError> {
        let token = self.tokens.get_valid_token().await?;
        let resp = self
            .http
            .patch(self.file_url(file_id))
            .bearer_auth(&token)
            .query(&[("fields", "id")])
            .json(&json!({ "trashed": true }))
            .send()
            .await
            .map_err(request_error)?;

        check(resp, file_id).await?;
        debug!("Trashed file {}", file_id);
        Ok(())
    }

    #[instrument(skip(self), level = "debug")]
    async fn update_title(&self, file_id: &str, new_title: &str) -> Result<(), RemoteError> {
        let token = self.tokens.get_valid_token().await?;
        let resp = self
            .http
            .patch(self.file_url(file_id))
            .bearer_auth(&token)
            .query(&[("fields", "id")])
            .json(&json!({ "name": new_title }))
            .send()
            .await
            .map_err(request_error)?;

        check(resp, file_id).await?;
        debug!("Renamed file {} to '{}'", file_id, new_title);
        Ok(())
    }
}
