//! Destination folder resolution.
//!
//! Walks a `FolderPath` from the root, descending into an existing folder for
//! each segment or creating it when missing. Nothing is cached between calls;
//! resolving the same path twice is idempotent because the second walk finds
//! the folders the first one created.

use fileflows_core::{FolderPath, RemoteFile, RemoteStorage, SyncError, ROOT_FOLDER_ID};
use tracing::{debug, error, info, instrument, warn};

/// What to do when several folders under one parent share a segment's title.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DuplicatePolicy {
    /// Take the first folder in listing order and log the duplicates.
    #[default]
    FirstMatch,
    /// Fail the resolution.
    Reject,
}

/// Resolve `path` to the identifier of its terminal folder, creating any
/// missing segments.
///
/// A listing failure the provider reports as "not found" is fatal. Any other
/// listing failure is logged and the segment is treated as absent, so the walk
/// continues by creating it.
#[instrument(skip(remote), fields(path = %path))]
pub async fn resolve_or_create(
    remote: &dyn RemoteStorage,
    path: &FolderPath,
    policy: DuplicatePolicy,
) -> Result<String, SyncError> {
    let mut current = ROOT_FOLDER_ID.to_string();

    for (depth, segment) in path.segments().iter().enumerate() {
        let children = match remote.list_children(&current).await {
            Ok(children) => children,
            Err(e) if e.is_not_found() => {
                error!(
                    parent = %current,
                    segment = %segment,
                    "Destination folder not found: {}",
                    e
                );
                return Err(SyncError::FolderNotFound {
                    segment: segment.clone(),
                    source: e,
                });
            }
            Err(e) => {
                error!(
                    parent = %current,
                    segment = %segment,
                    error = ?e,
                    "Listing folder failed, continuing as if '{}' were absent",
                    segment
                );
                Vec::new()
            }
        };

        current = match select_folder(&children, segment, policy)? {
            Some(existing) => {
                debug!(depth, segment = %segment, id = %existing.id, "Found folder");
                existing.id.clone()
            }
            None => {
                let id = remote.create_folder(segment, &current).await.map_err(|e| {
                    error!(parent = %current, segment = %segment, "Creating folder failed: {}", e);
                    SyncError::CreateFolder {
                        segment: segment.clone(),
                        source: e,
                    }
                })?;
                info!(depth, segment = %segment, id = %id, "Created folder");
                id
            }
        };
    }

    Ok(current)
}

/// Pick the child folder titled `segment`, honoring the duplicate policy.
fn select_folder<'a>(
    children: &'a [RemoteFile],
    segment: &str,
    policy: DuplicatePolicy,
) -> Result<Option<&'a RemoteFile>, SyncError> {
    let matches: Vec<&RemoteFile> = children
        .iter()
        .filter(|child| child.is_folder() && child.title == segment)
        .collect();

    match (matches.as_slice(), policy) {
        ([], _) => Ok(None),
        ([only], _) => Ok(Some(*only)),
        ([first, ..], DuplicatePolicy::FirstMatch) => {
            warn!(
                segment,
                count = matches.len(),
                chosen = %first.id,
                "Several folders share this title, using the first listed"
            );
            Ok(Some(*first))
        }
        (_, DuplicatePolicy::Reject) => Err(SyncError::AmbiguousFolder {
            segment: segment.to_string(),
            count: matches.len(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeDrive, ListFailure};

    fn path(s: &str) -> FolderPath {
        FolderPath::parse(s).unwrap()
    }

    #[tokio::test]
    async fn test_creates_missing_path() {
        let drive = FakeDrive::new();

        let id = resolve_or_create(&drive, &path("A/B"), DuplicatePolicy::default())
            .await
            .unwrap();

        assert_eq!(drive.created_folders(), 2);
        assert_eq!(drive.title_of(&id).as_deref(), Some("B"));
    }

    #[tokio::test]
    async fn test_second_resolution_reuses_folders() {
        let drive = FakeDrive::new();
        let folder = path("A/B");

        let first = resolve_or_create(&drive, &folder, DuplicatePolicy::default())
            .await
            .unwrap();
        let second = resolve_or_create(&drive, &folder, DuplicatePolicy::default())
            .await
            .unwrap();

        assert_eq!(first, second);
        assert_eq!(drive.created_folders(), 2);
    }

    #[tokio::test]
    async fn test_descends_into_existing_and_creates_rest() {
        let drive = FakeDrive::new();
        let reports = drive.add_folder("Reports", ROOT_FOLDER_ID);

        let id = resolve_or_create(&drive, &path("Reports/2024"), DuplicatePolicy::default())
            .await
            .unwrap();

        assert_eq!(drive.created_folders(), 1);
        let children = drive.list_children(&reports).await.unwrap();
        assert_eq!(children.len(), 1);
        assert_eq!(children[0].id, id);
    }

    #[tokio::test]
    async fn test_files_do_not_shadow_folders() {
        let drive = FakeDrive::new();
        drive.add_file("A", ROOT_FOLDER_ID);

        let id = resolve_or_create(&drive, &path("A"), DuplicatePolicy::default())
            .await
            .unwrap();

        assert_eq!(drive.created_folders(), 1);
        assert_eq!(drive.title_of(&id).as_deref(), Some("A"));
    }

    #[tokio::test]
    async fn test_duplicate_titles_first_match() {
        let drive = FakeDrive::new();
        let first = drive.add_folder("A", ROOT_FOLDER_ID);
        drive.add_folder("A", ROOT_FOLDER_ID);

        let id = resolve_or_create(&drive, &path("A"), DuplicatePolicy::FirstMatch)
            .await
            .unwrap();
        assert_eq!(id, first);
        assert_eq!(drive.created_folders(), 0);
    }

    #[tokio::test]
    async fn test_duplicate_titles_rejected() {
        let drive = FakeDrive::new();
        drive.add_folder("A", ROOT_FOLDER_ID);
        drive.add_folder("A", ROOT_FOLDER_ID);

        let result = resolve_or_create(&drive, &path("A"), DuplicatePolicy::Reject).await;
        assert!(matches!(
            result,
            Err(SyncError::AmbiguousFolder { ref segment, count: 2 }) if segment == "A"
        ));
    }

    #[tokio::test]
    async fn test_not_found_listing_is_fatal() {
        let drive = FakeDrive::new();
        let a = drive.add_folder("A", ROOT_FOLDER_ID);
        drive.fail_listing(&a, ListFailure::NotFound);

        let result = resolve_or_create(&drive, &path("A/B"), DuplicatePolicy::default()).await;

        match result {
            Err(SyncError::FolderNotFound { segment, .. }) => assert_eq!(segment, "B"),
            other => panic!("expected FolderNotFound, got {:?}", other),
        }
        assert_eq!(drive.created_folders(), 0);
    }

    #[tokio::test]
    async fn test_transient_listing_failure_continues() {
        let drive = FakeDrive::new();
        let a = drive.add_folder("A", ROOT_FOLDER_ID);
        drive.fail_listing(&a, ListFailure::Transient);

        let id = resolve_or_create(&drive, &path("A/B"), DuplicatePolicy::default())
            .await
            .unwrap();

        assert_eq!(drive.created_folders(), 1);
        assert_eq!(drive.title_of(&id).as_deref(), Some("B"));
    }
}
