use std::fmt;
use std::str::FromStr;

use crate::error::SyncError;

/// Ordered, non-empty, root-relative sequence of folder names.
///
/// Resolution walks the segments by index; the path itself is never consumed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FolderPath {
    segments: Vec<String>,
}

impl FolderPath {
    /// Build a path from explicit segments.
    ///
    /// Fails if there are no segments or any segment is blank.
    pub fn new<I, S>(segments: I) -> Result<Self, SyncError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let segments: Vec<String> = segments.into_iter().map(Into::into).collect();
        if segments.is_empty() {
            return Err(SyncError::InvalidFolderPath(
                "folder path needs at least one segment".to_string(),
            ));
        }
        if let Some(pos) = segments.iter().position(|s| s.trim().is_empty()) {
            return Err(SyncError::InvalidFolderPath(format!(
                "segment {} is empty",
                pos + 1
            )));
        }
        Ok(Self { segments })
    }

    /// Parse a `/`-separated path such as `Reports/2024/Q1`.
    ///
    /// Leading and trailing slashes are ignored; `A//B` is rejected.
    pub fn parse(path: &str) -> Result<Self, SyncError> {
        let trimmed = path.trim().trim_matches('/');
        if trimmed.is_empty() {
            return Err(SyncError::InvalidFolderPath(format!(
                "'{}' has no folder segments",
                path
            )));
        }
        Self::new(trimmed.split('/'))
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }
}

impl FromStr for FolderPath {
    type Err = SyncError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for FolderPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.segments.join("/"))
    }
}
