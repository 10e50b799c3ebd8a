//! Path enumeration: fills a work queue from local source directories.
//!
//! Without filters every direct child file of each source directory is queued.
//! A glob and a regex filter may be given together; each contributes its own
//! matches and the queue receives the union.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use fileflows_core::{QueueError, QueueKey, SyncError, WorkQueue};
use glob::{MatchOptions, Pattern};
use regex::Regex;
use tracing::{debug, info, instrument, warn};

/// Compiled enumeration filters.
#[derive(Debug, Clone, Default)]
pub struct Filters {
    glob: Option<String>,
    regex: Option<Regex>,
}

impl Filters {
    /// Validate and compile the optional patterns.
    pub fn new(glob: Option<&str>, regex: Option<&str>) -> Result<Self, SyncError> {
        if let Some(pattern) = glob {
            Pattern::new(pattern).map_err(|e| SyncError::InvalidPattern {
                kind: "glob",
                pattern: pattern.to_string(),
                message: e.to_string(),
            })?;
        }

        let regex = regex
            .map(|pattern| {
                Regex::new(pattern).map_err(|e| SyncError::InvalidPattern {
                    kind: "regex",
                    pattern: pattern.to_string(),
                    message: e.to_string(),
                })
            })
            .transpose()?;

        Ok(Self {
            glob: glob.map(str::to_string),
            regex,
        })
    }

    fn is_empty(&self) -> bool {
        self.glob.is_none() && self.regex.is_none()
    }
}

/// Outcome of one enumeration pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnumerationReport {
    /// Distinct paths found across all sources and filters
    pub candidates: usize,
    /// Paths that were not already queued
    pub added: usize,
    /// Matches contributed by the glob filter, if one was given
    pub glob_matches: Option<usize>,
    /// Matches contributed by the regex filter, if one was given
    pub regex_matches: Option<usize>,
}

/// Enumerate `sources` and add the selected files to the queue under `key`.
#[instrument(skip(queue, sources, filters), fields(sources = sources.len()))]
pub async fn populate(
    queue: &dyn WorkQueue,
    key: &QueueKey,
    sources: &[PathBuf],
    filters: &Filters,
) -> Result<EnumerationReport, SyncError> {
    let sources = sources.to_vec();
    let scan_filters = filters.clone();
    let scan = tokio::task::spawn_blocking(move || scan_sources(&sources, &scan_filters))
        .await
        .map_err(|e| QueueError::Backend(format!("enumeration task failed: {}", e)))?;

    if let Some(pattern) = &filters.glob {
        if scan.glob_matches == 0 {
            warn!("Glob '{}' matched no files", pattern);
        }
    }
    if let Some(regex) = &filters.regex {
        if scan.regex_matches == 0 {
            warn!("Regex '{}' matched no files", regex.as_str());
        }
    }

    let items: Vec<String> = scan
        .paths
        .iter()
        .filter_map(|p| match p.to_str() {
            Some(item) => Some(item.to_string()),
            None => {
                warn!("Skipping {}: path is not valid UTF-8", p.display());
                None
            }
        })
        .collect();
    let added = queue.add_many(key, &items).await?;

    info!(
        "Queued {} new items in '{}' ({} candidates)",
        added,
        key,
        items.len()
    );

    Ok(EnumerationReport {
        candidates: items.len(),
        added,
        glob_matches: filters.glob.as_ref().map(|_| scan.glob_matches),
        regex_matches: filters.regex.as_ref().map(|_| scan.regex_matches),
    })
}

#[derive(Debug, Default)]
struct Scan {
    paths: BTreeSet<PathBuf>,
    glob_matches: usize,
    regex_matches: usize,
}

fn scan_sources(sources: &[PathBuf], filters: &Filters) -> Scan {
    let mut scan = Scan::default();

    for source in sources {
        let dir = match std::path::absolute(source) {
            Ok(dir) => dir,
            Err(e) => {
                warn!("Skipping source {}: {}", source.display(), e);
                continue;
            }
        };

        if filters.is_empty() {
            scan.paths.extend(direct_children(&dir));
            continue;
        }

        if let Some(pattern) = &filters.glob {
            let matches = glob_children(&dir, pattern);
            scan.glob_matches += matches.len();
            scan.paths.extend(matches);
        }

        if let Some(regex) = &filters.regex {
            let matches: Vec<PathBuf> = direct_children(&dir)
                .into_iter()
                .filter(|p| regex.is_match(&p.to_string_lossy()))
                .collect();
            scan.regex_matches += matches.len();
            scan.paths.extend(matches);
        }
    }

    scan
}

/// Regular files directly inside `dir`.
fn direct_children(dir: &Path) -> Vec<PathBuf> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            warn!("Cannot read source directory {}: {}", dir.display(), e);
            return Vec::new();
        }
    };

    entries
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry.path()),
            Err(e) => {
                warn!("Cannot read entry in {}: {}", dir.display(), e);
                None
            }
        })
        .filter(|path| {
            let is_file = path.is_file();
            if !is_file {
                debug!("Skipping non-file {}", path.display());
            }
            is_file
        })
        .collect()
}

/// Files matching `<dir>/<pattern>`.
fn glob_children(dir: &Path, pattern: &str) -> Vec<PathBuf> {
    let full = Path::new(&Pattern::escape(&dir.to_string_lossy())).join(pattern);
    let options = MatchOptions {
        require_literal_leading_dot: true,
        ..MatchOptions::new()
    };

    match glob::glob_with(&full.to_string_lossy(), options) {
        Ok(paths) => paths
            .filter_map(|entry| match entry {
                Ok(path) => Some(path),
                Err(e) => {
                    warn!("Glob error in {}: {}", dir.display(), e);
                    None
                }
            })
            .filter(|path| path.is_file())
            .collect(),
        Err(e) => {
            warn!("Invalid glob for {}: {}", dir.display(), e);
            Vec::new()
        }
    }
}
