//! Directory listing, metadata fan-out, and the regular-file filter.
//!
//! Only the immediate entries of the working directory are considered.
//! Metadata lookups run concurrently and each one degrades to "unavailable"
//! on its own, so a single vanished file never aborts the batch.

use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use futures::future::join_all;
use thiserror::Error;
use tracing::debug;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ScanError {
    #[error("cannot read directory {path}: {source}")]
    ReadDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// The subset of filesystem metadata the manifest cares about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileStats {
    pub is_file: bool,
    pub modified: SystemTime,
}

impl FileStats {
    /// `None` when the platform cannot report a modification time.
    pub fn from_metadata(meta: &std::fs::Metadata) -> Option<Self> {
        let modified = meta.modified().ok()?;
        Some(Self {
            is_file: meta.is_file(),
            modified,
        })
    }
}

/// One directory entry and, if the lookup succeeded, its metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRecord {
    pub filename: String,
    pub stats: Option<FileStats>,
}

impl FileRecord {
    pub fn is_regular_file(&self) -> bool {
        self.stats.is_some_and(|s| s.is_file)
    }
}

// ---------------------------------------------------------------------------
// Listing
// ---------------------------------------------------------------------------

/// List the immediate entries of `workdir`, unfiltered, in OS order.
pub async fn list_entries(workdir: &Path) -> Result<Vec<OsString>, ScanError> {
    let read_dir_err = |source| ScanError::ReadDir {
        path: workdir.to_path_buf(),
        source,
    };

    let mut dir = tokio::fs::read_dir(workdir).await.map_err(read_dir_err)?;
    let mut names = Vec::new();
    while let Some(entry) = dir.next_entry().await.map_err(read_dir_err)? {
        names.push(entry.file_name());
    }
    Ok(names)
}

// ---------------------------------------------------------------------------
// Metadata
// ---------------------------------------------------------------------------

/// Stat one entry, following symlinks. Never fails.
pub async fn fetch_stats(workdir: &Path, name: &OsStr) -> FileRecord {
    let filename = name.to_string_lossy().into_owned();
    let stats = match tokio::fs::metadata(workdir.join(name)).await {
        Ok(meta) => FileStats::from_metadata(&meta),
        Err(e) => {
            debug!(file = %filename, error = %e, "metadata unavailable");
            None
        }
    };
    FileRecord { filename, stats }
}

/// Stat every entry concurrently and wait for all of them.
///
/// The result has one record per name, in the same order as `names`.
pub async fn fetch_all(workdir: &Path, names: &[OsString]) -> Vec<FileRecord> {
    join_all(names.iter().map(|name| fetch_stats(workdir, name))).await
}

// ---------------------------------------------------------------------------
// Filter & sort
// ---------------------------------------------------------------------------

/// Keep regular files only, in their original order.
pub fn filter_files(records: Vec<FileRecord>) -> Vec<FileRecord> {
    records
        .into_iter()
        .filter(FileRecord::is_regular_file)
        .collect()
}

/// Oldest modification first. Stable: equal timestamps keep their order.
pub fn sort_by_modified(mut files: Vec<FileRecord>) -> Vec<FileRecord> {
    files.sort_by_key(|r| r.stats.map(|s| s.modified));
    files
}

/// [`filter_files`] then [`sort_by_modified`].
pub fn select_files(records: Vec<FileRecord>) -> Vec<FileRecord> {
    sort_by_modified(filter_files(records))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
