use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use tracing::info;

use crate::config::{ConfigError, SnapshotConfig};
use crate::manifest::{
    remove_transient, render_manifest, write_ignore_rule, write_manifest, StepOutcome,
};
use crate::scan::{fetch_all, filter_files, list_entries, sort_by_modified, ScanError};
use crate::vcs::{CommitOutcome, VcsError, VersionControl};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// The pipeline step a fatal error came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    Config,
    Repository,
    Scan,
    IgnoreFile,
    Stage,
    Commit,
}

/// A failure that ends the run before cleanup.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("invalid config: {0}")]
    Config(#[from] ConfigError),

    #[error("repository check failed: {0}")]
    Repository(#[source] VcsError),

    #[error(transparent)]
    Scan(#[from] ScanError),

    #[error("cannot write {path}: {source}")]
    IgnoreFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot stage {file}: {source}")]
    Stage {
        file: String,
        #[source]
        source: VcsError,
    },

    #[error("cannot commit {file}: {source}")]
    Commit {
        file: String,
        #[source]
        source: VcsError,
    },
}

impl PipelineError {
    pub fn step(&self) -> Step {
        match self {
            PipelineError::Config(_) => Step::Config,
            PipelineError::Repository(_) => Step::Repository,
            PipelineError::Scan(_) => Step::Scan,
            PipelineError::IgnoreFile { .. } => Step::IgnoreFile,
            PipelineError::Stage { .. } => Step::Stage,
            PipelineError::Commit { .. } => Step::Commit,
        }
    }
}

// ---------------------------------------------------------------------------
// Report
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CleanupReport {
    pub manifest: StepOutcome,
    pub ignore_file: StepOutcome,
}

/// What a run that reached cleanup did.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub workdir: PathBuf,
    /// `true` when this run had to create the repository.
    pub initialized_repository: bool,
    pub entries_listed: usize,
    /// Entries dropped because their metadata could not be read.
    pub metadata_unavailable: usize,
    /// Manifest names, oldest modification first.
    pub files: Vec<String>,
    pub manifest_write: StepOutcome,
    pub commit_message: String,
    /// `unchanged` when the manifest already matched `HEAD`.
    pub commit: CommitOutcome,
    pub cleanup: CleanupReport,
    pub finished_at: DateTime<Utc>,
}

impl RunReport {
    /// No best-effort step failed either.
    pub fn is_clean(&self) -> bool {
        self.manifest_write.is_completed()
            && self.cleanup.manifest.is_completed()
            && self.cleanup.ignore_file.is_completed()
    }
}

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

/// Initialize the repository at `workdir` unless one already covers it.
///
/// Returns `true` when `init` ran.
pub async fn ensure_repository(vcs: &dyn VersionControl, workdir: &Path) -> Result<bool, VcsError> {
    if vcs.is_repository(workdir).await? {
        return Ok(false);
    }
    info!(dir = %workdir.display(), "initializing git repository");
    vcs.init(workdir).await?;
    Ok(true)
}

/// One manifest snapshot of a directory.
pub struct Snapshot {
    config: SnapshotConfig,
    vcs: Arc<dyn VersionControl>,
}

impl Snapshot {
    pub fn new(config: SnapshotConfig, vcs: Arc<dyn VersionControl>) -> Self {
        Self { config, vcs }
    }

    pub fn config(&self) -> &SnapshotConfig {
        &self.config
    }

    /// Run every step in order.
    ///
    /// Manifest writing and cleanup failures are recorded in the report;
    /// any other failure stops the run and skips cleanup.
    pub async fn run(&self) -> Result<RunReport, PipelineError> {
        self.config.validate()?;

        let workdir = self.config.workdir.as_path();
        let manifest_name = self.config.manifest_name.as_str();
        let manifest_path = self.config.manifest_path();
        let ignore_path = self.config.ignore_path();

        let initialized_repository = ensure_repository(self.vcs.as_ref(), workdir)
            .await
            .map_err(PipelineError::Repository)?;

        info!("listing files");
        let names = list_entries(workdir).await?;

        info!(entries = names.len(), "getting stats");
        let records = fetch_all(workdir, &names).await;
        let metadata_unavailable = records.iter().filter(|r| r.stats.is_none()).count();

        info!("filtering files");
        let files = filter_files(records);
        info!("sorting files by modified date");
        let files: Vec<String> = sort_by_modified(files)
            .into_iter()
            .map(|r| r.filename)
            .collect();
        info!("found {} files in {}", files.len(), dir_label(workdir).await);

        let manifest_write = write_manifest(&manifest_path, &render_manifest(&files)).await;

        write_ignore_rule(&ignore_path, manifest_name)
            .await
            .map_err(|source| PipelineError::IgnoreFile {
                path: ignore_path.clone(),
                source,
            })?;

        let commit_message = self.config.commit_message();
        info!(file = manifest_name, commit = %commit_message, "committing manifest");
        self.vcs
            .stage(workdir, manifest_name)
            .await
            .map_err(|source| PipelineError::Stage {
                file: manifest_name.to_string(),
                source,
            })?;
        let commit = self
            .vcs
            .commit(workdir, manifest_name, &commit_message)
            .await
            .map_err(|source| PipelineError::Commit {
                file: manifest_name.to_string(),
                source,
            })?;
        if commit == CommitOutcome::Unchanged {
            info!(file = manifest_name, "manifest unchanged, nothing to commit");
        }

        info!("removing temp files");
        let cleanup = CleanupReport {
            manifest: remove_transient(&manifest_path).await,
            ignore_file: remove_transient(&ignore_path).await,
        };

        Ok(RunReport {
            workdir: workdir.to_path_buf(),
            initialized_repository,
            entries_listed: names.len(),
            metadata_unavailable,
            files,
            manifest_write,
            commit_message,
            commit,
            cleanup,
            finished_at: Utc::now(),
        })
    }
}

/// Last component of the resolved workdir, so `.` logs as the real name.
async fn dir_label(workdir: &Path) -> String {
    let resolved = tokio::fs::canonicalize(workdir)
        .await
        .unwrap_or_else(|_| workdir.to_path_buf());
    resolved
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| resolved.display().to_string())
}
