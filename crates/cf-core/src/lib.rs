//! Chronological file-name manifests committed to git.
//!
//! A [`pipeline::Snapshot`] lists the regular files of one directory, oldest
//! modification first, writes them to `files.txt`, commits that file through a
//! [`vcs::VersionControl`] collaborator, and removes the transient files again.

pub mod config;
pub mod manifest;
pub mod pipeline;
pub mod scan;
pub mod vcs;

#[cfg(feature = "libgit2")]
pub mod git2_ops;

pub use config::{SnapshotConfig, IGNORE_FILE_NAME, MANIFEST_FILE_NAME};
pub use pipeline::{ensure_repository, PipelineError, RunReport, Snapshot, Step};
pub use vcs::{default_vcs, CommitOutcome, VcsError, VersionControl};
