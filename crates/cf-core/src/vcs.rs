use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;
use tracing::debug;

/// Errors raised by a [`VersionControl`] implementation.
#[derive(Debug, Error)]
pub enum VcsError {
    /// git reported a failure (non-zero exit, or a libgit2 error).
    ///
    /// Carries git's own message, e.g. a missing `user.name` when no
    /// identity is configured.
    #[error("git command failed: {0}")]
    Command(String),

    /// Spawning git or touching the filesystem failed.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// A blocking libgit2 call panicked or was cancelled.
    #[error("git task failed: {0}")]
    Task(String),
}

/// What a commit call did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CommitOutcome {
    /// A new commit was created.
    Committed,
    /// The file already matches `HEAD`; no commit was made.
    Unchanged,
}

/// The four repository operations a snapshot needs.
///
/// Every call takes the working directory explicitly; implementations must
/// not depend on the process's current directory.
#[async_trait]
pub trait VersionControl: Send + Sync {
    /// Whether `workdir` is inside a git work tree.
    async fn is_repository(&self, workdir: &Path) -> Result<bool, VcsError>;

    /// Create an empty repository rooted at `workdir`.
    async fn init(&self, workdir: &Path) -> Result<(), VcsError>;

    /// Stage `file` (relative to `workdir`).
    async fn stage(&self, workdir: &Path, file: &str) -> Result<(), VcsError>;

    /// Commit only `file` with `message`, leaving other staged paths alone.
    ///
    /// A file whose staged content already matches `HEAD` is not an error;
    /// it yields [`CommitOutcome::Unchanged`].
    async fn commit(
        &self,
        workdir: &Path,
        file: &str,
        message: &str,
    ) -> Result<CommitOutcome, VcsError>;
}

// ---------------------------------------------------------------------------
// Shell adapter
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct GitOutput {
    pub success: bool,
    /// Exit code, `None` when git was killed by a signal.
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl GitOutput {
    /// git's explanation of a failure: stderr, or stdout when stderr is empty.
    pub fn reason(&self) -> &str {
        if self.stderr.trim().is_empty() {
            self.stdout.trim()
        } else {
            self.stderr.trim()
        }
    }
}

/// Drives the `git` binary found on `PATH`.
#[derive(Debug, Default, Clone, Copy)]
pub struct ShellGit;

impl ShellGit {
    async fn output(workdir: &Path, args: &[&str]) -> Result<GitOutput, VcsError> {
        debug!(dir = %workdir.display(), ?args, "git");
        let output = tokio::process::Command::new("git")
            .current_dir(workdir)
            .args(args)
            // Keep messages in English so "not a git repository" can be matched.
            .env("LC_ALL", "C")
            .output()
            .await?;

        Ok(GitOutput {
            success: output.status.success(),
            code: output.status.code(),
            // `git init` echoes the repository path, which need not be UTF-8.
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        })
    }

    async fn run_git(workdir: &Path, args: &[&str]) -> Result<String, VcsError> {
        let out = Self::output(workdir, args).await?;
        if !out.success {
            return Err(VcsError::Command(out.reason().to_string()));
        }
        Ok(out.stdout.trim().to_string())
    }
}

#[async_trait]
impl VersionControl for ShellGit {
    async fn is_repository(&self, workdir: &Path) -> Result<bool, VcsError> {
        let out = Self::output(workdir, &["rev-parse", "--is-inside-work-tree"]).await?;
        if out.success {
            return Ok(out.stdout.trim() == "true");
        }
        if out.stderr.contains("not a git repository") {
            return Ok(false);
        }
        Err(VcsError::Command(out.stderr.trim().to_string()))
    }

    async fn init(&self, workdir: &Path) -> Result<(), VcsError> {
        Self::run_git(workdir, &["init"]).await.map(|_| ())
    }

    async fn stage(&self, workdir: &Path, file: &str) -> Result<(), VcsError> {
        Self::run_git(workdir, &["add", "--", file]).await.map(|_| ())
    }

    async fn commit(
        &self,
        workdir: &Path,
        file: &str,
        message: &str,
    ) -> Result<CommitOutcome, VcsError> {
        // Exit 0: index matches HEAD for this path. Exit 1: it differs.
        let diff = Self::output(workdir, &["diff", "--cached", "--quiet", "--", file]).await?;
        match diff.code {
            Some(0) => return Ok(CommitOutcome::Unchanged),
            Some(1) => {}
            _ => return Err(VcsError::Command(diff.reason().to_string())),
        }
        Self::run_git(workdir, &["commit", "-m", message, "--", file]).await?;
        Ok(CommitOutcome::Committed)
    }
}

// ---------------------------------------------------------------------------
// libgit2 adapter (feature-gated)
// ---------------------------------------------------------------------------

/// In-process adapter on top of [`crate::git2_ops::Git2Ops`].
///
/// libgit2 calls block, so each one runs on tokio's blocking pool.
#[cfg(feature = "libgit2")]
#[derive(Debug, Default, Clone, Copy)]
pub struct Git2Vcs;

#[cfg(feature = "libgit2")]
async fn run_blocking<T, F>(f: F) -> Result<T, VcsError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, VcsError> + Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| VcsError::Task(e.to_string()))?
}

#[cfg(feature = "libgit2")]
#[async_trait]
impl VersionControl for Git2Vcs {
    async fn is_repository(&self, workdir: &Path) -> Result<bool, VcsError> {
        let dir = workdir.to_path_buf();
        run_blocking(move || crate::git2_ops::Git2Ops::is_repository(&dir)).await
    }

    async fn init(&self, workdir: &Path) -> Result<(), VcsError> {
        let dir = workdir.to_path_buf();
        run_blocking(move || crate::git2_ops::Git2Ops::init(&dir)).await
    }

    async fn stage(&self, workdir: &Path, file: &str) -> Result<(), VcsError> {
        let dir = workdir.to_path_buf();
        let file = file.to_string();
        run_blocking(move || crate::git2_ops::Git2Ops::stage(&dir, &file)).await
    }

    async fn commit(
        &self,
        workdir: &Path,
        file: &str,
        message: &str,
    ) -> Result<CommitOutcome, VcsError> {
        let dir = workdir.to_path_buf();
        let file = file.to_string();
        let message = message.to_string();
        run_blocking(move || crate::git2_ops::Git2Ops::commit_only(&dir, &file, &message)).await
    }
}

/// The best collaborator available in this build.
///
/// [`Git2Vcs`] when the `libgit2` feature is enabled, otherwise [`ShellGit`].
pub fn default_vcs() -> Arc<dyn VersionControl> {
    #[cfg(feature = "libgit2")]
    {
        Arc::new(Git2Vcs)
    }
    #[cfg(not(feature = "libgit2"))]
    {
        Arc::new(ShellGit)
    }
}
