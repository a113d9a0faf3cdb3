//! Native git write operations via libgit2 (git2 crate).
//!
//! Covers exactly what a snapshot needs: discover, init, stage one path,
//! and commit one path. Each call opens the repository fresh so the index
//! is never stale between the stage and the commit.

use std::path::{Component, Path, PathBuf};

use git2::{ErrorCode, ObjectType, Oid, Repository, Tree};

use crate::vcs::{CommitOutcome, VcsError};

const TREE_FILEMODE: i32 = 0o040000;

impl From<git2::Error> for VcsError {
    fn from(e: git2::Error) -> Self {
        VcsError::Command(e.message().to_string())
    }
}

pub struct Git2Ops;

impl Git2Ops {
    fn open(workdir: &Path) -> Result<Repository, VcsError> {
        Repository::discover(workdir).map_err(VcsError::from)
    }

    /// Whether `workdir` sits inside a non-bare repository.
    pub fn is_repository(workdir: &Path) -> Result<bool, VcsError> {
        match Repository::discover(workdir) {
            Ok(repo) => Ok(!repo.is_bare()),
            Err(e) if e.code() == ErrorCode::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    /// Create a repository rooted at `workdir` (replaces `git init`).
    pub fn init(workdir: &Path) -> Result<(), VcsError> {
        Repository::init(workdir)?;
        Ok(())
    }

    /// Add one file to the index (replaces `git add -- <file>`).
    pub fn stage(workdir: &Path, file: &str) -> Result<(), VcsError> {
        let repo = Self::open(workdir)?;
        let rel = repo_relative(&repo, workdir, file)?;
        let mut index = repo.index()?;
        index.add_path(&rel)?;
        index.write()?;
        Ok(())
    }

    /// Commit only `file` on top of `HEAD` (replaces `git commit -m <msg> -- <file>`).
    ///
    /// The new tree is `HEAD`'s tree with the file's staged blob swapped in;
    /// anything else staged stays out of the commit. When that tree equals
    /// `HEAD`'s, nothing is written.
    pub fn commit_only(
        workdir: &Path,
        file: &str,
        message: &str,
    ) -> Result<CommitOutcome, VcsError> {
        let repo = Self::open(workdir)?;
        let rel = repo_relative(&repo, workdir, file)?;

        let index = repo.index()?;
        let entry = index.get_path(&rel, 0).ok_or_else(|| {
            VcsError::Command(format!(
                "pathspec '{file}' did not match any file(s) known to git"
            ))
        })?;

        let parent = match repo.head() {
            Ok(head) => Some(head.peel_to_commit()?),
            Err(e) if matches!(e.code(), ErrorCode::UnbornBranch | ErrorCode::NotFound) => None,
            Err(e) => return Err(e.into()),
        };
        let base_tree = parent.as_ref().map(|c| c.tree()).transpose()?;

        let components = path_components(&rel)?;
        let tree_oid = upsert_entry(
            &repo,
            base_tree.as_ref(),
            &components,
            entry.id,
            entry.mode as i32,
        )?;

        if base_tree.as_ref().is_some_and(|t| t.id() == tree_oid) {
            return Ok(CommitOutcome::Unchanged);
        }

        let tree = repo.find_tree(tree_oid)?;
        let sig = repo.signature()?;
        let parents: Vec<&git2::Commit<'_>> = parent.iter().collect();
        repo.commit(Some("HEAD"), &sig, &sig, message, &tree, &parents)?;
        Ok(CommitOutcome::Committed)
    }
}

/// Path of `workdir/file` relative to the repository root.
fn repo_relative(repo: &Repository, workdir: &Path, file: &str) -> Result<PathBuf, VcsError> {
    let root = repo
        .workdir()
        .ok_or_else(|| VcsError::Command("repository has no working directory".to_string()))?;
    let root = std::fs::canonicalize(root)?;
    let dir = std::fs::canonicalize(workdir)?;
    let rel = dir.strip_prefix(&root).map_err(|_| {
        VcsError::Command(format!(
            "{} is outside repository {}",
            dir.display(),
            root.display()
        ))
    })?;
    Ok(rel.join(file))
}

fn path_components(rel: &Path) -> Result<Vec<String>, VcsError> {
    rel.components()
        .map(|c| match c {
            Component::Normal(part) => part
                .to_str()
                .map(ToOwned::to_owned)
                .ok_or_else(|| VcsError::Command(format!("non-utf8 path: {}", rel.display()))),
            _ => Err(VcsError::Command(format!(
                "unexpected path component in {}",
                rel.display()
            ))),
        })
        .collect()
}

/// Write a tree equal to `base` with `path` pointing at `oid`, creating
/// intermediate trees as needed. Returns the new tree's id.
fn upsert_entry(
    repo: &Repository,
    base: Option<&Tree<'_>>,
    path: &[String],
    oid: Oid,
    mode: i32,
) -> Result<Oid, VcsError> {
    let (name, rest) = path
        .split_first()
        .ok_or_else(|| VcsError::Command("empty path".to_string()))?;

    let mut builder = repo.treebuilder(base)?;
    if rest.is_empty() {
        builder.insert(name.as_str(), oid, mode)?;
    } else {
        let subtree = match base.and_then(|t| t.get_name(name)) {
            Some(entry) if entry.kind() == Some(ObjectType::Tree) => {
                Some(repo.find_tree(entry.id())?)
            }
            _ => None,
        };
        let sub_oid = upsert_entry(repo, subtree.as_ref(), rest, oid, mode)?;
        builder.insert(name.as_str(), sub_oid, TREE_FILEMODE)?;
    }
    Ok(builder.write()?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn is_repository_false_for_plain_dir() {
        let tmp = tempfile::tempdir().unwrap();
        if Repository::discover(tmp.path()).is_ok() {
            return;
        }
        assert!(!Git2Ops::is_repository(tmp.path()).unwrap());
    }

    #[test]
    fn init_creates_repository() {
        let tmp = tempfile::tempdir().unwrap();
        Git2Ops::init(tmp.path()).unwrap();
        assert!(Git2Ops::is_repository(tmp.path()).unwrap());
    }

    #[test]
    fn stage_adds_index_entry() {
        let tmp = tempfile::tempdir().unwrap();
        Git2Ops::init(tmp.path()).unwrap();
        std::fs::write(tmp.path().join("files.txt"), "a.txt").unwrap();

        Git2Ops::stage(tmp.path(), "files.txt").unwrap();

        let repo = Repository::open(tmp.path()).unwrap();
        let index = repo.index().unwrap();
        assert!(index.get_path(Path::new("files.txt"), 0).is_some());
    }

    #[test]
    fn commit_without_staging_fails() {
        let tmp = tempfile::tempdir().unwrap();
        Git2Ops::init(tmp.path()).unwrap();
        std::fs::write(tmp.path().join("files.txt"), "a.txt").unwrap();

        let err = Git2Ops::commit_only(tmp.path(), "files.txt", "update files.txt").unwrap_err();
        assert!(err.to_string().contains("did not match"));
    }

    #[test]
    fn recommitting_same_blob_is_unchanged() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path();
        let repo = Repository::init(root).unwrap();
        let mut cfg = repo.config().unwrap();
        cfg.set_str("user.name", "Chronofile Test").unwrap();
        cfg.set_str("user.email", "dev@example.com").unwrap();

        std::fs::write(root.join("files.txt"), "a.txt").unwrap();
        Git2Ops::stage(root, "files.txt").unwrap();
        let first = Git2Ops::commit_only(root, "files.txt", "update files.txt").unwrap();
        assert_eq!(first, CommitOutcome::Committed);
        let head = repo.head().unwrap().target().unwrap();

        std::fs::remove_file(root.join("files.txt")).unwrap();
        std::fs::write(root.join("files.txt"), "a.txt").unwrap();
        Git2Ops::stage(root, "files.txt").unwrap();
        let second = Git2Ops::commit_only(root, "files.txt", "update files.txt").unwrap();
        assert_eq!(second, CommitOutcome::Unchanged);
        assert_eq!(repo.head().unwrap().target().unwrap(), head);
    }

    #[test]
    fn path_components_rejects_parent_dirs() {
        assert!(path_components(Path::new("../files.txt")).is_err());
        assert_eq!(
            path_components(Path::new("photos/files.txt")).unwrap(),
            vec!["photos".to_string(), "files.txt".to_string()]
        );
    }
}
