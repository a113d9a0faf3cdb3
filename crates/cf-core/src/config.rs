use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Name of the manifest written into the working directory.
pub const MANIFEST_FILE_NAME: &str = "files.txt";

/// Name of the ignore file that keeps everything but the manifest untracked.
pub const IGNORE_FILE_NAME: &str = ".gitignore";

/// Settings for one snapshot run.
///
/// The file names are fixed for every real run; they live here so the
/// pipeline never reaches for a global and tests can point at any directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotConfig {
    pub workdir: PathBuf,
    #[serde(default = "default_manifest_name")]
    pub manifest_name: String,
    #[serde(default = "default_ignore_name")]
    pub ignore_name: String,
}

fn default_manifest_name() -> String {
    MANIFEST_FILE_NAME.to_string()
}

fn default_ignore_name() -> String {
    IGNORE_FILE_NAME.to_string()
}

impl SnapshotConfig {
    /// Config for `workdir` with the standard file names.
    pub fn for_dir(workdir: impl Into<PathBuf>) -> Self {
        Self {
            workdir: workdir.into(),
            manifest_name: default_manifest_name(),
            ignore_name: default_ignore_name(),
        }
    }

    /// Config for the process's current directory.
    pub fn from_current_dir() -> Result<Self, ConfigError> {
        let cwd = std::env::current_dir().map_err(|e| ConfigError::Io(e.to_string()))?;
        Ok(Self::for_dir(cwd))
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.workdir.join(&self.manifest_name)
    }

    pub fn ignore_path(&self) -> PathBuf {
        self.workdir.join(&self.ignore_name)
    }

    /// Message recorded on the manifest commit.
    pub fn commit_message(&self) -> String {
        format!("update {}", self.manifest_name)
    }

    /// Semantic checks that the type system cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_file_name("manifest_name", &self.manifest_name)?;
        validate_file_name("ignore_name", &self.ignore_name)?;

        if self.manifest_name == self.ignore_name {
            return Err(ConfigError::Validation(format!(
                "manifest_name and ignore_name must differ (both are '{}')",
                self.manifest_name
            )));
        }

        if !self.workdir.is_dir() {
            return Err(ConfigError::Validation(format!(
                "workdir is not a directory: {}",
                self.workdir.display()
            )));
        }

        Ok(())
    }
}

fn validate_file_name(field: &str, name: &str) -> Result<(), ConfigError> {
    if name.trim().is_empty() {
        return Err(ConfigError::Validation(format!("{field} must not be empty")));
    }
    if name == "." || name == ".." {
        return Err(ConfigError::Validation(format!(
            "{field} must name a file, got '{name}'"
        )));
    }
    if name.contains('/') || name.contains('\\') || Path::new(name).components().count() != 1 {
        return Err(ConfigError::Validation(format!(
            "{field} must be a bare file name without separators, got '{name}'"
        )));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("io: {0}")]
    Io(String),
    #[error("validation: {0}")]
    Validation(String),
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
