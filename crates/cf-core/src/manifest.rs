use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;

/// Result of a best-effort step whose failure does not stop the run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "status", content = "reason")]
pub enum StepOutcome {
    Completed,
    Failed(String),
}

impl StepOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, StepOutcome::Completed)
    }
}

/// Join names one per line with CRLF line endings.
///
/// Names are joined with `\n` first and every `\n` is then widened, so a
/// newline embedded in a file name is widened too.
pub fn render_manifest<S: AsRef<str>>(names: &[S]) -> String {
    names
        .iter()
        .map(|s| s.as_ref())
        .collect::<Vec<&str>>()
        .join("\n")
        .replace('\n', "\r\n")
}

/// Write the manifest text. Failure is logged and reported, never raised.
pub async fn write_manifest(path: &Path, text: &str) -> StepOutcome {
    match tokio::fs::write(path, text.as_bytes()).await {
        Ok(()) => StepOutcome::Completed,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "could not save list");
            StepOutcome::Failed(e.to_string())
        }
    }
}

/// Ignore everything except the manifest.
pub fn ignore_rule(manifest_name: &str) -> String {
    format!("*\n!{manifest_name}")
}

/// Overwrite the ignore file with [`ignore_rule`].
pub async fn write_ignore_rule(path: &Path, manifest_name: &str) -> std::io::Result<()> {
    tokio::fs::write(path, ignore_rule(manifest_name)).await
}

/// Remove one transient file. Failure is logged and reported, never raised.
pub async fn remove_transient(path: &Path) -> StepOutcome {
    match tokio::fs::remove_file(path).await {
        Ok(()) => StepOutcome::Completed,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "could not delete temp file");
            StepOutcome::Failed(e.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_uses_crlf_between_names() {
        assert_eq!(render_manifest(&["a.txt", "b.txt"]), "a.txt\r\nb.txt");
    }

    #[test]
    fn render_has_no_trailing_newline() {
        let text = render_manifest(&["only.txt"]);
        assert_eq!(text, "only.txt");
    }

    #[test]
    fn render_empty_is_empty_string() {
        let names: Vec<String> = Vec::new();
        assert_eq!(render_manifest(&names), "");
    }

    #[test]
    fn render_widens_newlines_inside_names() {
        assert_eq!(render_manifest(&["odd\nname", "x"]), "odd\r\nname\r\nx");
    }

    #[test]
    fn ignore_rule_keeps_only_manifest() {
        assert_eq!(ignore_rule("files.txt"), "*\n!files.txt");
    }

    #[tokio::test]
    async fn write_manifest_and_remove() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("files.txt");

        assert_eq!(write_manifest(&path, "a\r\nb").await, StepOutcome::Completed);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "a\r\nb");

        assert!(remove_transient(&path).await.is_completed());
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn write_manifest_failure_is_reported() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("files.txt");
        std::fs::create_dir(&path).unwrap();

        let outcome = write_manifest(&path, "a").await;
        assert!(matches!(outcome, StepOutcome::Failed(_)));
    }

    #[tokio::test]
    async fn remove_missing_file_is_reported() {
        let tmp = tempfile::tempdir().unwrap();
        let outcome = remove_transient(&tmp.path().join("absent")).await;
        assert!(!outcome.is_completed());
    }

    #[tokio::test]
    async fn write_ignore_rule_overwrites() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join(".gitignore");
        std::fs::write(&path, "target/\nnode_modules/\n").unwrap();

        write_ignore_rule(&path, "files.txt").await.unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "*\n!files.txt");
    }

    #[test]
    fn step_outcome_serialize() {
        let json = serde_json::to_string(&StepOutcome::Failed("denied".into())).unwrap();
        assert_eq!(json, r#"{"status":"failed","reason":"denied"}"#);
        let json = serde_json::to_string(&StepOutcome::Completed).unwrap();
        assert_eq!(json, r#"{"status":"completed"}"#);
    }
}
