use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use cf_core::vcs::ShellGit;
use cf_core::{default_vcs, Snapshot, SnapshotConfig, VersionControl};
use cf_telemetry::logging::{self, LogFormat};
use cf_telemetry::tracing_setup::create_operation_span;
use clap::{Parser, ValueEnum};
use tracing::{error, info, Instrument};

/// chronofile -- commit a modification-time-ordered list of a directory's files.
#[derive(Debug, Parser)]
#[command(name = "chronofile", version, about)]
struct Cli {
    /// Directory to snapshot (defaults to the current directory).
    dir: Option<PathBuf>,

    /// Git implementation to use.
    #[arg(long, value_enum, default_value_t = Backend::Auto)]
    backend: Backend,

    /// Log output format on stderr.
    #[arg(long, value_enum, default_value_t = LogFormatArg::Human)]
    log_format: LogFormatArg,

    /// Print the run report as JSON on stdout.
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Backend {
    /// libgit2 when compiled in, otherwise the git binary.
    Auto,
    /// Shell out to the `git` binary.
    Shell,
    /// In-process libgit2.
    Libgit2,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LogFormatArg {
    Human,
    Json,
}

impl From<LogFormatArg> for LogFormat {
    fn from(arg: LogFormatArg) -> Self {
        match arg {
            LogFormatArg::Human => LogFormat::Human,
            LogFormatArg::Json => LogFormat::Json,
        }
    }
}

fn build_vcs(backend: Backend) -> anyhow::Result<Arc<dyn VersionControl>> {
    match backend {
        Backend::Auto => Ok(default_vcs()),
        Backend::Shell => Ok(Arc::new(ShellGit)),
        #[cfg(feature = "libgit2")]
        Backend::Libgit2 => Ok(Arc::new(cf_core::vcs::Git2Vcs)),
        #[cfg(not(feature = "libgit2"))]
        Backend::Libgit2 => anyhow::bail!("this build was compiled without libgit2 support"),
    }
}

fn config_for(dir: Option<PathBuf>) -> anyhow::Result<SnapshotConfig> {
    Ok(match dir {
        Some(dir) => SnapshotConfig::for_dir(dir),
        None => SnapshotConfig::from_current_dir()?,
    })
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = config_for(cli.dir)?;
    let vcs = build_vcs(cli.backend)?;
    let snapshot = Snapshot::new(config, vcs);

    let (span, trace_id) = create_operation_span("snapshot");
    info!(%trace_id, dir = %snapshot.config().workdir.display(), "starting snapshot");

    let report = snapshot.run().instrument(span).await?;
    if !report.is_clean() {
        info!("snapshot committed with warnings");
    }

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    }
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init(cli.log_format.into(), "chronofile", "info");

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn defaults_without_arguments() {
        let cli = Cli::try_parse_from(["chronofile"]).unwrap();
        assert_eq!(cli.dir, None);
        assert_eq!(cli.backend, Backend::Auto);
        assert_eq!(cli.log_format, LogFormatArg::Human);
        assert!(!cli.json);
    }

    #[test]
    fn parses_dir_and_flags() {
        let cli = Cli::try_parse_from([
            "chronofile",
            "/srv/photos",
            "--backend",
            "shell",
            "--log-format",
            "json",
            "--json",
        ])
        .unwrap();
        assert_eq!(cli.dir, Some(PathBuf::from("/srv/photos")));
        assert_eq!(cli.backend, Backend::Shell);
        assert_eq!(cli.log_format, LogFormatArg::Json);
        assert!(cli.json);
    }

    #[test]
    fn rejects_unknown_backend() {
        assert!(Cli::try_parse_from(["chronofile", "--backend", "svn"]).is_err());
    }

    #[test]
    fn explicit_dir_is_used_as_is() {
        let cfg = config_for(Some(PathBuf::from("/srv/photos"))).unwrap();
        assert_eq!(cfg.workdir, PathBuf::from("/srv/photos"));
        assert_eq!(cfg.manifest_name, "files.txt");
    }

    #[test]
    fn shell_backend_always_builds() {
        assert!(build_vcs(Backend::Shell).is_ok());
        assert!(build_vcs(Backend::Auto).is_ok());
    }
}
