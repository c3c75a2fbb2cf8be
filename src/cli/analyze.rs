//! Analyze command implementation

use crate::auth::classify;
use crate::config::{load_config, merge_cli_with_config, CliOverrides};
use crate::domain::{Config, MethodMode, OutputFormat};
use crate::error::AnalyzerError;
use crate::fetch::RepoRef;
use crate::pipeline::Analyzer;
use crate::render::{write_bundle, RepositoryBundle};
use anyhow::{Context, Result};
use clap::Args;
use std::future::Future;
use std::path::PathBuf;
use std::process::ExitCode;

use super::progress::Progress;
use super::utils::{parse_csv, resolve_token};

const EXIT_PARTIAL: u8 = 2;

#[derive(Args)]
pub struct AnalyzeArgs {
    /// Repository: https://github.com/owner/name, github.com/owner/name or owner/name
    #[arg(value_name = "REPO")]
    pub repo: String,

    /// Git ref (branch, tag or commit) to snapshot instead of the default branch
    #[arg(long = "ref", value_name = "REF")]
    pub git_ref: Option<String>,

    /// GitHub token (falls back to GITHUB_TOKEN, then GH_TOKEN)
    #[arg(short = 't', long, value_name = "TOKEN")]
    pub token: Option<String>,

    /// Read the token from the first non-empty line of a file
    #[arg(long, value_name = "FILE")]
    pub token_file: Option<PathBuf>,

    /// Acquisition method: auto, archive or api
    #[arg(short = 'm', long, value_name = "METHOD")]
    pub method: Option<String>,

    /// Path to config file (repo-bundle.toml or repo-bundle.yaml)
    #[arg(short = 'c', long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Output directory for the bundle
    #[arg(short = 'o', long, value_name = "DIR", default_value = ".")]
    pub output_dir: PathBuf,

    /// Output format: json, text or both
    #[arg(short = 'f', long, value_name = "FORMAT")]
    pub format: Option<String>,

    /// Skip files larger than this (bytes)
    #[arg(long, value_name = "BYTES")]
    pub max_file_bytes: Option<u64>,

    /// Largest archive download accepted before falling back to the API (bytes)
    #[arg(long, value_name = "BYTES")]
    pub max_archive_bytes: Option<u64>,

    /// Cap on files fetched individually through the API
    #[arg(long, value_name = "N")]
    pub max_api_files: Option<usize>,

    /// Concurrent content requests on the API path
    #[arg(long, value_name = "N")]
    pub concurrency: Option<usize>,

    /// Glob patterns to exclude (comma-separated)
    #[arg(short = 'e', long, value_name = "GLOBS")]
    pub exclude_glob: Option<String>,

    /// Omit file contents from the bundle
    #[arg(long)]
    pub no_content: bool,

    /// Omit the creation timestamp for reproducible output
    #[arg(long)]
    pub no_timestamp: bool,

    /// Resolve settings and write an empty bundle without network access
    #[arg(long)]
    pub dry_run: bool,
}

pub async fn run(args: AnalyzeArgs, verbose: bool) -> Result<ExitCode> {
    let cwd = std::env::current_dir().context("Failed to read current directory")?;
    let file_config = load_config(&cwd, args.config.as_deref())?;

    let cli_overrides = CliOverrides {
        method: args.method.as_deref().map(str::parse::<MethodMode>).transpose()?,
        format: args.format.as_deref().map(str::parse::<OutputFormat>).transpose()?,
        max_file_bytes: args.max_file_bytes,
        max_archive_bytes: args.max_archive_bytes,
        max_api_files: args.max_api_files,
        fetch_concurrency: args.concurrency,
        exclude_globs: parse_csv(&args.exclude_glob),
        include_content: args.no_content.then_some(false),
        include_timestamp: args.no_timestamp.then_some(false),
        dry_run: args.dry_run.then_some(true),
    };
    let config = merge_cli_with_config(file_config, cli_overrides)?;

    let repo = RepoRef::parse(&args.repo)?.with_ref(args.git_ref.clone());
    let token = resolve_token(args.token.as_deref(), args.token_file.as_deref())?;
    let credential = classify(token.as_deref())?;
    if !credential.is_well_formed() {
        tracing::warn!(
            "{} token {} has an unexpected length; continuing, but GitHub may reject it",
            credential.kind(),
            credential.masked()
        );
    }
    tracing::debug!(?credential, method = ?config.method, "resolved run settings");

    let analyzer = Analyzer::from_config(&config)?;
    let progress = Progress::new(!verbose);
    progress.set_message(format!("Analyzing {repo}..."));

    let run = tokio::time::timeout(config.run_timeout(), analyzer.analyze(&repo, &credential));
    let outcome = match race_interrupt(run, tokio::signal::ctrl_c()).await {
        Raced::Finished(outcome) => outcome,
        Raced::Interrupted => {
            progress.finish_and_clear();
            eprintln!("Interrupted; no bundle written");
            return Ok(ExitCode::FAILURE);
        }
    };
    progress.finish_and_clear();

    let bundle = match outcome {
        Err(_) => {
            eprintln!(
                "error: analysis of {repo} did not finish within {}s",
                config.run_timeout_secs
            );
            return Ok(ExitCode::FAILURE);
        }
        Ok(Err(err)) => {
            report_failure(&err);
            return Ok(ExitCode::FAILURE);
        }
        Ok(Ok(bundle)) => bundle,
    };

    let written = write_bundle(&args.output_dir, &bundle, config.format)?;
    report_success(&bundle, &written, &config);

    if bundle.is_partial() {
        Ok(ExitCode::from(EXIT_PARTIAL))
    } else {
        Ok(ExitCode::SUCCESS)
    }
}

#[derive(Debug, PartialEq, Eq)]
enum Raced<T> {
    Finished(T),
    Interrupted,
}

/// Race a run against an interrupt signal. A signal handler that fails to
/// install is logged and never fires.
async fn race_interrupt<T>(
    run: impl Future<Output = T>,
    signal: impl Future<Output = std::io::Result<()>>,
) -> Raced<T> {
    let interrupted = async {
        if let Err(err) = signal.await {
            tracing::warn!(error = %err, "Ctrl-C handler unavailable; run is not interruptible");
            std::future::pending::<()>().await;
        }
    };
    tokio::select! {
        outcome = run => Raced::Finished(outcome),
        _ = interrupted => Raced::Interrupted,
    }
}

fn report_success(bundle: &RepositoryBundle, written: &[PathBuf], config: &Config) {
    let meta = &bundle.metadata;
    println!(
        "{} via {}: {} files, {} ({})",
        meta.repo,
        meta.analysis_method,
        meta.files,
        meta.size.display_size,
        bundle.status.as_str()
    );
    if config.dry_run {
        println!("Dry run: no requests were made");
    }
    for path in written {
        println!("Wrote {}", path.display());
    }
    for warning in &bundle.warnings {
        eprintln!("warning: {}", warning.message);
    }
}

fn report_failure(err: &AnalyzerError) {
    eprintln!("error: {err}");
    if let AnalyzerError::Acquisition { attempts, .. } = err {
        for (idx, attempt) in attempts.iter().enumerate() {
            match &attempt.detail {
                Some(detail) => eprintln!(
                    "  attempt {}: {} {} - {}",
                    idx + 1,
                    attempt.method,
                    attempt.outcome,
                    detail
                ),
                None => eprintln!("  attempt {}: {} {}", idx + 1, attempt.method, attempt.outcome),
            }
        }
    }
    if let Some(hint) = err.hint() {
        eprintln!("hint: {hint}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn run_survives_signal_handler_failure() {
        let run = async {
            tokio::time::sleep(Duration::from_millis(20)).await;
            7
        };
        let signal = async { Err(std::io::Error::other("no signal driver")) };
        assert_eq!(race_interrupt(run, signal).await, Raced::Finished(7));
    }

    #[tokio::test]
    async fn delivered_signal_interrupts_run() {
        let run = std::future::pending::<u8>();
        assert_eq!(race_interrupt(run, async { Ok(()) }).await, Raced::Interrupted);
    }
}
