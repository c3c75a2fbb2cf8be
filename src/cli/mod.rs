//! Command-line interface for repo-bundle
//!
//! Provides `analyze`, `token` and `limits` subcommands.

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::process::ExitCode;
use tracing::Level;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod analyze;
mod limits;
mod progress;
mod token;
mod utils;

/// Fetch a GitHub repository over HTTP and condense it into an analysis bundle
#[derive(Parser)]
#[command(name = "repo-bundle")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging (sets log level to DEBUG)
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Acquire a repository and write its bundle
    Analyze(Box<analyze::AnalyzeArgs>),

    /// Classify a token without contacting GitHub
    Token(token::TokenArgs),

    /// Show the current rate-limit quotas for a credential
    Limits(limits::LimitsArgs),
}

/// Exit codes: 0 complete bundle, 2 partial bundle, 1 failure.
pub async fn run() -> Result<ExitCode> {
    let cli = Cli::parse();

    // RUST_LOG in the environment always takes precedence; --verbose falls back to DEBUG.
    let filter = if cli.verbose {
        EnvFilter::from_default_env().add_directive(Level::DEBUG.into())
    } else {
        EnvFilter::from_default_env().add_directive(Level::WARN.into())
    };
    let _ = tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .try_init();

    match cli.command {
        Commands::Analyze(args) => analyze::run(*args, cli.verbose).await,
        Commands::Token(args) => token::run(args),
        Commands::Limits(args) => limits::run(args).await,
    }
}
