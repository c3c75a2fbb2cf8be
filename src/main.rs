//! repo-bundle: fetch a GitHub repository over HTTP and write its analysis bundle
//!
//! See [`repo_bundle::cli`] for the commands.

use anyhow::Result;
use std::process::ExitCode;

#[tokio::main]
async fn main() -> Result<ExitCode> {
    repo_bundle::cli::run().await
}
