//! Token command implementation

use crate::auth::classify;
use anyhow::Result;
use clap::Args;
use std::path::PathBuf;
use std::process::ExitCode;

use super::utils::resolve_token;

#[derive(Args)]
pub struct TokenArgs {
    /// Token to classify (falls back to GITHUB_TOKEN, then GH_TOKEN)
    #[arg(short = 't', long, value_name = "TOKEN")]
    pub token: Option<String>,

    /// Read the token from the first non-empty line of a file
    #[arg(long, value_name = "FILE")]
    pub token_file: Option<PathBuf>,
}

pub fn run(args: TokenArgs) -> Result<ExitCode> {
    let token = resolve_token(args.token.as_deref(), args.token_file.as_deref())?;
    let credential = classify(token.as_deref())?;
    let tier = credential.tier();

    println!("Token: {}", credential.masked());
    println!("Kind: {}", credential.kind());
    println!("Scheme: {}", credential.scheme().as_str());
    println!("Tier: {:?} ({} requests/hour)", tier, tier.expected_hourly_limit());
    println!("Concurrency: {}", credential.kind().fetch_concurrency());
    println!("Well formed: {}", if credential.is_well_formed() { "yes" } else { "no" });

    Ok(ExitCode::SUCCESS)
}
