//! Shared CLI utilities.

use crate::auth::token_from_env;
use anyhow::{Context, Result};
use std::path::Path;

/// Parse a comma-separated string into a `Vec<String>`, trimming whitespace and
/// discarding empty segments.  Returns `None` when `value` is `None`.
pub fn parse_csv(value: &Option<String>) -> Option<Vec<String>> {
    value.as_ref().map(|s| {
        s.split(',')
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .map(|part| part.to_string())
            .collect::<Vec<_>>()
    })
}

/// First non-empty of `--token`, `--token-file`, then the environment.
pub fn resolve_token(flag: Option<&str>, file: Option<&Path>) -> Result<Option<String>> {
    if let Some(token) = flag.map(str::trim).filter(|t| !t.is_empty()) {
        return Ok(Some(token.to_string()));
    }
    if let Some(path) = file {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed reading token file: {}", path.display()))?;
        if let Some(token) = content.lines().map(str::trim).find(|line| !line.is_empty()) {
            return Ok(Some(token.to_string()));
        }
        tracing::warn!("Token file {} is empty", path.display());
    }
    Ok(token_from_env())
}
