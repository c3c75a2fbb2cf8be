//! Error and warning taxonomy for acquisition runs.

use crate::domain::{AcquisitionAttempt, AcquisitionMethod, AttemptOutcome};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Failures raised by the network layer. All of them are retryable.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    #[error("request to {url} timed out")]
    Timeout { url: String },

    #[error("connection to {url} failed: {message}")]
    Connect { url: String, message: String },

    #[error("{url} answered with server error {status}")]
    ServerError { url: String, status: u16 },

    #[error("response body from {url} exceeded {limit} bytes")]
    BodyTooLarge { url: String, limit: u64 },

    #[error("request to {url} failed: {message}")]
    Other { url: String, message: String },
}

#[derive(Debug, Error)]
pub enum AnalyzerError {
    #[error("credential does not look like a GitHub token ({hint})")]
    InvalidCredentialFormat { hint: String },

    #[error("invalid repository reference '{input}': {reason}")]
    InvalidRepositoryUrl { input: String, reason: String },

    #[error("rate limit exhausted for {method} requests{}", fmt_reset(.reset_at))]
    RateLimitExhausted { method: AcquisitionMethod, reset_at: Option<DateTime<Utc>> },

    #[error("repository {repo} not found or not visible to this credential")]
    RepositoryNotFound { repo: String },

    #[error("access to {repo} denied: {detail}")]
    AccessDenied { repo: String, detail: String },

    #[error("authentication failed: {detail}")]
    AuthenticationFailed { detail: String },

    #[error("archive{} exceeds the {limit} byte limit", fmt_size(.size))]
    ArchiveTooLarge { size: Option<u64>, limit: u64 },

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(
        "acquisition failed after {} attempt(s), last method {last_method}: {source}",
        .attempts.len()
    )]
    Acquisition {
        source: Box<AnalyzerError>,
        last_method: AcquisitionMethod,
        attempts: Vec<AcquisitionAttempt>,
    },
}

fn fmt_reset(reset_at: &Option<DateTime<Utc>>) -> String {
    match reset_at {
        Some(at) => format!(" (resets at {})", at.format("%Y-%m-%d %H:%M:%S UTC")),
        None => String::new(),
    }
}

fn fmt_size(size: &Option<u64>) -> String {
    match size {
        Some(bytes) => format!(" of {bytes} bytes"),
        None => String::new(),
    }
}

impl AnalyzerError {
    /// The attempt outcome an error corresponds to when it ends an acquisition attempt.
    pub fn outcome(&self) -> AttemptOutcome {
        match self {
            Self::RateLimitExhausted { .. } => AttemptOutcome::RateLimited,
            Self::RepositoryNotFound { .. } => AttemptOutcome::NotFound,
            Self::AccessDenied { .. } => AttemptOutcome::Forbidden,
            Self::AuthenticationFailed { .. } | Self::InvalidCredentialFormat { .. } => {
                AttemptOutcome::Unauthorized
            }
            Self::ArchiveTooLarge { .. } => AttemptOutcome::TooLarge,
            Self::Acquisition { source, .. } => source.outcome(),
            Self::Transport(_) | Self::InvalidRepositoryUrl { .. } => {
                AttemptOutcome::TransportError
            }
        }
    }

    /// The innermost error, unwrapping an `Acquisition` envelope.
    pub fn terminal(&self) -> &AnalyzerError {
        match self {
            Self::Acquisition { source, .. } => source.terminal(),
            other => other,
        }
    }

    /// A short remediation hint printed next to hard failures.
    pub fn hint(&self) -> Option<&'static str> {
        match self.terminal() {
            Self::RateLimitExhausted { .. } => Some(
                "wait for the quota to reset, or pass --token / set GITHUB_TOKEN \
                 for 5000 requests per hour",
            ),
            Self::RepositoryNotFound { .. } | Self::AccessDenied { .. } => Some(
                "check the repository name; private repositories need a token \
                 with read access to contents",
            ),
            Self::AuthenticationFailed { .. } | Self::InvalidCredentialFormat { .. } => {
                Some("check that the token is current and copied completely")
            }
            Self::ArchiveTooLarge { .. } => Some("raise --max-archive-bytes or use --method api"),
            Self::Transport(_) => Some("check network connectivity and retry"),
            _ => None,
        }
    }
}

/// Non-fatal conditions collected during a run. Any warning marks the bundle partial.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Warning {
    NoSourceFilesFound,
    RepositoryInfoUnavailable { detail: String },
    DirectoryListingFailed { path: String, detail: String },
    ContentFetchFailed { path: String, detail: String },
    ApiFileCapReached { cap: usize, skipped: usize },
    RateLimitReached { skipped: usize },
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoSourceFilesFound => write!(f, "no source files survived triage"),
            Self::RepositoryInfoUnavailable { detail } => {
                write!(f, "repository metadata unavailable: {detail}")
            }
            Self::DirectoryListingFailed { path, detail } => {
                write!(f, "could not list directory '{path}': {detail}")
            }
            Self::ContentFetchFailed { path, detail } => {
                write!(f, "could not fetch content of '{path}': {detail}")
            }
            Self::ApiFileCapReached { cap, skipped } => {
                write!(
                    f,
                    "content fetched for the top {cap} files only; {skipped} left without content"
                )
            }
            Self::RateLimitReached { skipped } => {
                write!(
                    f,
                    "rate limit reached during content fetch; {skipped} files left without content"
                )
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn acquisition_envelope_reports_terminal_outcome() {
        let err = AnalyzerError::Acquisition {
            source: Box::new(AnalyzerError::RepositoryNotFound { repo: "o/r".into() }),
            last_method: AcquisitionMethod::Api,
            attempts: Vec::new(),
        };
        assert_eq!(err.outcome(), AttemptOutcome::NotFound);
        assert!(matches!(err.terminal(), AnalyzerError::RepositoryNotFound { .. }));
        assert!(err.hint().is_some());
        assert!(err.to_string().contains("last method api"));
    }

    #[test]
    fn rate_limit_message_includes_reset() {
        let reset = DateTime::<Utc>::from_timestamp(1_700_000_000, 0).expect("ts");
        let err = AnalyzerError::RateLimitExhausted {
            method: AcquisitionMethod::Archive,
            reset_at: Some(reset),
        };
        assert!(err.to_string().contains("resets at 2023-11-14"));
    }

    #[test]
    fn warning_serializes_with_kind_tag() {
        let value = serde_json::to_value(Warning::ApiFileCapReached { cap: 3, skipped: 2 })
            .expect("json");
        assert_eq!(value["kind"], "api_file_cap_reached");
        assert_eq!(value["cap"], 3);
    }
}
