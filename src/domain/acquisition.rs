use serde::{Deserialize, Serialize};
use std::fmt;

/// How a file set was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AcquisitionMethod {
    /// Whole-repository zip snapshot, one request.
    Archive,
    /// Per-directory listing plus per-file content requests.
    Api,
    /// Synthetic run without network access.
    DryRun,
}

impl AcquisitionMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Archive => "archive",
            Self::Api => "api",
            Self::DryRun => "dry-run",
        }
    }
}

impl fmt::Display for AcquisitionMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AttemptOutcome {
    Success,
    RateLimited,
    NotFound,
    Forbidden,
    Unauthorized,
    TooLarge,
    TransportError,
}

impl AttemptOutcome {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::RateLimited => "rateLimited",
            Self::NotFound => "notFound",
            Self::Forbidden => "forbidden",
            Self::Unauthorized => "unauthorized",
            Self::TooLarge => "tooLarge",
            Self::TransportError => "transportError",
        }
    }
}

impl fmt::Display for AttemptOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One try of one acquisition method, kept in the run's attempt log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AcquisitionAttempt {
    pub method: AcquisitionMethod,
    pub outcome: AttemptOutcome,
    /// Files retrieved on success, bytes observed on `tooLarge`, zero otherwise.
    pub file_count_or_size: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl AcquisitionAttempt {
    pub fn success(method: AcquisitionMethod, file_count: usize) -> Self {
        Self {
            method,
            outcome: AttemptOutcome::Success,
            file_count_or_size: file_count as u64,
            detail: None,
        }
    }

    pub fn failed(method: AcquisitionMethod, outcome: AttemptOutcome, detail: String) -> Self {
        Self { method, outcome, file_count_or_size: 0, detail: Some(detail) }
    }

    pub fn size(mut self, bytes: u64) -> Self {
        self.file_count_or_size = bytes;
        self
    }
}
