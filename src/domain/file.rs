use super::AcquisitionMethod;
use serde::Serialize;

/// A retrieved file. `content` is `None` when only the path and size are known.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRecord {
    pub path: String,
    pub content: Option<Vec<u8>>,
    pub size: u64,
    pub source: AcquisitionMethod,
}

impl FileRecord {
    pub fn with_content(
        path: impl Into<String>,
        content: Vec<u8>,
        source: AcquisitionMethod,
    ) -> Self {
        let size = content.len() as u64;
        Self { path: path.into(), content: Some(content), size, source }
    }

    /// A listed file whose bytes were not fetched.
    pub fn listed(path: impl Into<String>, size: u64, source: AcquisitionMethod) -> Self {
        Self { path: path.into(), content: None, size, source }
    }

    pub fn has_content(&self) -> bool {
        self.content.is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum TriageReason {
    Included,
    NonSource,
    TooLarge,
}

/// Which noise rule flagged a file as non-source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NoiseKind {
    VcsMetadata,
    OsArtifact,
    LockFile,
    Vendored,
    BuildOutput,
    BinaryExtension,
    BinaryContent,
    Minified,
    Generated,
    UserExcluded,
}

impl NoiseKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::VcsMetadata => "vcs_metadata",
            Self::OsArtifact => "os_artifact",
            Self::LockFile => "lock_file",
            Self::Vendored => "vendored",
            Self::BuildOutput => "build_output",
            Self::BinaryExtension => "binary_extension",
            Self::BinaryContent => "binary_content",
            Self::Minified => "minified",
            Self::Generated => "generated",
            Self::UserExcluded => "user_excluded",
        }
    }
}

/// A file after triage. Exactly one exists per acquired `FileRecord`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TriagedFile {
    pub record: FileRecord,
    pub reason: TriageReason,
    pub noise: Option<NoiseKind>,
    pub language: Option<&'static str>,
    /// Zero for excluded files.
    pub priority: i64,
}

impl TriagedFile {
    pub fn included(&self) -> bool {
        self.reason == TriageReason::Included
    }

    pub fn path(&self) -> &str {
        &self.record.path
    }
}
