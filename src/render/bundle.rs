//! Bundle assembly: acquisition + triage + inference into one serializable value.

use crate::auth::TokenKind;
use crate::domain::{
    AcquisitionAttempt, AcquisitionMethod, Config, NoiseKind, TriageReason, TriagedFile,
    BUNDLE_VERSION,
};
use crate::error::Warning;
use crate::fetch::{Acquisition, RepoInfo};
use crate::infer::{Inference, LanguageStat};
use crate::rank::is_readme;
use crate::utils::{decode_text, depth, estimate_tokens, format_size};
use serde::Serialize;

const FALLBACK_DESCRIPTION: &str = "GitHub repository analysis";
const MAX_DESCRIPTION_CHARS: usize = 200;
/// Stop collecting README prose once this much has been gathered.
const DESCRIPTION_GATHER_CHARS: usize = 150;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BundleOptions {
    pub include_content: bool,
    /// Unix seconds stamped as `metadata.created`; `None` omits the field.
    pub created: Option<i64>,
}

impl Default for BundleOptions {
    fn default() -> Self {
        Self { include_content: true, created: None }
    }
}

impl BundleOptions {
    pub fn from_config(config: &Config) -> Self {
        Self { include_content: config.include_content, created: None }
    }

    pub fn created(mut self, created: Option<i64>) -> Self {
        self.created = created;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BundleStatus {
    Complete,
    Partial,
}

impl BundleStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Complete => "complete",
            Self::Partial => "partial",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SizeSummary {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repo_size_kb: Option<u64>,
    pub source_bytes: u64,
    pub display_size: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BundleMetadata {
    pub repo: String,
    pub owner: String,
    pub name: String,
    #[serde(rename = "ref", skip_serializing_if = "Option::is_none")]
    pub git_ref: Option<String>,
    pub desc: String,
    pub lang: Vec<String>,
    pub languages: Vec<LanguageStat>,
    pub deps: Vec<String>,
    pub size: SizeSummary,
    pub files: usize,
    pub main: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_branch: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub license: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub topics: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub private: Option<bool>,
    pub analysis_method: AcquisitionMethod,
    pub token_kind: TokenKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created: Option<i64>,
    pub version: &'static str,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BundleFile {
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<&'static str>,
    pub size: u64,
    pub priority: i64,
    pub tokens: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub encoding: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExcludedFile {
    pub path: String,
    pub size: u64,
    pub reason: TriageReason,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<NoiseKind>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AcquisitionLog {
    pub method: AcquisitionMethod,
    pub attempts: Vec<AcquisitionAttempt>,
}

/// A warning with its rendered message alongside the structured fields.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WarningEntry {
    #[serde(flatten)]
    pub warning: Warning,
    pub message: String,
}

impl From<Warning> for WarningEntry {
    fn from(warning: Warning) -> Self {
        let message = warning.to_string();
        Self { warning, message }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RepositoryBundle {
    pub metadata: BundleMetadata,
    pub files: Vec<BundleFile>,
    pub excluded: Vec<ExcludedFile>,
    pub acquisition: AcquisitionLog,
    pub warnings: Vec<WarningEntry>,
    pub status: BundleStatus,
}

impl RepositoryBundle {
    pub fn is_partial(&self) -> bool {
        self.status == BundleStatus::Partial
    }

    /// Output file stem, `{owner}_{name}`.
    pub fn file_stem(&self) -> String {
        format!("{}_{}", self.metadata.owner, self.metadata.name)
    }
}

/// Build the bundle. `files` must already be in triage order.
pub fn assemble(
    acquisition: Acquisition,
    files: Vec<TriagedFile>,
    inference: Inference,
    token_kind: TokenKind,
    options: &BundleOptions,
) -> RepositoryBundle {
    let Acquisition { repo, info, method, attempts, mut warnings, .. } = acquisition;

    let included: Vec<&TriagedFile> = files.iter().filter(|f| f.included()).collect();
    if included.is_empty() && method != AcquisitionMethod::DryRun {
        warnings.push(Warning::NoSourceFilesFound);
    }

    let source_bytes: u64 = included.iter().map(|f| f.record.size).sum();
    let repo_size_kb = info.as_ref().map(|i| i.size).filter(|kb| *kb > 0);
    let display_size = match repo_size_kb {
        Some(kb) => format_size(kb.saturating_mul(1024)),
        None => format_size(source_bytes),
    };

    let metadata = BundleMetadata {
        repo: repo.full_name(),
        owner: repo.owner.clone(),
        name: repo.name.clone(),
        git_ref: repo.git_ref.clone(),
        desc: describe(info.as_ref(), &files),
        lang: inference.languages.iter().map(|l| l.name.clone()).collect(),
        languages: inference.languages,
        deps: inference.dependencies.into_iter().collect(),
        size: SizeSummary { repo_size_kb, source_bytes, display_size },
        files: included.len(),
        main: inference.entry_points,
        default_branch: info.as_ref().and_then(|i| i.default_branch.clone()),
        license: info.as_ref().and_then(RepoInfo::license_name),
        topics: info.as_ref().map(|i| i.topics.clone()).unwrap_or_default(),
        private: info.as_ref().map(|i| i.private),
        analysis_method: method,
        token_kind,
        created: options.created,
        version: BUNDLE_VERSION,
    };

    let mut bundle_files = Vec::with_capacity(included.len());
    let mut excluded = Vec::new();
    for file in &files {
        if file.included() {
            bundle_files.push(bundle_file(file, options.include_content));
        } else {
            excluded.push(ExcludedFile {
                path: file.record.path.clone(),
                size: file.record.size,
                reason: file.reason,
                kind: file.noise,
            });
        }
    }

    let status = if warnings.is_empty() { BundleStatus::Complete } else { BundleStatus::Partial };
    tracing::info!(
        repo = %metadata.repo,
        included = bundle_files.len(),
        excluded = excluded.len(),
        warnings = warnings.len(),
        status = status.as_str(),
        "bundle assembled"
    );

    RepositoryBundle {
        metadata,
        files: bundle_files,
        excluded,
        acquisition: AcquisitionLog { method, attempts },
        warnings: warnings.into_iter().map(WarningEntry::from).collect(),
        status,
    }
}

fn bundle_file(file: &TriagedFile, include_content: bool) -> BundleFile {
    let decoded = file.record.content.as_deref().map(decode_text);
    let tokens = match &decoded {
        Some((text, _)) => estimate_tokens(text),
        None => (file.record.size / 4) as usize,
    };
    let (encoding, content) = match decoded {
        Some((text, encoding)) if include_content => (Some(encoding), Some(text)),
        _ => (None, None),
    };
    BundleFile {
        path: file.record.path.clone(),
        language: file.language,
        size: file.record.size,
        priority: file.priority,
        tokens,
        encoding,
        content,
    }
}

/// Repository description, else the opening prose of the top-level README.
fn describe(info: Option<&RepoInfo>, files: &[TriagedFile]) -> String {
    if let Some(desc) = info.and_then(|i| i.description.as_deref()).map(str::trim) {
        if !desc.is_empty() {
            return desc.to_string();
        }
    }

    files
        .iter()
        .filter(|f| depth(f.path()) == 0 && is_readme(f.path()))
        .find_map(|f| f.record.content.as_deref())
        .and_then(|bytes| readme_prose(&decode_text(bytes).0))
        .unwrap_or_else(|| FALLBACK_DESCRIPTION.to_string())
}

/// Leading prose of a README: headings, rules, badges and fences are skipped.
pub fn readme_prose(text: &str) -> Option<String> {
    let mut lines: Vec<&str> = Vec::new();
    let mut in_fence = false;
    for line in text.lines().map(str::trim) {
        if line.starts_with("```") || line.starts_with("~~~") {
            in_fence = !in_fence;
            continue;
        }
        if in_fence || is_decoration(line) {
            continue;
        }
        lines.push(line);
        if lines.iter().map(|l| l.len() + 1).sum::<usize>() > DESCRIPTION_GATHER_CHARS {
            break;
        }
    }
    if lines.is_empty() {
        return None;
    }

    let joined = lines.join(" ");
    if joined.chars().count() <= MAX_DESCRIPTION_CHARS {
        return Some(joined);
    }
    let truncated: String = joined.chars().take(MAX_DESCRIPTION_CHARS - 3).collect();
    Some(format!("{truncated}..."))
}

fn is_decoration(line: &str) -> bool {
    line.is_empty()
        || line.starts_with('#')
        || line.starts_with("---")
        || line.starts_with("===")
        || line.starts_with("[![")
        || line.starts_with("![")
        || line.starts_with('<')
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::FileRecord;
    use crate::fetch::RepoRef;
    use crate::infer::infer;
    use crate::triage::{triage, TriagePolicy};
    use serde_json::json;
    use similar_asserts::assert_eq;

    fn acquisition(files: Vec<FileRecord>, info: Option<RepoInfo>) -> Acquisition {
        Acquisition {
            repo: RepoRef::parse("octo/hello").expect("repo"),
            info,
            method: AcquisitionMethod::Archive,
            attempts: vec![AcquisitionAttempt::success(AcquisitionMethod::Archive, files.len())],
            files,
            warnings: Vec::new(),
        }
    }

    fn build(
        files: Vec<FileRecord>,
        info: Option<RepoInfo>,
        options: &BundleOptions,
    ) -> RepositoryBundle {
        let acquisition = acquisition(files, info);
        let triaged = triage(acquisition.files.clone(), &TriagePolicy::default());
        let inference = infer(&triaged);
        assemble(acquisition, triaged, inference, TokenKind::Anonymous, options)
    }

    fn record(path: &str, content: &str) -> FileRecord {
        FileRecord::with_content(path, content.as_bytes().to_vec(), AcquisitionMethod::Archive)
    }

    #[test]
    fn metadata_json_shape() {
        let info: RepoInfo = serde_json::from_value(json!({
            "name": "hello",
            "full_name": "octo/hello",
            "description": "Says hello",
            "size": 2048,
            "default_branch": "main",
            "topics": ["greeting"],
            "license": {"spdx_id": "MIT"},
        }))
        .expect("info");
        let bundle = build(
            vec![
                record("main.py", "import requests\nprint('hi')\n"),
                record("requirements.txt", "requests==2.0\n"),
                record("node_modules/x/index.js", "x"),
            ],
            Some(info),
            &BundleOptions::default().created(Some(1_700_000_000)),
        );

        let value = serde_json::to_value(&bundle.metadata).expect("json");
        assert_eq!(
            value,
            json!({
                "repo": "octo/hello",
                "owner": "octo",
                "name": "hello",
                "desc": "Says hello",
                "lang": ["Python"],
                "languages": [{"name": "Python", "bytes": 28, "files": 1, "share": 100.0}],
                "deps": ["requests"],
                "size": {"repo_size_kb": 2048, "source_bytes": 42, "display_size": "2.0 MB"},
                "files": 2,
                "main": ["main.py"],
                "default_branch": "main",
                "license": "MIT",
                "topics": ["greeting"],
                "private": false,
                "analysis_method": "archive",
                "token_kind": "anonymous",
                "created": 1_700_000_000,
                "version": BUNDLE_VERSION,
            })
        );
        assert_eq!(bundle.status, BundleStatus::Complete);
        assert_eq!(bundle.excluded.len(), 1);
        assert_eq!(bundle.excluded[0].kind, Some(NoiseKind::Vendored));
    }

    #[test]
    fn readme_fallback_description() {
        let readme = "# Hello\n\n[![ci](badge.svg)](ci)\n\n\
                      A tiny tool that greets people.\nIt is friendly.\n\n## Usage\n";
        let bundle = build(vec![record("README.md", readme)], None, &BundleOptions::default());
        assert_eq!(bundle.metadata.desc, "A tiny tool that greets people. It is friendly.");
        assert!(bundle.metadata.created.is_none());
    }

    #[test]
    fn long_readme_prose_is_truncated() {
        let prose = readme_prose(&"word ".repeat(100)).expect("prose");
        assert_eq!(prose.chars().count(), MAX_DESCRIPTION_CHARS);
        assert!(prose.ends_with("..."));
    }

    #[test]
    fn generic_description_without_sources() {
        let bundle = build(vec![record("main.py", "print(1)")], None, &BundleOptions::default());
        assert_eq!(bundle.metadata.desc, FALLBACK_DESCRIPTION);
    }

    #[test]
    fn empty_triage_is_partial_with_warning() {
        let bundle = build(vec![record("dist/app.js", "x")], None, &BundleOptions::default());
        assert!(bundle.is_partial());
        assert_eq!(bundle.warnings[0].warning, Warning::NoSourceFilesFound);
        assert_eq!(bundle.metadata.files, 0);
    }

    #[test]
    fn content_is_omitted_on_request() {
        let options = BundleOptions { include_content: false, created: None };
        let bundle = build(vec![record("main.py", "print('hello world')\n")], None, &options);
        assert!(bundle.files[0].content.is_none());
        assert_eq!(bundle.files[0].tokens, 5);
    }

    #[test]
    fn warnings_serialize_with_message() {
        let entry = WarningEntry::from(Warning::RateLimitReached { skipped: 3 });
        let value = serde_json::to_value(entry).expect("json");
        assert_eq!(value["kind"], "rate_limit_reached");
        assert_eq!(value["skipped"], 3);
        assert!(value["message"].as_str().expect("message").contains("3 files"));
    }
}
