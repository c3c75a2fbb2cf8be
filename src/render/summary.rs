//! Plain-text rendering of a bundle.

use super::bundle::RepositoryBundle;
use std::fmt::Write;

/// Files listed in the summary before eliding the rest.
const MAX_LISTED_FILES: usize = 25;

pub fn render_summary(bundle: &RepositoryBundle) -> String {
    let meta = &bundle.metadata;
    let mut out = String::new();

    let _ = writeln!(out, "# {}", meta.repo);
    let _ = writeln!(out);
    let _ = writeln!(out, "{}", meta.desc);
    let _ = writeln!(out);
    let _ = writeln!(out, "status:    {}", bundle.status.as_str());
    let _ = writeln!(out, "method:    {}", meta.analysis_method);
    let _ = writeln!(out, "token:     {}", meta.token_kind);
    let _ = writeln!(out, "size:      {}", meta.size.display_size);
    let _ = writeln!(out, "files:     {} included, {} excluded", meta.files, bundle.excluded.len());
    if let Some(branch) = &meta.default_branch {
        let _ = writeln!(out, "branch:    {branch}");
    }
    if let Some(license) = &meta.license {
        let _ = writeln!(out, "license:   {license}");
    }

    if !meta.languages.is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(out, "## Languages");
        for lang in &meta.languages {
            let _ = writeln!(out, "- {} {:.1}% ({} files)", lang.name, lang.share, lang.files);
        }
    }

    if !meta.deps.is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(out, "## Dependencies");
        let _ = writeln!(out, "{}", meta.deps.join(", "));
    }

    if !meta.main.is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(out, "## Entry points");
        for path in &meta.main {
            let _ = writeln!(out, "- {path}");
        }
    }

    if !bundle.files.is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(out, "## Files by priority");
        for file in bundle.files.iter().take(MAX_LISTED_FILES) {
            let _ = writeln!(out, "{:>6}  {}  (~{} tokens)", file.priority, file.path, file.tokens);
        }
        if bundle.files.len() > MAX_LISTED_FILES {
            let _ = writeln!(out, "        ... {} more", bundle.files.len() - MAX_LISTED_FILES);
        }
    }

    let _ = writeln!(out);
    let _ = writeln!(out, "## Acquisition");
    for attempt in &bundle.acquisition.attempts {
        let _ = write!(out, "- {} {}", attempt.method, attempt.outcome);
        if let Some(detail) = &attempt.detail {
            let _ = write!(out, ": {detail}");
        }
        let _ = writeln!(out);
    }

    if !bundle.warnings.is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(out, "## Warnings");
        for warning in &bundle.warnings {
            let _ = writeln!(out, "- {}", warning.message);
        }
    }

    out
}
