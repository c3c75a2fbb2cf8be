//! Language mix, dependency and entry-point inference over triaged files.

pub mod languages;
pub mod manifests;

use crate::domain::TriagedFile;
use crate::rank::is_entrypoint;
use crate::utils::decode_text;
use serde::Serialize;
use std::collections::{BTreeSet, HashMap};

pub use languages::{detect, language_of, LanguageRole};
pub use manifests::ManifestKind;

const MAX_ENTRY_POINTS: usize = 10;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LanguageStat {
    pub name: String,
    pub bytes: u64,
    pub files: usize,
    /// Percentage of counted bytes, one decimal.
    pub share: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Inference {
    pub languages: Vec<LanguageStat>,
    pub dependencies: BTreeSet<String>,
    pub entry_points: Vec<String>,
}

/// Run every inference over the included files. Never fails.
pub fn infer(files: &[TriagedFile]) -> Inference {
    Inference {
        languages: language_breakdown(files),
        dependencies: dependencies(files),
        entry_points: entry_points(files),
    }
}

/// Bytes per language over included program and build files, largest first.
///
/// Ties break by file count, then by name.
pub fn language_breakdown(files: &[TriagedFile]) -> Vec<LanguageStat> {
    let mut totals: HashMap<&'static str, (u64, usize)> = HashMap::new();
    for file in files.iter().filter(|f| f.included()) {
        let Some((name, role)) = detect(file.path()) else {
            continue;
        };
        if !languages::counts_toward_mix(role) {
            continue;
        }
        let entry = totals.entry(name).or_insert((0, 0));
        entry.0 += file.record.size;
        entry.1 += 1;
    }

    let total_bytes: u64 = totals.values().map(|(bytes, _)| *bytes).sum();
    let mut stats: Vec<LanguageStat> = totals
        .into_iter()
        .map(|(name, (bytes, files))| LanguageStat {
            name: name.to_string(),
            bytes,
            files,
            share: if total_bytes == 0 {
                0.0
            } else {
                ((bytes as f64 / total_bytes as f64) * 1000.0).round() / 10.0
            },
        })
        .collect();
    stats.sort_by(|a, b| {
        b.bytes.cmp(&a.bytes).then_with(|| b.files.cmp(&a.files)).then_with(|| a.name.cmp(&b.name))
    });
    stats
}

/// Declared dependencies across every recognized manifest with content.
pub fn dependencies(files: &[TriagedFile]) -> BTreeSet<String> {
    let mut names = BTreeSet::new();
    for file in files.iter().filter(|f| f.included()) {
        let Some(kind) = ManifestKind::recognize(file.path()) else {
            continue;
        };
        let Some(bytes) = file.record.content.as_deref() else {
            tracing::debug!(path = file.path(), "manifest without content skipped");
            continue;
        };
        let (text, _) = decode_text(bytes);
        let parsed = kind.parse(&text);
        tracing::debug!(path = file.path(), ?kind, count = parsed.len(), "manifest parsed");
        names.extend(parsed.into_iter().filter(|name| manifests::is_plausible_name(name)));
    }
    names
}

/// Entry-point paths in triage order.
pub fn entry_points(files: &[TriagedFile]) -> Vec<String> {
    files
        .iter()
        .filter(|f| f.included() && is_entrypoint(f.path()))
        .take(MAX_ENTRY_POINTS)
        .map(|f| f.path().to_string())
        .collect()
}
