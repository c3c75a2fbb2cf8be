//! File triage: separate source from noise and order what remains by priority.

use crate::domain::{Config, FileRecord, NoiseKind, RankingWeights, TriageReason, TriagedFile};
use crate::infer::language_of;
use crate::rank;
use crate::utils::{decode_text, is_binary, is_likely_generated, is_likely_minified, path_noise};
use globset::{Glob, GlobSet, GlobSetBuilder};
use rayon::prelude::*;
use std::cmp::Ordering;

const MAX_LINE_LENGTH: usize = 5000;
/// Bytes of content inspected for generator markers and scoring signals.
const CONTENT_SAMPLE: usize = 16 * 1024;

/// Rules applied by [`triage`].
#[derive(Debug, Clone)]
pub struct TriagePolicy {
    max_file_bytes: u64,
    exclude_globs: Vec<String>,
    exclude_set: GlobSet,
    weights: RankingWeights,
}

impl Default for TriagePolicy {
    fn default() -> Self {
        Self::new(1_048_576)
    }
}

impl TriagePolicy {
    pub fn new(max_file_bytes: u64) -> Self {
        Self {
            max_file_bytes,
            exclude_globs: Vec::new(),
            exclude_set: GlobSet::empty(),
            weights: RankingWeights::default(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.max_file_bytes)
            .exclude_globs(config.exclude_globs.clone())
            .weights(config.ranking.clone())
    }

    /// Set user exclusion globs. Invalid patterns are logged and ignored.
    pub fn exclude_globs(mut self, globs: Vec<String>) -> Self {
        let mut builder = GlobSetBuilder::new();
        for pattern in &globs {
            match Glob::new(pattern) {
                Ok(glob) => {
                    builder.add(glob);
                }
                Err(e) => tracing::warn!("Ignoring invalid exclude glob '{}': {}", pattern, e),
            }
        }
        self.exclude_set = builder.build().unwrap_or_else(|e| {
            tracing::warn!("Failed to compile exclude globs: {}", e);
            GlobSet::empty()
        });
        self.exclude_globs = globs;
        self
    }

    pub fn weights(mut self, weights: RankingWeights) -> Self {
        self.weights = weights;
        self
    }

    pub fn max_file_bytes(&self) -> u64 {
        self.max_file_bytes
    }

    pub fn ranking_weights(&self) -> &RankingWeights {
        &self.weights
    }

    /// Noise verdict from the path alone, including user exclusions.
    pub fn path_noise(&self, path: &str) -> Option<NoiseKind> {
        path_noise(path)
            .or_else(|| self.exclude_set.is_match(path).then_some(NoiseKind::UserExcluded))
    }

    /// Triage one record.
    pub fn classify(&self, record: FileRecord) -> TriagedFile {
        let language = language_of(&record.path);

        let sample =
            record.content.as_deref().map(|bytes| &bytes[..bytes.len().min(CONTENT_SAMPLE)]);
        let text = match sample {
            Some(bytes) if is_binary(bytes) => {
                let kind = Some(NoiseKind::BinaryContent);
                return excluded(record, TriageReason::NonSource, kind, language);
            }
            Some(bytes) => Some(decode_text(bytes).0),
            None => None,
        };

        if let Some(kind) = self.path_noise(&record.path) {
            return excluded(record, TriageReason::NonSource, Some(kind), language);
        }
        if let Some(text) = text.as_deref() {
            if is_likely_minified(text, MAX_LINE_LENGTH) {
                let kind = Some(NoiseKind::Minified);
                return excluded(record, TriageReason::NonSource, kind, language);
            }
            if is_likely_generated(text) {
                let kind = Some(NoiseKind::Generated);
                return excluded(record, TriageReason::NonSource, kind, language);
            }
        }
        if record.size > self.max_file_bytes {
            return excluded(record, TriageReason::TooLarge, None, language);
        }

        let priority = rank::score(&record.path, record.size, text.as_deref(), &self.weights);
        TriagedFile { record, reason: TriageReason::Included, noise: None, language, priority }
    }
}

fn excluded(
    record: FileRecord,
    reason: TriageReason,
    noise: Option<NoiseKind>,
    language: Option<&'static str>,
) -> TriagedFile {
    TriagedFile { record, reason, noise, language, priority: 0 }
}

/// Included files first by priority (desc) then path; excluded files after, by path.
fn triage_order(a: &TriagedFile, b: &TriagedFile) -> Ordering {
    match (a.included(), b.included()) {
        (true, false) => Ordering::Less,
        (false, true) => Ordering::Greater,
        (true, true) => b.priority.cmp(&a.priority).then_with(|| a.path().cmp(b.path())),
        (false, false) => a.path().cmp(b.path()),
    }
}

/// Triage every record. Output has one entry per input, already ordered.
pub fn triage(records: Vec<FileRecord>, policy: &TriagePolicy) -> Vec<TriagedFile> {
    let mut files: Vec<TriagedFile> =
        records.into_par_iter().map(|record| policy.classify(record)).collect();
    files.sort_by(triage_order);

    let included = files.iter().filter(|f| f.included()).count();
    tracing::info!(
        total = files.len(),
        included,
        excluded = files.len() - included,
        "triage complete"
    );
    files
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::AcquisitionMethod;
    use similar_asserts::assert_eq;

    fn record(path: &str, size: usize) -> FileRecord {
        let body = format!("# {path}\n").into_bytes().into_iter().cycle().take(size).collect();
        FileRecord::with_content(path, body, AcquisitionMethod::Archive)
    }

    #[test]
    fn readme_main_and_node_modules_scenario() {
        let files = triage(
            vec![
                record("README.md", 500),
                record("src/main.py", 2048),
                record("node_modules/x/index.js", 10 * 1024),
            ],
            &TriagePolicy::default(),
        );

        assert_eq!(files.len(), 3);
        let paths: Vec<&str> = files.iter().map(|f| f.path()).collect();
        assert_eq!(paths, vec!["src/main.py", "README.md", "node_modules/x/index.js"]);
        assert_eq!(files[2].reason, TriageReason::NonSource);
        assert_eq!(files[2].noise, Some(NoiseKind::Vendored));
        assert!(files[0].priority > files[1].priority);
    }

    #[test]
    fn size_ceiling_applies_after_noise_rules() {
        let policy = TriagePolicy::new(1000);
        let files = triage(vec![record("src/big.rs", 2000), record("dist/big.js", 2000)], &policy);
        let big_rs = files.iter().find(|f| f.path() == "src/big.rs").expect("rs");
        let big_js = files.iter().find(|f| f.path() == "dist/big.js").expect("js");
        assert_eq!(big_rs.reason, TriageReason::TooLarge);
        assert_eq!(big_js.reason, TriageReason::NonSource);
    }

    #[test]
    fn binary_content_is_non_source() {
        let mut bytes = b"PK".to_vec();
        bytes.extend([0u8; 64]);
        let files = triage(
            vec![FileRecord::with_content("data/blob", bytes, AcquisitionMethod::Archive)],
            &TriagePolicy::default(),
        );
        assert_eq!(files[0].noise, Some(NoiseKind::BinaryContent));
    }

    #[test]
    fn content_markers_flag_generated_and_minified() {
        let generated = FileRecord::with_content(
            "src/schema.ts",
            b"// Code generated by tool. DO NOT EDIT.\nexport const x = 1;\n".to_vec(),
            AcquisitionMethod::Archive,
        );
        let minified =
            FileRecord::with_content("static/app.js", vec![b'a'; 6000], AcquisitionMethod::Archive);
        let files = triage(vec![generated, minified], &TriagePolicy::default());
        assert!(files.iter().all(|f| f.reason == TriageReason::NonSource));
    }

    #[test]
    fn user_globs_exclude() {
        let policy = TriagePolicy::default().exclude_globs(vec!["docs/**".into(), "[".into()]);
        let files = triage(vec![record("docs/guide.md", 300), record("src/lib.rs", 300)], &policy);
        let guide = files.iter().find(|f| f.path() == "docs/guide.md").expect("guide");
        assert_eq!(guide.noise, Some(NoiseKind::UserExcluded));
    }

    #[test]
    fn listed_files_without_content_are_scored_by_path() {
        let files = triage(
            vec![
                FileRecord::listed("src/app.py", 1200, AcquisitionMethod::Api),
                FileRecord::listed("logo.png", 1200, AcquisitionMethod::Api),
            ],
            &TriagePolicy::default(),
        );
        assert!(files[0].included());
        assert_eq!(files[1].noise, Some(NoiseKind::BinaryExtension));
    }

    #[test]
    fn ordering_is_deterministic_and_idempotent() {
        let inputs = vec![
            record("b.py", 300),
            record("a.py", 300),
            record("src/main.go", 300),
            record("vendor/z.go", 300),
            record("vendor/a.go", 300),
            record("README.md", 300),
        ];
        let mut reversed = inputs.clone();
        reversed.reverse();

        let policy = TriagePolicy::default();
        let first = triage(inputs, &policy);
        let second = triage(reversed, &policy);
        assert_eq!(first, second);

        let paths: Vec<&str> = first.iter().map(|f| f.path()).collect();
        assert_eq!(
            paths,
            vec!["src/main.go", "a.py", "b.py", "README.md", "vendor/a.go", "vendor/z.go"]
        );

        let again = triage(first.iter().map(|f| f.record.clone()).collect(), &policy);
        assert_eq!(first, again);
    }
}
