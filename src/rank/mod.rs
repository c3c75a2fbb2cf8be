//! File priority scoring

use crate::domain::RankingWeights;
use crate::infer::languages::{detect, LanguageRole};
use crate::infer::manifests::ManifestKind;
use crate::utils::{depth, file_name};
use once_cell::sync::Lazy;
use regex::Regex;

/// Filenames that usually start a program.
const ENTRYPOINT_NAMES: &[&str] = &[
    "main.py",
    "__main__.py",
    "app.py",
    "server.py",
    "manage.py",
    "wsgi.py",
    "asgi.py",
    "run.py",
    "cli.py",
    "index.js",
    "index.ts",
    "main.js",
    "main.ts",
    "app.js",
    "app.ts",
    "server.js",
    "server.ts",
    "main.rs",
    "main.go",
    "main.java",
    "application.java",
    "program.cs",
    "main.c",
    "main.cpp",
    "main.kt",
    "main.swift",
    "main.dart",
    "index.php",
    "app.rb",
    "config.ru",
];

/// Build and project files that are not dependency manifests.
const PROJECT_FILES: &[&str] = &[
    "dockerfile",
    "docker-compose.yml",
    "docker-compose.yaml",
    "compose.yaml",
    "makefile",
    "cmakelists.txt",
    "setup.cfg",
    "tsconfig.json",
    "go.work",
];

const SOURCE_DIRS: &[&str] = &["src", "lib", "app", "cmd", "pkg", "internal", "source"];

const TEST_DIRS: &[&str] = &["test", "tests", "__tests__", "spec", "specs", "testing", "e2e"];

static DEFINITION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        concat!(
            r"(?m)^\s*(?:pub(?:\([a-z]+\))?\s+|export\s+(?:default\s+)?|",
            r"public\s+|private\s+|async\s+)*",
            r"(?:def|class|fn|func|function|interface|struct|impl|trait|enum|module|object)\b",
        ),
    )
    .unwrap()
});

static IMPORTS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        concat!(
            r"(?m)^\s*(?:import\s|from\s+\S+\s+import\s|use\s+\w|require\(|#include\s|",
            r"using\s+\w|package\s+\w|const\s+\w+\s*=\s*require\()",
        ),
    )
    .unwrap()
});

pub fn is_entrypoint(path: &str) -> bool {
    ENTRYPOINT_NAMES.contains(&file_name(path).to_ascii_lowercase().as_str())
}

pub fn is_readme(path: &str) -> bool {
    file_name(path).to_ascii_lowercase().starts_with("readme")
}

fn is_project_file(path: &str) -> bool {
    ManifestKind::recognize(path).is_some()
        || PROJECT_FILES.contains(&file_name(path).to_ascii_lowercase().as_str())
}

pub fn is_test_file(path: &str) -> bool {
    let lowered = path.to_ascii_lowercase();
    let mut segments: Vec<&str> = lowered.split('/').collect();
    let name = segments.pop().unwrap_or("");
    if segments.iter().any(|segment| TEST_DIRS.contains(segment)) {
        return true;
    }
    let stem = name.split('.').next().unwrap_or("");
    stem.starts_with("test_")
        || stem.ends_with("_test")
        || stem.ends_with("_spec")
        || name.contains(".test.")
        || name.contains(".spec.")
        || (stem.ends_with("test") && stem.len() > 4 && file_name(path).contains("Test"))
}

/// Size adjustment: tiny files carry little signal, huge ones are usually data.
fn size_factor(size: u64) -> i64 {
    match size {
        0 => -50,
        1..=99 => -30,
        100..=5_000 => 30,
        5_001..=20_000 => 10,
        20_001..=50_000 => -10,
        _ => -30,
    }
}

fn content_bonus(text: &str, weights: &RankingWeights) -> i64 {
    let mut bonus = 0;
    if text.chars().filter(|c| !c.is_whitespace()).take(51).count() > 50 {
        bonus += weights.nontrivial_content;
    }
    if DEFINITION.is_match(text) {
        bonus += weights.declares_symbols;
    }
    if IMPORTS.is_match(text) {
        bonus += weights.has_imports;
    }
    bonus
}

/// Score a file from its path, size and (when fetched) text content.
pub fn score(path: &str, size: u64, content: Option<&str>, weights: &RankingWeights) -> i64 {
    let role = detect(path).map(|(_, role)| role);
    let mut priority = match role {
        Some(LanguageRole::Primary) => weights.primary_language,
        Some(LanguageRole::Build) => weights.build_definition,
        Some(LanguageRole::Config) => weights.config,
        Some(LanguageRole::Documentation) => weights.documentation,
        None => weights.unknown,
    };

    if is_entrypoint(path) {
        priority += weights.entrypoint;
    }
    if is_project_file(path) {
        priority += weights.manifest;
    }
    if is_readme(path) {
        priority += weights.readme;
    }
    let first_dir = path.split('/').next().unwrap_or("").to_ascii_lowercase();
    if depth(path) > 0 && SOURCE_DIRS.contains(&first_dir.as_str()) {
        priority += weights.source_dir;
    }
    if is_test_file(path) {
        priority -= weights.test_penalty;
    }

    let depth_penalty = (depth(path) as i64).saturating_mul(weights.depth_penalty);
    priority -= depth_penalty.min(weights.max_depth_penalty);
    priority += size_factor(size);

    if let Some(text) = content {
        priority += content_bonus(text, weights);
    }

    priority.max(weights.floor)
}

/// Path-and-size-only score used before content is fetched.
pub fn path_priority(path: &str, size: u64, weights: &RankingWeights) -> i64 {
    score(path, size, None, weights)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entrypoint_source_outranks_readme() {
        let w = RankingWeights::default();
        let source = "import os\n\ndef main():\n    print(os.getcwd())\n";
        let main = score("src/main.py", 2048, Some(source), &w);
        let readme = score("README.md", 500, Some("# Project\n\nSome words."), &w);
        assert!(main > readme, "main={main} readme={readme}");
        assert_eq!(path_priority("src/main.py", 2048, &w), 600 + 400 + 50 - 25 + 30);
        assert_eq!(path_priority("README.md", 500, &w), 200 + 150 + 30);
    }

    #[test]
    fn tests_and_deep_files_are_penalized() {
        let w = RankingWeights::default();
        let shallow = path_priority("src/parser.rs", 1000, &w);
        let deep = path_priority("src/a/b/c/d/e/f/g/parser.rs", 1000, &w);
        let test = path_priority("tests/parser_test.rs", 1000, &w);
        assert!(shallow > deep);
        assert!(shallow > test);
        assert_eq!(shallow - deep, 150 - 25);
    }

    #[test]
    fn manifests_get_bonus() {
        let w = RankingWeights::default();
        assert_eq!(path_priority("package.json", 800, &w), 300 + 200 + 30);
        assert_eq!(path_priority("Dockerfile", 300, &w), 500 + 200 + 30);
    }

    #[test]
    fn floor_applies() {
        let w = RankingWeights::default();
        assert_eq!(path_priority("tests/fixtures/a/b/c/empty.bin2", 0, &w), w.floor);
    }

    #[test]
    fn test_file_detection() {
        assert!(is_test_file("tests/integration.rs"));
        assert!(is_test_file("pkg/parser_test.go"));
        assert!(is_test_file("src/test_utils.py"));
        assert!(is_test_file("web/app.spec.ts"));
        assert!(is_test_file("src/main/java/ParserTest.java"));
        assert!(!is_test_file("src/latest.py"));
        assert!(!is_test_file("src/contest.rs"));
    }

    #[test]
    fn content_signals_add_up() {
        let w = RankingWeights::default();
        let text = concat!(
            "use std::io;\n\npub fn run() -> io::Result<()> {\n",
            "    println!(\"hello world from the runner\");\n    Ok(())\n}\n",
        );
        assert_eq!(content_bonus(text, &w), 20 + 40 + 20);
        assert_eq!(content_bonus("x = 1", &w), 0);
    }
}
