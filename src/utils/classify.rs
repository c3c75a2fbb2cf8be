//! Path and content classification for noise: lock files, vendored trees,
//! build output, binaries, minified bundles and generated code.

use crate::domain::NoiseKind;
use once_cell::sync::Lazy;
use regex::Regex;

use super::paths::file_name;

/// Header markers that identify generated files.
static GENERATED_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    vec![
        Regex::new(r"(?i)auto-?generated").unwrap(),
        Regex::new(r"(?i)do not edit").unwrap(),
        Regex::new(r"(?i)code generated by").unwrap(),
        Regex::new(r"@generated\b").unwrap(),
    ]
});

const MINIFIED_INDICATORS: &[&str] = &[".min.", ".bundle.", ".packed."];

const GENERATED_SUFFIXES: &[&str] =
    &[".pb.go", "_pb2.py", "_pb2_grpc.py", ".g.dart", ".freezed.dart", ".designer.cs"];

const VCS_DIRS: &[&str] = &[".git", ".svn", ".hg", ".bzr"];

const OS_ARTIFACTS: &[&str] = &[".ds_store", "thumbs.db", "desktop.ini"];

const VENDOR_DIRS: &[&str] = &[
    "node_modules",
    "vendor",
    "vendors",
    "third_party",
    "third-party",
    "thirdparty",
    "bower_components",
    "jspm_packages",
    "site-packages",
];

const BUILD_DIRS: &[&str] = &[
    "build",
    "dist",
    "target",
    "out",
    "bin",
    "obj",
    "__pycache__",
    ".venv",
    "venv",
    "env",
    ".tox",
    ".mypy_cache",
    ".pytest_cache",
    ".next",
    ".nuxt",
    ".gradle",
    ".idea",
    ".vscode",
    "coverage",
    ".cache",
    ".terraform",
    "cmake-build-debug",
];

const BINARY_EXTENSIONS: &[&str] = &[
    // executables and libraries
    "exe", "dll", "so", "dylib", "a", "lib", "o", "obj", "bin", "class", "jar", "war", "pyc",
    "pyo", "wasm", "pdb",
    // archives
    "zip", "tar", "gz", "tgz", "bz2", "xz", "7z", "rar", "whl", "egg", "deb", "rpm", "dmg", "iso",
    // images
    "png", "jpg", "jpeg", "gif", "bmp", "ico", "icns", "tif", "tiff", "webp", "psd", "svgz",
    // media
    "mp3", "mp4", "wav", "ogg", "flac", "avi", "mov", "mkv", "webm",
    // fonts
    "woff", "woff2", "ttf", "otf", "eot",
    // documents and data blobs
    "pdf", "doc", "docx", "xls", "xlsx", "ppt", "pptx", "db", "sqlite", "sqlite3", "parquet",
    "pkl", "npy", "npz", "h5", "onnx", "pt", "ckpt", "safetensors",
];

/// Classify a repository-relative path as noise, if it is.
pub fn path_noise(path: &str) -> Option<NoiseKind> {
    let lowered = path.to_ascii_lowercase();
    let segments: Vec<&str> = lowered.split('/').collect();
    let (dirs, name) = segments.split_at(segments.len().saturating_sub(1));
    let name = name.first().copied().unwrap_or("");

    if dirs.iter().any(|d| VCS_DIRS.contains(d)) || name == ".gitmodules" {
        return Some(NoiseKind::VcsMetadata);
    }
    if OS_ARTIFACTS.contains(&name) {
        return Some(NoiseKind::OsArtifact);
    }
    if is_lock_file(&lowered) {
        return Some(NoiseKind::LockFile);
    }
    if is_vendored(&lowered) {
        return Some(NoiseKind::Vendored);
    }
    if dirs.iter().any(|d| BUILD_DIRS.contains(d) || d.ends_with(".egg-info")) {
        return Some(NoiseKind::BuildOutput);
    }
    if let Some((_, ext)) = name.rsplit_once('.') {
        if BINARY_EXTENSIONS.contains(&ext) {
            return Some(NoiseKind::BinaryExtension);
        }
    }
    if MINIFIED_INDICATORS.iter().any(|indicator| name.contains(indicator)) {
        return Some(NoiseKind::Minified);
    }
    if GENERATED_SUFFIXES.iter().any(|suffix| name.ends_with(suffix)) {
        return Some(NoiseKind::Generated);
    }
    None
}

/// Check whether text looks minified: a first line longer than `max_line_length`.
pub fn is_likely_minified(text: &str, max_line_length: usize) -> bool {
    match text.lines().next() {
        Some(first_line) => first_line.len() > max_line_length,
        None => false,
    }
}

/// Check the leading comment block of a file for generator markers.
pub fn is_likely_generated(text: &str) -> bool {
    let header: String = text.lines().take(5).collect::<Vec<_>>().join("\n");
    GENERATED_PATTERNS.iter().any(|pattern| pattern.is_match(&header))
}

/// Check if a path names a dependency lock file.
pub fn is_lock_file(path: &str) -> bool {
    let name = file_name(path).to_ascii_lowercase();

    matches!(
        name.as_str(),
        "package-lock.json"
            | "npm-shrinkwrap.json"
            | "yarn.lock"
            | "pnpm-lock.yaml"
            | "bun.lockb"
            | "poetry.lock"
            | "pipfile.lock"
            | "uv.lock"
            | "cargo.lock"
            | "gemfile.lock"
            | "composer.lock"
            | "go.sum"
            | "pubspec.lock"
            | "packages.lock.json"
    )
}

/// Check if a path lies inside a vendored or third-party directory.
pub fn is_vendored(path: &str) -> bool {
    let lowered = path.to_ascii_lowercase();
    let mut segments: Vec<&str> = lowered.split('/').collect();
    segments.pop();
    segments.iter().any(|segment| VENDOR_DIRS.contains(segment))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_likely_minified() {
        assert!(is_likely_minified(&"a".repeat(6000), 5000));
        assert!(!is_likely_minified("fn main() {}\n", 5000));
        assert!(!is_likely_minified("", 5000));
    }

    #[test]
    fn test_is_lock_file() {
        assert!(is_lock_file("package-lock.json"));
        assert!(is_lock_file("web/yarn.lock"));
        assert!(is_lock_file("Cargo.lock"));
        assert!(!is_lock_file("package.json"));
    }

    #[test]
    fn test_is_vendored() {
        assert!(is_vendored("vendor/foo/bar.js"));
        assert!(is_vendored("node_modules/react/index.js"));
        assert!(is_vendored("third_party/lib.c"));
        assert!(!is_vendored("src/main.rs"));
        assert!(!is_vendored("vendor"));
    }

    #[test]
    fn test_is_likely_generated() {
        assert!(is_likely_generated("// This file is auto-generated. Do not edit.\nconst X = 1;"));
        assert!(is_likely_generated("// Code generated by protoc-gen-go. DO NOT EDIT.\n"));
        assert!(!is_likely_generated("fn main() {}"));
    }

    #[test]
    fn test_path_noise_kinds() {
        assert_eq!(path_noise(".git/HEAD"), Some(NoiseKind::VcsMetadata));
        assert_eq!(path_noise("assets/.DS_Store"), Some(NoiseKind::OsArtifact));
        assert_eq!(path_noise("yarn.lock"), Some(NoiseKind::LockFile));
        assert_eq!(path_noise("node_modules/x/index.js"), Some(NoiseKind::Vendored));
        assert_eq!(path_noise("target/debug/app.d"), Some(NoiseKind::BuildOutput));
        assert_eq!(path_noise("docs/logo.PNG"), Some(NoiseKind::BinaryExtension));
        assert_eq!(path_noise("static/app.min.js"), Some(NoiseKind::Minified));
        assert_eq!(path_noise("api/service.pb.go"), Some(NoiseKind::Generated));
        assert_eq!(path_noise("src/main.py"), None);
        assert_eq!(path_noise("build.gradle"), None);
    }
}
