//! Repository-relative path helpers. Paths are always `/`-separated strings.

/// Convert backslashes to forward slashes and drop leading `./` and `/`.
pub fn normalize_path(path: &str) -> String {
    let unified = path.replace('\\', "/");
    let mut trimmed = unified.as_str();
    loop {
        if let Some(rest) = trimmed.strip_prefix("./") {
            trimmed = rest;
        } else if let Some(rest) = trimmed.strip_prefix('/') {
            trimmed = rest;
        } else {
            break;
        }
    }
    trimmed.to_string()
}

/// Final path segment.
pub fn file_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

/// Number of directories above the file (`a/b/c.rs` is depth 2).
pub fn depth(path: &str) -> usize {
    path.matches('/').count()
}

/// Drop the single top-level directory archive snapshots wrap their entries in
/// (`owner-repo-sha/src/lib.rs` becomes `src/lib.rs`). Returns `None` for the root itself.
pub fn strip_archive_root(entry_name: &str) -> Option<String> {
    let normalized = normalize_path(entry_name);
    let (_, rest) = normalized.split_once('/')?;
    if rest.is_empty() {
        None
    } else {
        Some(rest.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_path() {
        assert_eq!(normalize_path("src\\cli\\mod.rs"), "src/cli/mod.rs");
        assert_eq!(normalize_path("./src/main.rs"), "src/main.rs");
        assert_eq!(normalize_path("/README.md"), "README.md");
    }

    #[test]
    fn test_depth_and_name() {
        assert_eq!(depth("README.md"), 0);
        assert_eq!(depth("src/app/main.py"), 2);
        assert_eq!(file_name("src/app/main.py"), "main.py");
        assert_eq!(file_name("Makefile"), "Makefile");
    }

    #[test]
    fn test_strip_archive_root() {
        assert_eq!(
            strip_archive_root("octo-hello-1a2b3c/src/lib.rs").as_deref(),
            Some("src/lib.rs")
        );
        assert_eq!(strip_archive_root("octo-hello-1a2b3c/"), None);
        assert_eq!(strip_archive_root("octo-hello-1a2b3c"), None);
    }
}
