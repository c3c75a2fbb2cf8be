//! Zip snapshot expansion into file records.

use crate::domain::{AcquisitionMethod, FileRecord};
use crate::utils::strip_archive_root;
use std::io::{Cursor, Read};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ArchiveError {
    #[error("corrupt archive: {0}")]
    Corrupt(String),

    #[error("archive expands to more than {limit} bytes")]
    TooLarge { expanded: u64, limit: u64 },
}

impl From<zip::result::ZipError> for ArchiveError {
    fn from(err: zip::result::ZipError) -> Self {
        Self::Corrupt(err.to_string())
    }
}

/// Expand a snapshot held in memory.
///
/// Entries lose their single wrapping directory; directories themselves are
/// skipped. `max_expanded_bytes` bounds the total uncompressed size.
pub fn extract_archive(
    bytes: &[u8],
    max_expanded_bytes: u64,
) -> Result<Vec<FileRecord>, ArchiveError> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes))?;
    let mut records = Vec::with_capacity(archive.len());
    let mut expanded: u64 = 0;

    for index in 0..archive.len() {
        let mut entry = archive.by_index(index)?;
        if entry.is_dir() {
            continue;
        }
        let Some(path) = strip_archive_root(entry.name()) else {
            continue;
        };

        expanded = expanded.saturating_add(entry.size());
        if expanded > max_expanded_bytes {
            return Err(ArchiveError::TooLarge { expanded, limit: max_expanded_bytes });
        }

        let mut content = Vec::with_capacity(entry.size() as usize);
        entry
            .read_to_end(&mut content)
            .map_err(|e| ArchiveError::Corrupt(format!("{path}: {e}")))?;
        records.push(FileRecord::with_content(path, content, AcquisitionMethod::Archive));
    }

    records.sort_by(|a, b| a.path.cmp(&b.path));
    tracing::debug!(files = records.len(), expanded, "archive expanded");
    Ok(records)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::io::Write;
    use zip::write::SimpleFileOptions;

    /// Build an in-memory zip with a GitHub-style wrapping directory.
    pub(crate) fn build_zip(entries: &[(&str, &[u8])]) -> Vec<u8> {
        let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default();
        writer.add_directory("octo-hello-abc123/", options).expect("dir");
        for (path, content) in entries {
            writer.start_file(format!("octo-hello-abc123/{path}"), options).expect("start");
            writer.write_all(content).expect("write");
        }
        writer.finish().expect("finish").into_inner()
    }

    #[test]
    fn extracts_files_and_strips_root() {
        let zip = build_zip(&[("README.md", b"# hi"), ("src/main.py", b"print('x')")]);
        let records = extract_archive(&zip, 1 << 20).expect("extract");
        let paths: Vec<&str> = records.iter().map(|r| r.path.as_str()).collect();
        assert_eq!(paths, vec!["README.md", "src/main.py"]);
        assert_eq!(records[1].content.as_deref(), Some(&b"print('x')"[..]));
        assert_eq!(records[1].size, 10);
        assert!(records.iter().all(|r| r.source == AcquisitionMethod::Archive));
    }

    #[test]
    fn rejects_garbage() {
        assert!(matches!(extract_archive(b"not a zip", 1 << 20), Err(ArchiveError::Corrupt(_))));
    }

    #[test]
    fn enforces_expanded_limit() {
        let big = vec![b'a'; 4096];
        let zip = build_zip(&[("a.txt", &big), ("b.txt", &big)]);
        assert!(matches!(extract_archive(&zip, 5000), Err(ArchiveError::TooLarge { .. })));
    }
}
