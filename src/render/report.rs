//! Writing bundles to disk.

use super::bundle::RepositoryBundle;
use super::summary::render_summary;
use crate::domain::OutputFormat;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// Write the bundle as `{owner}_{repo}.json` and/or `.txt` under `output_dir`.
///
/// Returns the written paths in a stable order (JSON first).
pub fn write_bundle(
    output_dir: &Path,
    bundle: &RepositoryBundle,
    format: OutputFormat,
) -> Result<Vec<PathBuf>> {
    std::fs::create_dir_all(output_dir)
        .with_context(|| format!("Failed creating output directory: {}", output_dir.display()))?;

    let stem = bundle.file_stem();
    let mut written = Vec::new();

    if matches!(format, OutputFormat::Json | OutputFormat::Both) {
        let path = output_dir.join(format!("{stem}.json"));
        let json = serde_json::to_string_pretty(bundle).context("Failed serializing bundle")?;
        std::fs::write(&path, json)
            .with_context(|| format!("Failed writing {}", path.display()))?;
        written.push(path);
    }

    if matches!(format, OutputFormat::Text | OutputFormat::Both) {
        let path = output_dir.join(format!("{stem}.txt"));
        std::fs::write(&path, render_summary(bundle))
            .with_context(|| format!("Failed writing {}", path.display()))?;
        written.push(path);
    }

    tracing::info!(files = written.len(), dir = %output_dir.display(), "bundle written");
    Ok(written)
}
