//! Token estimation and human-readable sizes

/// Estimate tokens as characters / 4.
pub fn estimate_tokens(text: &str) -> usize {
    text.chars().count() / 4
}

/// Render a byte count as `512 B`, `1.5 KB`, `12.0 MB`.
pub fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["KB", "MB", "GB", "TB"];
    if bytes < 1024 {
        return format!("{bytes} B");
    }
    let mut value = bytes as f64 / 1024.0;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{value:.1} {}", UNITS[unit])
}
