//! Shared helpers: path handling, noise classification, decoding and small text utilities.

pub mod classify;
pub mod encoding;
pub mod hashing;
pub mod paths;
pub mod text;

pub use classify::{is_likely_generated, is_likely_minified, is_lock_file, is_vendored, path_noise};
pub use encoding::{decode_text, is_binary};
pub use hashing::short_digest;
pub use paths::{depth, file_name, normalize_path, strip_archive_root};
pub use text::{estimate_tokens, format_size};
