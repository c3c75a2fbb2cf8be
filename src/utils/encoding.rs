//! Binary detection and text decoding for fetched file bytes.
//!
//! Decoding order:
//! - BOM markers (UTF-8, UTF-16 LE/BE)
//! - strict UTF-8
//! - chardetng guess, decoded with replacement characters

use chardetng::EncodingDetector;
use encoding_rs::{Encoding, UTF_16BE, UTF_16LE, UTF_8};

const SAMPLE_SIZE: usize = 8192;

/// Detect if a byte buffer is binary (not text).
///
/// Uses two heuristics on the first 8 KiB:
/// 1. Null byte check (strong binary indicator)
/// 2. Ratio of printable ASCII bytes (< 70% = likely binary)
///
/// A UTF-16 BOM short-circuits to text since UTF-16 is full of NULs.
pub fn is_binary(bytes: &[u8]) -> bool {
    let sample = &bytes[..bytes.len().min(SAMPLE_SIZE)];
    if sample.is_empty() {
        return false;
    }
    if sample.starts_with(&[0xff, 0xfe]) || sample.starts_with(&[0xfe, 0xff]) {
        return false;
    }
    if sample.contains(&0) {
        return true;
    }

    // Valid UTF-8 with multibyte characters is text even when it is mostly non-ASCII.
    if std::str::from_utf8(sample).is_ok() {
        return false;
    }

    let printable_count = sample
        .iter()
        .filter(|&&b| (32..=126).contains(&b) || b == 9 || b == 10 || b == 13)
        .count();

    (printable_count as f64 / sample.len() as f64) < 0.70
}

/// Decode bytes into text, returning the content and the encoding label used.
pub fn decode_text(bytes: &[u8]) -> (String, &'static str) {
    if let Some((encoding, bom_len)) = Encoding::for_bom(bytes) {
        let (decoded, _) = encoding.decode_without_bom_handling(&bytes[bom_len..]);
        let label = if encoding == UTF_8 {
            "utf-8-sig"
        } else if encoding == UTF_16LE {
            "utf-16-le"
        } else if encoding == UTF_16BE {
            "utf-16-be"
        } else {
            encoding.name()
        };
        return (decoded.into_owned(), label);
    }

    if let Ok(text) = std::str::from_utf8(bytes) {
        return (text.to_string(), "utf-8");
    }

    let mut detector = EncodingDetector::new();
    detector.feed(&bytes[..bytes.len().min(SAMPLE_SIZE)], bytes.len() <= SAMPLE_SIZE);
    let encoding = detector.guess(None, true);
    let (decoded, used, _had_errors) = encoding.decode(bytes);
    (decoded.into_owned(), used.name())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_binary_null_byte() {
        assert!(is_binary(&[0x00, 0x01, 0x02]));
    }

    #[test]
    fn test_is_not_binary_text() {
        assert!(!is_binary(b"Normal text file\n"));
        assert!(!is_binary("Grüße, 世界".as_bytes()));
        assert!(!is_binary(b""));
    }

    #[test]
    fn test_is_binary_control_noise() {
        let noise: Vec<u8> =
            (0u8..32).filter(|b| *b != 0).cycle().take(200).chain([0xc3]).collect();
        assert!(is_binary(&noise));
    }

    #[test]
    fn test_decode_utf8() {
        let (text, enc) = decode_text("Test content 🚀".as_bytes());
        assert_eq!(text, "Test content 🚀");
        assert_eq!(enc, "utf-8");
    }

    #[test]
    fn test_decode_utf8_bom() {
        let mut bytes = vec![0xef, 0xbb, 0xbf];
        bytes.extend_from_slice(b"Hello");
        let (text, enc) = decode_text(&bytes);
        assert_eq!(text, "Hello");
        assert_eq!(enc, "utf-8-sig");
    }

    #[test]
    fn test_decode_legacy_falls_back() {
        // "café" in windows-1252
        let (text, _) = decode_text(&[0x63, 0x61, 0x66, 0xe9]);
        assert!(text.starts_with("caf"));
        assert_eq!(text.chars().count(), 4);
    }
}
