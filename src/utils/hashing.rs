//! Stable short digests

use sha2::{Digest, Sha256};

/// First 16 hex characters of the SHA-256 of `input`.
pub fn short_digest(input: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    let digest = hasher.finalize();
    format!("{:x}", digest)[..16].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digest_is_stable_and_short() {
        let a = short_digest("ghp_example");
        assert_eq!(a.len(), 16);
        assert_eq!(a, short_digest("ghp_example"));
        assert_ne!(a, short_digest("ghp_example2"));
    }
}
