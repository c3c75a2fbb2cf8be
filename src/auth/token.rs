//! Token classification.
//!
//! A credential is classified once, from its textual shape alone, into a
//! [`TokenKind`] that fixes the `Authorization` scheme and the expected quota tier.

use crate::error::AnalyzerError;
use crate::utils::short_digest;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::fmt;

const CLASSIC_PREFIXES: &[&str] = &["ghp_", "gho_", "ghu_", "ghs_", "ghr_"];
const FINE_GRAINED_PREFIX: &str = "github_pat_";

static LEGACY_HEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[0-9a-fA-F]{40}$").unwrap());

/// Strings that look like an attempt at a token but match no known shape.
static TOKEN_LIKE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(gh[a-z]{1,3}_|github_|[A-Za-z0-9_]{20,}$)").unwrap());

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum TokenKind {
    Classic,
    FineGrained,
    Anonymous,
}

impl TokenKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Classic => "classic",
            Self::FineGrained => "fine-grained",
            Self::Anonymous => "anonymous",
        }
    }

    pub fn scheme(self) -> AuthScheme {
        match self {
            Self::Classic => AuthScheme::Token,
            Self::FineGrained => AuthScheme::Bearer,
            Self::Anonymous => AuthScheme::None,
        }
    }

    pub fn tier(self) -> AccessTier {
        match self {
            Self::Anonymous => AccessTier::Unauthenticated,
            Self::Classic | Self::FineGrained => AccessTier::Authenticated,
        }
    }

    /// Default number of concurrent content requests on the API path.
    pub fn fetch_concurrency(self) -> usize {
        match self {
            Self::Classic => 10,
            Self::FineGrained => 4,
            Self::Anonymous => 3,
        }
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `Authorization` header scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthScheme {
    /// Legacy `token <secret>` scheme.
    Token,
    Bearer,
    None,
}

impl AuthScheme {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Token => "token",
            Self::Bearer => "Bearer",
            Self::None => "none",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessTier {
    Unauthenticated,
    Authenticated,
}

impl AccessTier {
    /// Documented hourly request quota for the core API.
    pub fn expected_hourly_limit(self) -> u64 {
        match self {
            Self::Unauthenticated => 60,
            Self::Authenticated => 5000,
        }
    }
}

/// Identity used to key rate-limit state without retaining the secret.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CredentialKey(String);

impl CredentialKey {
    pub fn anonymous() -> Self {
        Self("anonymous".to_string())
    }
}

impl fmt::Display for CredentialKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A classified credential. Immutable once built.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    secret: Option<String>,
    kind: TokenKind,
    key: CredentialKey,
}

impl Credential {
    pub fn anonymous() -> Self {
        Self { secret: None, kind: TokenKind::Anonymous, key: CredentialKey::anonymous() }
    }

    fn new(secret: String, kind: TokenKind) -> Self {
        let key = CredentialKey(format!("{}:{}", kind.as_str(), short_digest(&secret)));
        Self { secret: Some(secret), kind, key }
    }

    pub fn kind(&self) -> TokenKind {
        self.kind
    }

    pub fn scheme(&self) -> AuthScheme {
        self.kind.scheme()
    }

    pub fn tier(&self) -> AccessTier {
        self.kind.tier()
    }

    pub fn key(&self) -> &CredentialKey {
        &self.key
    }

    /// Value for the `Authorization` header, if any.
    pub fn authorization(&self) -> Option<String> {
        let secret = self.secret.as_deref()?;
        match self.scheme() {
            AuthScheme::Token => Some(format!("token {secret}")),
            AuthScheme::Bearer => Some(format!("Bearer {secret}")),
            AuthScheme::None => None,
        }
    }

    /// Masked form safe for logs: `ghp_...wxyz`, or `***` for short secrets.
    pub fn masked(&self) -> String {
        match self.secret.as_deref() {
            None => "<none>".to_string(),
            Some(secret) if secret.chars().count() <= 8 => "***".to_string(),
            Some(secret) => {
                let head: String = secret.chars().take(4).collect();
                let tail: String = {
                    let mut tail: Vec<char> = secret.chars().rev().take(4).collect();
                    tail.reverse();
                    tail.into_iter().collect()
                };
                format!("{head}...{tail}")
            }
        }
    }

    /// Whether a recognized token also has the length GitHub issues it with.
    pub fn is_well_formed(&self) -> bool {
        let Some(secret) = self.secret.as_deref() else {
            return true;
        };
        match self.kind {
            TokenKind::FineGrained => secret.len() >= 80,
            TokenKind::Classic if CLASSIC_PREFIXES.iter().any(|p| secret.starts_with(p)) => {
                secret.len() == 40
            }
            _ => true,
        }
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("kind", &self.kind)
            .field("secret", &self.masked())
            .finish()
    }
}

/// Classify an optional token string.
///
/// Empty or absent input is anonymous. Recognized prefixes pick the kind; a
/// string that resembles a token but matches no known shape is rejected so a
/// typo does not silently downgrade the run to anonymous access.
pub fn classify(token: Option<&str>) -> Result<Credential, AnalyzerError> {
    let Some(raw) = token.map(str::trim).filter(|t| !t.is_empty()) else {
        return Ok(Credential::anonymous());
    };

    if raw.starts_with(FINE_GRAINED_PREFIX) {
        return Ok(Credential::new(raw.to_string(), TokenKind::FineGrained));
    }
    if CLASSIC_PREFIXES.iter().any(|prefix| raw.starts_with(prefix)) || LEGACY_HEX.is_match(raw) {
        return Ok(Credential::new(raw.to_string(), TokenKind::Classic));
    }
    if TOKEN_LIKE.is_match(raw) {
        return Err(AnalyzerError::InvalidCredentialFormat {
            hint: format!(
                "expected a ghp_/gho_/ghs_/ghr_/ghu_ or github_pat_ prefix, \
                 or 40 hex characters; got {} characters",
                raw.chars().count()
            ),
        });
    }

    tracing::debug!("token value does not resemble a GitHub token, continuing anonymously");
    Ok(Credential::anonymous())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classic_prefix_uses_legacy_scheme() {
        let cred = classify(Some("ghp_xxx")).expect("classic");
        assert_eq!(cred.kind(), TokenKind::Classic);
        assert_eq!(cred.scheme(), AuthScheme::Token);
        assert_eq!(cred.authorization().as_deref(), Some("token ghp_xxx"));
        assert!(!cred.is_well_formed());
    }

    #[test]
    fn fine_grained_prefix_uses_bearer() {
        let cred = classify(Some("github_pat_xxx")).expect("fine-grained");
        assert_eq!(cred.kind(), TokenKind::FineGrained);
        assert_eq!(cred.authorization().as_deref(), Some("Bearer github_pat_xxx"));
        assert_eq!(cred.tier(), AccessTier::Authenticated);
    }

    #[test]
    fn empty_and_whitespace_are_anonymous() {
        for input in [None, Some(""), Some("   \n")] {
            let cred = classify(input).expect("anonymous");
            assert_eq!(cred.kind(), TokenKind::Anonymous);
            assert!(cred.authorization().is_none());
            assert_eq!(cred.key(), &CredentialKey::anonymous());
        }
    }

    #[test]
    fn legacy_hex_token_is_classic() {
        let cred = classify(Some(&"a1".repeat(20))).expect("legacy");
        assert_eq!(cred.kind(), TokenKind::Classic);
        assert!(cred.is_well_formed());
    }

    #[test]
    fn other_app_prefixes_are_classic() {
        for prefix in ["gho_", "ghs_", "ghr_", "ghu_"] {
            let cred = classify(Some(&format!("{prefix}abc"))).expect("prefix");
            assert_eq!(cred.kind(), TokenKind::Classic, "{prefix}");
        }
    }

    #[test]
    fn token_like_garbage_is_rejected() {
        let err = classify(Some("ghx_typo123")).expect_err("typo prefix");
        assert!(matches!(err, AnalyzerError::InvalidCredentialFormat { .. }));

        let err = classify(Some("abcdefghijklmnopqrstuvwxyz")).expect_err("long opaque string");
        assert!(matches!(err, AnalyzerError::InvalidCredentialFormat { .. }));
    }

    #[test]
    fn short_noise_falls_back_to_anonymous() {
        let cred = classify(Some("none")).expect("anonymous");
        assert_eq!(cred.kind(), TokenKind::Anonymous);
    }

    #[test]
    fn debug_never_prints_secret() {
        let secret = format!("ghp_{}", "s".repeat(36));
        let cred = classify(Some(&secret)).expect("classic");
        let rendered = format!("{cred:?}");
        assert!(!rendered.contains(&secret));
        assert!(rendered.contains("ghp_...ssss"));
        assert!(!cred.key().to_string().contains(&secret));
    }

    #[test]
    fn fine_grained_length_check() {
        let long = format!("github_pat_{}", "A".repeat(82));
        assert!(classify(Some(&long)).expect("fg").is_well_formed());
    }

    #[test]
    fn concurrency_profile_by_kind() {
        assert_eq!(TokenKind::Classic.fetch_concurrency(), 10);
        assert_eq!(TokenKind::FineGrained.fetch_concurrency(), 4);
        assert_eq!(TokenKind::Anonymous.fetch_concurrency(), 3);
    }
}
