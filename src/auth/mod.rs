//! Credential classification and sourcing

pub mod token;

pub use token::{classify, AccessTier, AuthScheme, Credential, CredentialKey, TokenKind};

/// Environment variables consulted for a token, in order.
pub const TOKEN_ENV_VARS: &[&str] = &["GITHUB_TOKEN", "GH_TOKEN"];

/// First non-empty token among the environment variables in [`TOKEN_ENV_VARS`].
pub fn token_from_env() -> Option<String> {
    TOKEN_ENV_VARS
        .iter()
        .filter_map(|name| std::env::var(name).ok())
        .map(|value| value.trim().to_string())
        .find(|value| !value.is_empty())
}
