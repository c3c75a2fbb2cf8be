//! GitHub repository references, endpoint URLs and response classification.

use crate::auth::Credential;
use crate::domain::{AcquisitionMethod, Config};
use crate::error::{AnalyzerError, TransportError};
use crate::fetch::transport::HttpResponse;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::fmt;
use url::Url;

const API_VERSION: &str = "2022-11-28";

/// `owner/name` plus an optional branch, tag or commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoRef {
    pub owner: String,
    pub name: String,
    pub git_ref: Option<String>,
}

impl RepoRef {
    /// Parse a repository reference.
    ///
    /// Accepted forms:
    /// - `https://github.com/owner/repo` (optionally `.git`, trailing `/`, `/tree/<ref>`)
    /// - `github.com/owner/repo`
    /// - `git@github.com:owner/repo.git`
    /// - `owner/repo`
    pub fn parse(input: &str) -> Result<Self, AnalyzerError> {
        let invalid = |reason: &str| AnalyzerError::InvalidRepositoryUrl {
            input: input.to_string(),
            reason: reason.to_string(),
        };
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(invalid("empty input"));
        }

        let path = if let Some(rest) = trimmed.strip_prefix("git@") {
            let (host, path) =
                rest.split_once(':').ok_or_else(|| invalid("missing ':' after host"))?;
            if !host.eq_ignore_ascii_case("github.com") {
                return Err(invalid("not a github.com repository"));
            }
            path.to_string()
        } else if trimmed.contains("://") {
            let url = Url::parse(trimmed).map_err(|e| invalid(&e.to_string()))?;
            let host = url.host_str().unwrap_or("").to_ascii_lowercase();
            if host != "github.com" && host != "www.github.com" {
                return Err(invalid("not a github.com repository"));
            }
            url.path().to_string()
        } else if let Some(rest) = trimmed
            .strip_prefix("github.com/")
            .or_else(|| trimmed.strip_prefix("www.github.com/"))
        {
            rest.to_string()
        } else {
            trimmed.to_string()
        };

        let parts: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        if parts.len() < 2 {
            return Err(invalid("expected owner/repo"));
        }
        let owner = parts[0];
        let name = parts[1].trim_end_matches(".git");
        if !is_valid_segment(owner) || !is_valid_segment(name) {
            return Err(invalid(
                "owner and repository may only contain letters, digits, '-', '_' and '.'",
            ));
        }

        let git_ref = match parts.get(2).copied() {
            Some("tree") | Some("blob") | Some("commit") if parts.len() > 3 => {
                Some(parts[3..].join("/"))
            }
            _ => None,
        };

        Ok(Self { owner: owner.to_string(), name: name.to_string(), git_ref })
    }

    pub fn with_ref(mut self, git_ref: Option<String>) -> Self {
        if git_ref.is_some() {
            self.git_ref = git_ref;
        }
        self
    }

    pub fn full_name(&self) -> String {
        format!("{}/{}", self.owner, self.name)
    }
}

impl fmt::Display for RepoRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)?;
        if let Some(git_ref) = &self.git_ref {
            write!(f, "@{git_ref}")?;
        }
        Ok(())
    }
}

fn is_valid_segment(segment: &str) -> bool {
    !segment.is_empty()
        && segment != "."
        && segment != ".."
        && segment.chars().all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
}

/// Builds REST and web URLs against configurable hosts.
#[derive(Debug, Clone)]
pub struct Endpoints {
    api_base: String,
    web_base: String,
}

impl Endpoints {
    pub fn new(api_base: &str, web_base: &str) -> Self {
        Self {
            api_base: api_base.trim_end_matches('/').to_string(),
            web_base: web_base.trim_end_matches('/').to_string(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(&config.api_base_url, &config.web_base_url)
    }

    pub fn repo_info(&self, repo: &RepoRef) -> String {
        format!("{}/repos/{}/{}", self.api_base, repo.owner, repo.name)
    }

    /// Contents listing (directory) or file metadata+content (file).
    pub fn contents(&self, repo: &RepoRef, path: &str) -> String {
        let encoded: Vec<String> = path
            .split('/')
            .filter(|s| !s.is_empty())
            .map(encode_segment)
            .collect();
        let mut url = format!("{}/repos/{}/{}/contents", self.api_base, repo.owner, repo.name);
        if !encoded.is_empty() {
            url.push('/');
            url.push_str(&encoded.join("/"));
        }
        if let Some(git_ref) = &repo.git_ref {
            url.push_str("?ref=");
            url.push_str(&encode_segment(git_ref));
        }
        url
    }

    pub fn zipball(&self, repo: &RepoRef) -> String {
        match &repo.git_ref {
            Some(git_ref) => {
                format!("{}/repos/{}/{}/zipball/{}", self.api_base, repo.owner, repo.name, git_ref)
            }
            None => format!("{}/repos/{}/{}/zipball", self.api_base, repo.owner, repo.name),
        }
    }

    /// Web host archive for a ref, falling back to the default branch, then `HEAD`.
    pub fn web_archive(&self, repo: &RepoRef, default_branch: Option<&str>) -> String {
        let target = repo.git_ref.as_deref().or(default_branch).unwrap_or("HEAD");
        format!("{}/{}/{}/archive/{}.zip", self.web_base, repo.owner, repo.name, target)
    }

    pub fn rate_limit(&self) -> String {
        format!("{}/rate_limit", self.api_base)
    }
}

fn encode_segment(segment: &str) -> String {
    let mut out = String::with_capacity(segment.len());
    for byte in segment.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(byte as char)
            }
            other => out.push_str(&format!("%{other:02X}")),
        }
    }
    out
}

/// Headers every REST request carries.
pub fn api_headers(credential: &Credential) -> Vec<(String, String)> {
    let mut headers = vec![
        ("accept".to_string(), "application/vnd.github+json".to_string()),
        ("x-github-api-version".to_string(), API_VERSION.to_string()),
    ];
    if let Some(value) = credential.authorization() {
        headers.push(("authorization".to_string(), value));
    }
    headers
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct LicenseInfo {
    #[serde(default)]
    pub spdx_id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

/// Subset of `GET /repos/{owner}/{repo}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct RepoInfo {
    pub name: String,
    pub full_name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
    /// Kilobytes, as reported by GitHub.
    #[serde(default)]
    pub size: u64,
    #[serde(default)]
    pub default_branch: Option<String>,
    #[serde(default)]
    pub private: bool,
    #[serde(default)]
    pub archived: bool,
    #[serde(default)]
    pub topics: Vec<String>,
    #[serde(default)]
    pub license: Option<LicenseInfo>,
    #[serde(default)]
    pub stargazers_count: u64,
    #[serde(default)]
    pub forks_count: u64,
}

impl RepoInfo {
    pub fn size_bytes(&self) -> u64 {
        self.size.saturating_mul(1024)
    }

    pub fn license_name(&self) -> Option<String> {
        let license = self.license.as_ref()?;
        license
            .spdx_id
            .clone()
            .filter(|id| id != "NOASSERTION")
            .or_else(|| license.name.clone())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    File,
    Dir,
    Symlink,
    Submodule,
}

/// One item of a contents listing, or a single-file contents response.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ContentEntry {
    pub name: String,
    pub path: String,
    #[serde(rename = "type")]
    pub kind: EntryKind,
    #[serde(default)]
    pub size: u64,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub encoding: Option<String>,
}

/// Extract GitHub's `{"message": ...}` from an error body.
pub fn error_message(response: &HttpResponse) -> String {
    #[derive(Deserialize)]
    struct ApiError {
        message: String,
    }
    serde_json::from_slice::<ApiError>(&response.body)
        .map(|e| e.message)
        .unwrap_or_else(|_| format!("HTTP {}", response.status))
}

/// Reset time advertised by a throttled response, if any.
pub fn reset_hint(response: &HttpResponse, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    if let Some(secs) = response.header("retry-after").and_then(|v| v.trim().parse::<i64>().ok()) {
        return Some(now + chrono::Duration::seconds(secs.max(0)));
    }
    response
        .header("x-ratelimit-reset")
        .and_then(|v| v.trim().parse::<i64>().ok())
        .and_then(|secs| DateTime::<Utc>::from_timestamp(secs, 0))
}

/// Whether a 403/429 response signals throttling rather than a permission problem.
pub fn is_rate_limited(response: &HttpResponse) -> bool {
    match response.status {
        429 => true,
        403 => {
            response.header("x-ratelimit-remaining").map(str::trim) == Some("0")
                || response.header("retry-after").is_some()
                || error_message(response).to_ascii_lowercase().contains("rate limit")
        }
        _ => false,
    }
}

/// Map a non-success response to the error it represents.
pub fn classify_failure(
    response: &HttpResponse,
    repo: &RepoRef,
    method: AcquisitionMethod,
    now: DateTime<Utc>,
) -> AnalyzerError {
    if is_rate_limited(response) {
        return AnalyzerError::RateLimitExhausted { method, reset_at: reset_hint(response, now) };
    }
    match response.status {
        401 => AnalyzerError::AuthenticationFailed { detail: error_message(response) },
        404 => AnalyzerError::RepositoryNotFound { repo: repo.full_name() },
        403 | 451 => AnalyzerError::AccessDenied {
            repo: repo.full_name(),
            detail: error_message(response),
        },
        status if status >= 500 => {
            TransportError::ServerError { url: response.url.clone(), status }.into()
        }
        _ => AnalyzerError::AccessDenied {
            repo: repo.full_name(),
            detail: format!("HTTP {}: {}", response.status, error_message(response)),
        },
    }
}
