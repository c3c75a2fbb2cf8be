use serde::{Deserialize, Deserializer, Serialize};
use std::str::FromStr;
use std::time::Duration;

/// Which acquisition methods a run may use.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MethodMode {
    /// Archive first, per-file API as fallback.
    #[default]
    Auto,
    /// Archive only, failing instead of falling back.
    Archive,
    /// Per-file API only.
    Api,
}

impl FromStr for MethodMode {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "archive" | "zip" => Ok(Self::Archive),
            "api" => Ok(Self::Api),
            other => anyhow::bail!("Invalid method '{other}'. Expected auto, archive or api"),
        }
    }
}

/// Where archive snapshots are downloaded from.
///
/// `Api` goes through the REST zipball endpoint and shares the core quota with
/// per-file requests; `Web` downloads from the web host, which is metered separately.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArchiveEndpoint {
    #[default]
    Api,
    Web,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Json,
    Text,
    Both,
}

impl FromStr for OutputFormat {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "text" | "txt" => Ok(Self::Text),
            "both" => Ok(Self::Both),
            other => anyhow::bail!("Invalid format '{other}'. Expected json, text or both"),
        }
    }
}

/// Weights used by file priority scoring.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RankingWeights {
    pub primary_language: i64,
    pub build_definition: i64,
    pub config: i64,
    pub documentation: i64,
    pub unknown: i64,
    pub entrypoint: i64,
    pub manifest: i64,
    pub readme: i64,
    pub source_dir: i64,
    pub test_penalty: i64,
    pub depth_penalty: i64,
    pub max_depth_penalty: i64,
    pub nontrivial_content: i64,
    pub declares_symbols: i64,
    pub has_imports: i64,
    pub floor: i64,
}

impl Default for RankingWeights {
    fn default() -> Self {
        Self {
            primary_language: 600,
            build_definition: 500,
            config: 300,
            documentation: 200,
            unknown: 100,
            entrypoint: 400,
            manifest: 200,
            readme: 150,
            source_dir: 50,
            test_penalty: 150,
            depth_penalty: 25,
            max_depth_penalty: 150,
            nontrivial_content: 20,
            declares_symbols: 40,
            has_imports: 20,
            floor: 10,
        }
    }
}

/// Run configuration. Every field has a default so partial files and env
/// overrides layer cleanly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub method: MethodMode,
    pub api_base_url: String,
    pub web_base_url: String,
    pub archive_endpoint: ArchiveEndpoint,
    /// Ceiling for a whole archive snapshot.
    pub max_archive_bytes: u64,
    /// Ceiling for a single file to be included by triage.
    pub max_file_bytes: u64,
    /// Largest file whose content the API path will fetch.
    pub api_content_max_bytes: u64,
    pub max_api_files: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fetch_concurrency: Option<usize>,
    pub archive_retries: u32,
    pub file_retries: u32,
    pub retry_backoff_ms: u64,
    pub max_rate_limit_wait_secs: u64,
    pub request_timeout_secs: u64,
    pub archive_timeout_secs: u64,
    pub run_timeout_secs: u64,
    #[serde(deserialize_with = "deserialize_string_list")]
    pub exclude_globs: Vec<String>,
    pub include_content: bool,
    pub include_timestamp: bool,
    pub format: OutputFormat,
    pub user_agent: String,
    pub dry_run: bool,
    pub ranking: RankingWeights,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            method: MethodMode::Auto,
            api_base_url: "https://api.github.com".to_string(),
            web_base_url: "https://github.com".to_string(),
            archive_endpoint: ArchiveEndpoint::Api,
            max_archive_bytes: 100 * 1024 * 1024,
            max_file_bytes: 1024 * 1024,
            api_content_max_bytes: 256 * 1024,
            max_api_files: 300,
            fetch_concurrency: None,
            archive_retries: 2,
            file_retries: 2,
            retry_backoff_ms: 500,
            max_rate_limit_wait_secs: 60,
            request_timeout_secs: 30,
            archive_timeout_secs: 300,
            run_timeout_secs: 600,
            exclude_globs: Vec::new(),
            include_content: true,
            include_timestamp: true,
            format: OutputFormat::Json,
            user_agent: format!("repo-bundle/{}", env!("CARGO_PKG_VERSION")),
            dry_run: false,
            ranking: RankingWeights::default(),
        }
    }
}

impl Config {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn archive_timeout(&self) -> Duration {
        Duration::from_secs(self.archive_timeout_secs)
    }

    pub fn run_timeout(&self) -> Duration {
        Duration::from_secs(self.run_timeout_secs)
    }

    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }

    pub fn max_rate_limit_wait(&self) -> Duration {
        Duration::from_secs(self.max_rate_limit_wait_secs)
    }
}

/// Accept either a list of strings or one comma-separated string.
fn deserialize_string_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum StringOrList {
        One(String),
        Many(Vec<String>),
    }

    let items = match StringOrList::deserialize(deserializer)? {
        StringOrList::One(joined) => joined.split(',').map(str::to_string).collect::<Vec<_>>(),
        StringOrList::Many(items) => items,
    };
    Ok(items.into_iter().map(|s| s.trim().to_string()).filter(|s| !s.is_empty()).collect())
}
