//! Layering: file config, then `REPO_BUNDLE_*` environment, then CLI flags.

use crate::domain::{Config, MethodMode, OutputFormat};
use anyhow::{Context, Result};
use figment::providers::{Env, Serialized};
use figment::Figment;

pub const ENV_PREFIX: &str = "REPO_BUNDLE_";

/// Values given on the command line. `None` leaves the lower layer untouched.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub method: Option<MethodMode>,
    pub format: Option<OutputFormat>,
    pub max_file_bytes: Option<u64>,
    pub max_archive_bytes: Option<u64>,
    pub max_api_files: Option<usize>,
    pub fetch_concurrency: Option<usize>,
    pub exclude_globs: Option<Vec<String>>,
    pub include_content: Option<bool>,
    pub include_timestamp: Option<bool>,
    pub dry_run: Option<bool>,
}

impl CliOverrides {
    fn apply(self, config: &mut Config) {
        if let Some(v) = self.method {
            config.method = v;
        }
        if let Some(v) = self.format {
            config.format = v;
        }
        if let Some(v) = self.max_file_bytes {
            config.max_file_bytes = v;
        }
        if let Some(v) = self.max_archive_bytes {
            config.max_archive_bytes = v;
        }
        if let Some(v) = self.max_api_files {
            config.max_api_files = v;
        }
        if let Some(v) = self.fetch_concurrency {
            config.fetch_concurrency = Some(v);
        }
        if let Some(v) = self.exclude_globs {
            config.exclude_globs.extend(v);
        }
        if let Some(v) = self.include_content {
            config.include_content = v;
        }
        if let Some(v) = self.include_timestamp {
            config.include_timestamp = v;
        }
        if let Some(v) = self.dry_run {
            config.dry_run = v;
        }
    }
}

/// Merge the process environment and CLI flags over the file layer.
pub fn merge_cli_with_config(file_config: Config, cli: CliOverrides) -> Result<Config> {
    merge_layers(file_config, ENV_PREFIX, cli)
}

fn merge_layers(file_config: Config, env_prefix: &str, cli: CliOverrides) -> Result<Config> {
    let mut config: Config = Figment::from(Serialized::defaults(file_config))
        .merge(Env::prefixed(env_prefix).split("__"))
        .extract()
        .with_context(|| format!("Invalid {env_prefix}* environment configuration"))?;
    cli.apply(&mut config);
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_wins_over_file() {
        let file = Config { max_api_files: 10, max_file_bytes: 5, ..Config::default() };
        let cli = CliOverrides { max_api_files: Some(20), ..CliOverrides::default() };
        let merged = merge_layers(file, "REPO_BUNDLE_TEST_UNSET_", cli).expect("merge");
        assert_eq!(merged.max_api_files, 20);
        assert_eq!(merged.max_file_bytes, 5);
    }

    #[test]
    fn cli_globs_extend_file_globs() {
        let file = Config { exclude_globs: vec!["docs/**".into()], ..Config::default() };
        let cli = CliOverrides {
            exclude_globs: Some(vec!["*.snap".into()]),
            ..CliOverrides::default()
        };
        let merged = merge_layers(file, "REPO_BUNDLE_TEST_UNSET_", cli).expect("merge");
        assert_eq!(merged.exclude_globs, vec!["docs/**", "*.snap"]);
    }

    #[test]
    fn environment_sits_between_file_and_cli() {
        std::env::set_var("REPO_BUNDLE_TEST_ENV_MAX_API_FILES", "77");
        std::env::set_var("REPO_BUNDLE_TEST_ENV_METHOD", "api");
        std::env::set_var("REPO_BUNDLE_TEST_ENV_RANKING__README", "9");

        let file = Config { max_api_files: 10, ..Config::default() };
        let merged = merge_layers(file.clone(), "REPO_BUNDLE_TEST_ENV_", CliOverrides::default())
            .expect("merge");
        assert_eq!(merged.max_api_files, 77);
        assert_eq!(merged.method, MethodMode::Api);
        assert_eq!(merged.ranking.readme, 9);

        let cli = CliOverrides { method: Some(MethodMode::Archive), ..CliOverrides::default() };
        let merged = merge_layers(file, "REPO_BUNDLE_TEST_ENV_", cli).expect("merge");
        assert_eq!(merged.method, MethodMode::Archive);
    }
}
