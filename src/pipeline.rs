//! End-to-end analysis: acquire, triage, infer, assemble.

use crate::auth::Credential;
use crate::domain::Config;
use crate::error::AnalyzerError;
use crate::fetch::{
    AcquisitionEngine, AcquisitionPolicy, Endpoints, HttpTransport, RepoRef, ReqwestTransport,
};
use crate::infer::infer;
use crate::ratelimit::{Clock, RateLimitTracker, SystemClock};
use crate::render::{assemble, BundleOptions, RepositoryBundle};
use crate::triage::{triage, TriagePolicy};
use anyhow::Result;
use std::sync::Arc;

pub struct Analyzer {
    engine: AcquisitionEngine,
    triage: TriagePolicy,
    options: BundleOptions,
    include_timestamp: bool,
}

impl Analyzer {
    /// Build an analyzer over an explicit transport and clock.
    pub fn new(config: &Config, transport: Arc<dyn HttpTransport>, clock: Arc<dyn Clock>) -> Self {
        let triage = TriagePolicy::from_config(config);
        let tracker = Arc::new(RateLimitTracker::new(clock, config.archive_endpoint));
        let engine = AcquisitionEngine::new(
            transport,
            tracker,
            Endpoints::from_config(config),
            AcquisitionPolicy::from_config(config),
        )
        .triage_policy(triage.clone());

        Self {
            engine,
            triage,
            options: BundleOptions::from_config(config),
            include_timestamp: config.include_timestamp,
        }
    }

    /// Production wiring: reqwest transport and the system clock.
    pub fn from_config(config: &Config) -> Result<Self> {
        let transport = ReqwestTransport::new(&config.user_agent, config.request_timeout())?;
        Ok(Self::new(config, Arc::new(transport), Arc::new(SystemClock)))
    }

    pub fn tracker(&self) -> &Arc<RateLimitTracker> {
        self.engine.tracker()
    }

    pub async fn analyze(
        &self,
        repo: &RepoRef,
        credential: &Credential,
    ) -> Result<RepositoryBundle, AnalyzerError> {
        tracing::info!(repo = %repo, token_kind = %credential.kind(), "analysis started");
        let acquisition = self.engine.acquire(repo, credential).await?;

        let records = acquisition.files.clone();
        let files = triage(records, &self.triage);
        let inference = infer(&files);

        let created = self.include_timestamp.then(|| self.tracker().now().timestamp());
        let options = self.options.created(created);
        Ok(assemble(acquisition, files, inference, credential.kind(), &options))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{AcquisitionMethod, MethodMode};
    use crate::fetch::archive::tests::build_zip;
    use crate::fetch::testing::*;
    use crate::ratelimit::ManualClock;
    use chrono::{DateTime, Utc};
    use serde_json::json;

    fn clock() -> Arc<ManualClock> {
        Arc::new(ManualClock::new(DateTime::<Utc>::from_timestamp(1_700_000_000, 0).expect("ts")))
    }

    #[tokio::test]
    async fn archive_run_produces_ranked_bundle() {
        let readme = vec![b'#'; 500];
        let main = vec![b'x'; 2048];
        let vendored = vec![b'y'; 10 * 1024];
        let zip = build_zip(&[
            ("README.md", readme.as_slice()),
            ("src/main.py", main.as_slice()),
            ("node_modules/x/index.js", vendored.as_slice()),
        ]);
        let transport = ScriptedTransport::new()
            .on(
                "https://api.github.com/repos/octo/hello",
                ok_json(json!({"name": "hello", "full_name": "octo/hello", "size": 13})),
            )
            .on(
                "https://api.github.com/repos/octo/hello/zipball",
                Ok(reply("", 200, &[], &zip)),
            );
        let analyzer = Analyzer::new(&Config::default(), Arc::new(transport), clock());
        let bundle = analyzer
            .analyze(&RepoRef::parse("octo/hello").expect("repo"), &Credential::anonymous())
            .await
            .expect("bundle");

        let paths: Vec<&str> = bundle.files.iter().map(|f| f.path.as_str()).collect();
        assert_eq!(paths, vec!["src/main.py", "README.md"]);
        assert_eq!(bundle.excluded[0].path, "node_modules/x/index.js");
        assert_eq!(bundle.metadata.analysis_method, AcquisitionMethod::Archive);
        assert_eq!(bundle.metadata.created, Some(1_700_000_000));
        assert!(!bundle.is_partial());
    }

    #[tokio::test]
    async fn failures_propagate_with_attempt_log() {
        let config =
            Config { method: MethodMode::Api, include_timestamp: false, ..Config::default() };
        let analyzer = Analyzer::new(&config, Arc::new(ScriptedTransport::new()), clock());
        let err = analyzer
            .analyze(&RepoRef::parse("octo/missing").expect("repo"), &Credential::anonymous())
            .await
            .expect_err("missing repo");
        assert!(matches!(err.terminal(), AnalyzerError::RepositoryNotFound { .. }));
    }
}
