//! Archive-first acquisition with per-file API fallback.
//!
//! The engine is an explicit state machine:
//!
//! ```text
//! Start -> TryArchive -> Success
//!              |  \
//!              |   FallbackToApi -> TryApi -> Success
//!              |                        \
//!              +-----------------------> Exhausted
//! ```
//!
//! What happens after a failed archive attempt is decided by the pure
//! [`next_after_archive`], so the fallback rules are testable without I/O.

use super::api::ApiWalker;
use super::archive::{extract_archive, ArchiveError};
use super::github::{api_headers, classify_failure, Endpoints, RepoInfo, RepoRef};
use super::transport::{HttpRequest, HttpTransport};
use crate::auth::Credential;
use crate::domain::{
    AcquisitionAttempt, AcquisitionMethod, ArchiveEndpoint, AttemptOutcome, Config, FileRecord,
    MethodMode,
};
use crate::error::{AnalyzerError, TransportError, Warning};
use crate::ratelimit::{QuotaPool, RateLimitTracker};
use crate::triage::TriagePolicy;
use std::sync::Arc;
use std::time::Duration;

/// Multiplier from the downloaded archive ceiling to the expanded-size ceiling.
const EXPANSION_FACTOR: u64 = 10;

/// Knobs governing one acquisition.
#[derive(Debug, Clone)]
pub struct AcquisitionPolicy {
    pub mode: MethodMode,
    pub max_archive_bytes: u64,
    pub archive_retries: u32,
    pub file_retries: u32,
    pub retry_backoff: Duration,
    pub max_rate_limit_wait: Duration,
    pub api_content_max_bytes: u64,
    pub max_api_files: usize,
    /// Overrides the per-token-kind default.
    pub fetch_concurrency: Option<usize>,
    pub request_timeout: Duration,
    pub archive_timeout: Duration,
    pub archive_endpoint: ArchiveEndpoint,
    pub dry_run: bool,
}

impl Default for AcquisitionPolicy {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

impl AcquisitionPolicy {
    pub fn from_config(config: &Config) -> Self {
        Self {
            mode: config.method,
            max_archive_bytes: config.max_archive_bytes,
            archive_retries: config.archive_retries,
            file_retries: config.file_retries,
            retry_backoff: config.retry_backoff(),
            max_rate_limit_wait: config.max_rate_limit_wait(),
            api_content_max_bytes: config.api_content_max_bytes,
            max_api_files: config.max_api_files,
            fetch_concurrency: config.fetch_concurrency,
            request_timeout: config.request_timeout(),
            archive_timeout: config.archive_timeout(),
            archive_endpoint: config.archive_endpoint,
            dry_run: config.dry_run,
        }
    }
}

/// Where the engine goes after a failed archive attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    RetryArchive { delay: Duration },
    FallbackToApi,
    Exhausted,
}

/// Decide the next step after archive attempt number `attempt` (1-based)
/// ended with `outcome`.
pub fn next_after_archive(
    outcome: AttemptOutcome,
    attempt: u32,
    policy: &AcquisitionPolicy,
    separate_quota: bool,
) -> Transition {
    let fallback = match outcome {
        AttemptOutcome::Success => return Transition::Exhausted,
        AttemptOutcome::TooLarge | AttemptOutcome::NotFound | AttemptOutcome::Forbidden => true,
        AttemptOutcome::RateLimited => separate_quota,
        AttemptOutcome::Unauthorized => false,
        AttemptOutcome::TransportError if attempt <= policy.archive_retries => {
            return Transition::RetryArchive { delay: policy.retry_backoff * attempt };
        }
        AttemptOutcome::TransportError => true,
    };

    if fallback && policy.mode != MethodMode::Archive {
        Transition::FallbackToApi
    } else {
        Transition::Exhausted
    }
}

/// Files obtained for one repository, plus how they were obtained.
#[derive(Debug, Clone)]
pub struct Acquisition {
    pub repo: RepoRef,
    pub info: Option<RepoInfo>,
    pub method: AcquisitionMethod,
    pub files: Vec<FileRecord>,
    pub attempts: Vec<AcquisitionAttempt>,
    pub warnings: Vec<Warning>,
}

impl Acquisition {
    fn dry_run(repo: &RepoRef) -> Self {
        Self {
            repo: repo.clone(),
            info: None,
            method: AcquisitionMethod::DryRun,
            files: Vec::new(),
            attempts: Vec::new(),
            warnings: Vec::new(),
        }
    }
}

enum State {
    Start,
    TryArchive { attempt: u32 },
    FallbackToApi,
    TryApi,
    Success { method: AcquisitionMethod, files: Vec<FileRecord> },
    Exhausted(AnalyzerError),
}

pub struct AcquisitionEngine {
    transport: Arc<dyn HttpTransport>,
    tracker: Arc<RateLimitTracker>,
    endpoints: Endpoints,
    policy: AcquisitionPolicy,
    triage: TriagePolicy,
}

impl AcquisitionEngine {
    pub fn new(
        transport: Arc<dyn HttpTransport>,
        tracker: Arc<RateLimitTracker>,
        endpoints: Endpoints,
        policy: AcquisitionPolicy,
    ) -> Self {
        Self { transport, tracker, endpoints, policy, triage: TriagePolicy::default() }
    }

    /// Triage rules used to pick which files get content on the API path.
    pub fn triage_policy(mut self, triage: TriagePolicy) -> Self {
        self.triage = triage;
        self
    }

    pub fn tracker(&self) -> &Arc<RateLimitTracker> {
        &self.tracker
    }

    pub fn policy(&self) -> &AcquisitionPolicy {
        &self.policy
    }

    /// Run the state machine to completion.
    pub async fn acquire(
        &self,
        repo: &RepoRef,
        credential: &Credential,
    ) -> Result<Acquisition, AnalyzerError> {
        if self.policy.dry_run {
            tracing::info!(repo = %repo, "dry run, skipping network");
            return Ok(Acquisition::dry_run(repo));
        }

        let mut info = None;
        let mut attempts = Vec::new();
        let mut warnings = Vec::new();
        let mut last_method = match self.policy.mode {
            MethodMode::Api => AcquisitionMethod::Api,
            MethodMode::Auto | MethodMode::Archive => AcquisitionMethod::Archive,
        };
        let mut state = State::Start;

        loop {
            state = match state {
                State::Start => {
                    info = self.repo_info(repo, credential, &mut warnings).await?;
                    match self.policy.mode {
                        MethodMode::Api => State::TryApi,
                        MethodMode::Auto | MethodMode::Archive => State::TryArchive { attempt: 1 },
                    }
                }

                State::TryArchive { attempt } => {
                    last_method = AcquisitionMethod::Archive;
                    match self.try_archive(repo, credential, info.as_ref()).await {
                        Ok(files) => {
                            attempts.push(AcquisitionAttempt::success(
                                AcquisitionMethod::Archive,
                                files.len(),
                            ));
                            State::Success { method: AcquisitionMethod::Archive, files }
                        }
                        Err(err) => {
                            let outcome = err.outcome();
                            tracing::info!(
                                attempt,
                                %outcome,
                                error = %err,
                                "archive attempt failed"
                            );
                            let mut record = AcquisitionAttempt::failed(
                                AcquisitionMethod::Archive,
                                outcome,
                                err.to_string(),
                            );
                            if let AnalyzerError::ArchiveTooLarge { size: Some(size), .. } = &err {
                                record = record.size(*size);
                            }
                            attempts.push(record);

                            match next_after_archive(
                                outcome,
                                attempt,
                                &self.policy,
                                self.tracker.has_separate_quota(),
                            ) {
                                Transition::RetryArchive { delay } => {
                                    self.tracker.clock().sleep(delay).await;
                                    State::TryArchive { attempt: attempt + 1 }
                                }
                                Transition::FallbackToApi => State::FallbackToApi,
                                Transition::Exhausted => State::Exhausted(err),
                            }
                        }
                    }
                }

                State::FallbackToApi => {
                    tracing::info!(repo = %repo, "falling back to per-file API acquisition");
                    State::TryApi
                }

                State::TryApi => {
                    last_method = AcquisitionMethod::Api;
                    let walker = ApiWalker {
                        transport: self.transport.as_ref(),
                        tracker: &self.tracker,
                        endpoints: &self.endpoints,
                        policy: &self.policy,
                        triage: &self.triage,
                        credential,
                        repo,
                    };
                    match walker.acquire().await {
                        Ok(harvest) => {
                            attempts.push(AcquisitionAttempt::success(
                                AcquisitionMethod::Api,
                                harvest.files.len(),
                            ));
                            warnings.extend(harvest.warnings);
                            State::Success { method: AcquisitionMethod::Api, files: harvest.files }
                        }
                        Err(err) => {
                            attempts.push(AcquisitionAttempt::failed(
                                AcquisitionMethod::Api,
                                err.outcome(),
                                err.to_string(),
                            ));
                            State::Exhausted(err)
                        }
                    }
                }

                State::Success { method, files } => {
                    tracing::info!(
                        repo = %repo,
                        %method,
                        files = files.len(),
                        "acquisition complete"
                    );
                    return Ok(Acquisition {
                        repo: repo.clone(),
                        info,
                        method,
                        files,
                        attempts,
                        warnings,
                    });
                }

                State::Exhausted(err) => {
                    tracing::warn!(
                        repo = %repo,
                        %last_method,
                        error = %err,
                        "acquisition exhausted"
                    );
                    return Err(AnalyzerError::Acquisition {
                        source: Box::new(err),
                        last_method,
                        attempts,
                    });
                }
            };
        }
    }

    /// Best-effort repository metadata. Only a rejected credential is fatal.
    async fn repo_info(
        &self,
        repo: &RepoRef,
        credential: &Credential,
        warnings: &mut Vec<Warning>,
    ) -> Result<Option<RepoInfo>, AnalyzerError> {
        let mut unavailable = |detail: String| {
            tracing::warn!(repo = %repo, %detail, "repository info unavailable");
            warnings.push(Warning::RepositoryInfoUnavailable { detail });
        };

        if !self.tracker.can_proceed(credential, AcquisitionMethod::Api) {
            unavailable("API rate limit exhausted".to_string());
            return Ok(None);
        }

        let request = HttpRequest::get(self.endpoints.repo_info(repo))
            .headers(api_headers(credential))
            .timeout(self.policy.request_timeout);
        let response = match self.transport.request(request).await {
            Ok(response) => response,
            Err(err) => {
                unavailable(err.to_string());
                return Ok(None);
            }
        };
        self.tracker.record_outcome(credential, QuotaPool::Core, &response.headers);

        if response.is_success() {
            return match serde_json::from_slice::<RepoInfo>(&response.body) {
                Ok(info) => {
                    tracing::debug!(repo = %repo, size_kb = info.size, "repository info");
                    Ok(Some(info))
                }
                Err(e) => {
                    unavailable(format!("unexpected payload: {e}"));
                    Ok(None)
                }
            };
        }

        match classify_failure(&response, repo, AcquisitionMethod::Api, self.tracker.now()) {
            err @ AnalyzerError::AuthenticationFailed { .. } => Err(err),
            err => {
                if let AnalyzerError::RateLimitExhausted { reset_at: Some(reset_at), .. } = &err {
                    self.tracker.mark_exhausted(credential, QuotaPool::Core, *reset_at);
                }
                unavailable(err.to_string());
                Ok(None)
            }
        }
    }

    /// One archive download and expansion.
    async fn try_archive(
        &self,
        repo: &RepoRef,
        credential: &Credential,
        info: Option<&RepoInfo>,
    ) -> Result<Vec<FileRecord>, AnalyzerError> {
        let pool = self.tracker.pool_for(AcquisitionMethod::Archive);
        if !self.tracker.can_proceed(credential, AcquisitionMethod::Archive) {
            let wait = self.tracker.wait_hint(credential, pool).unwrap_or_default();
            if wait > self.policy.max_rate_limit_wait {
                return Err(AnalyzerError::RateLimitExhausted {
                    method: AcquisitionMethod::Archive,
                    reset_at: self.tracker.snapshot(credential, pool).map(|s| s.reset_at),
                });
            }
            tracing::info!(?wait, "archive quota blocked, waiting for reset");
            self.tracker.clock().sleep(wait).await;
        }

        let limit = self.policy.max_archive_bytes;
        if let Some(size) = info.map(RepoInfo::size_bytes).filter(|size| *size > limit) {
            return Err(AnalyzerError::ArchiveTooLarge { size: Some(size), limit });
        }

        let (url, headers) = match self.policy.archive_endpoint {
            ArchiveEndpoint::Api => (self.endpoints.zipball(repo), api_headers(credential)),
            ArchiveEndpoint::Web => {
                let branch = info.and_then(|i| i.default_branch.as_deref());
                (self.endpoints.web_archive(repo, branch), Vec::new())
            }
        };
        tracing::info!(url = %url, "downloading archive");

        let request = HttpRequest::get(&url)
            .headers(headers)
            .timeout(self.policy.archive_timeout)
            .max_body_bytes(limit);
        let response = match self.transport.request(request).await {
            Ok(response) => response,
            Err(TransportError::BodyTooLarge { limit, .. }) => {
                self.tracker.record_outcome(credential, pool, &[]);
                return Err(AnalyzerError::ArchiveTooLarge { size: None, limit });
            }
            Err(err) => return Err(err.into()),
        };
        self.tracker.record_outcome(credential, pool, &response.headers);

        if !response.is_success() {
            let err =
                classify_failure(&response, repo, AcquisitionMethod::Archive, self.tracker.now());
            if let AnalyzerError::RateLimitExhausted { reset_at: Some(reset_at), .. } = &err {
                self.tracker.mark_exhausted(credential, pool, *reset_at);
            }
            return Err(err);
        }

        let body = response.body;
        let expanded_limit = limit.saturating_mul(EXPANSION_FACTOR);
        let extracted = tokio::task::spawn_blocking(move || extract_archive(&body, expanded_limit))
            .await
            .map_err(|e| TransportError::Other { url: url.clone(), message: e.to_string() })?;

        match extracted {
            Ok(files) => Ok(files),
            Err(ArchiveError::TooLarge { expanded, limit }) => {
                Err(AnalyzerError::ArchiveTooLarge { size: Some(expanded), limit })
            }
            Err(ArchiveError::Corrupt(message)) => {
                let message = format!("corrupt archive: {message}");
                Err(TransportError::Other { url, message }.into())
            }
        }
    }
}
