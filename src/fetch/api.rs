//! Per-file acquisition through the REST contents endpoint.
//!
//! Lists the tree breadth-first, one request per directory, then fetches
//! content for the highest-priority source files with bounded concurrency.

use super::github::{api_headers, classify_failure, ContentEntry, EntryKind, Endpoints, RepoRef};
use super::strategy::AcquisitionPolicy;
use super::transport::{HttpRequest, HttpResponse, HttpTransport};
use crate::auth::Credential;
use crate::domain::{AcquisitionMethod, FileRecord, NoiseKind};
use crate::error::{AnalyzerError, TransportError, Warning};
use crate::rank::path_priority;
use crate::ratelimit::{QuotaPool, RateLimitTracker};
use crate::triage::TriagePolicy;
use base64::Engine as _;
use futures::stream::{self, StreamExt};
use std::collections::VecDeque;

/// Files and warnings gathered by one API run.
#[derive(Debug, Default)]
pub struct ApiHarvest {
    pub files: Vec<FileRecord>,
    pub warnings: Vec<Warning>,
}

pub struct ApiWalker<'a> {
    pub transport: &'a dyn HttpTransport,
    pub tracker: &'a RateLimitTracker,
    pub endpoints: &'a Endpoints,
    pub policy: &'a AcquisitionPolicy,
    pub triage: &'a TriagePolicy,
    pub credential: &'a Credential,
    pub repo: &'a RepoRef,
}

impl ApiWalker<'_> {
    pub async fn acquire(&self) -> Result<ApiHarvest, AnalyzerError> {
        let mut warnings = Vec::new();
        let entries = self.list_tree(&mut warnings).await?;

        let mut candidates: Vec<(i64, &ContentEntry)> = entries
            .iter()
            .filter(|e| e.size <= self.policy.api_content_max_bytes)
            .filter(|e| self.triage.path_noise(&e.path).is_none())
            .map(|e| (path_priority(&e.path, e.size, self.triage.ranking_weights()), e))
            .collect();
        candidates.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| a.1.path.cmp(&b.1.path)));
        if candidates.len() > self.policy.max_api_files {
            warnings.push(Warning::ApiFileCapReached {
                cap: self.policy.max_api_files,
                skipped: candidates.len() - self.policy.max_api_files,
            });
            candidates.truncate(self.policy.max_api_files);
        }

        let concurrency = self
            .policy
            .fetch_concurrency
            .unwrap_or_else(|| self.credential.kind().fetch_concurrency())
            .max(1);
        tracing::info!(
            listed = entries.len(),
            selected = candidates.len(),
            concurrency,
            "fetching file contents"
        );

        let fetched: Vec<(String, Result<Vec<u8>, AnalyzerError>)> = stream::iter(candidates)
            .map(|(_, entry)| async move { (entry.path.clone(), self.fetch_content(entry).await) })
            .buffer_unordered(concurrency)
            .collect()
            .await;

        let mut contents = std::collections::HashMap::new();
        let mut rate_limited = 0usize;
        for (path, result) in fetched {
            match result {
                Ok(bytes) => {
                    contents.insert(path, bytes);
                }
                Err(AnalyzerError::RateLimitExhausted { .. }) => rate_limited += 1,
                Err(err) => {
                    tracing::warn!(path = %path, error = %err, "content fetch failed");
                    warnings.push(Warning::ContentFetchFailed { path, detail: err.to_string() });
                }
            }
        }
        if rate_limited > 0 {
            warnings.push(Warning::RateLimitReached { skipped: rate_limited });
        }

        let mut files: Vec<FileRecord> = entries
            .into_iter()
            .map(|entry| match contents.remove(&entry.path) {
                Some(bytes) => FileRecord::with_content(entry.path, bytes, AcquisitionMethod::Api),
                None => FileRecord::listed(entry.path, entry.size, AcquisitionMethod::Api),
            })
            .collect();
        files.sort_by(|a, b| a.path.cmp(&b.path));
        warnings.sort_by_key(|w| w.to_string());
        Ok(ApiHarvest { files, warnings })
    }

    /// Breadth-first listing of every file. Directories that are pure noise
    /// (dependency or build trees) are not descended into.
    async fn list_tree(
        &self,
        warnings: &mut Vec<Warning>,
    ) -> Result<Vec<ContentEntry>, AnalyzerError> {
        let mut files = Vec::new();
        let mut queue = VecDeque::from([String::new()]);

        while let Some(dir) = queue.pop_front() {
            let listing = match self.list_dir(&dir).await {
                Ok(listing) => listing,
                Err(err) if dir.is_empty() => return Err(err),
                Err(err @ AnalyzerError::RateLimitExhausted { .. }) => return Err(err),
                Err(err @ AnalyzerError::AuthenticationFailed { .. }) => return Err(err),
                Err(err) => {
                    tracing::warn!(path = %dir, error = %err, "directory listing failed");
                    warnings.push(Warning::DirectoryListingFailed {
                        path: dir,
                        detail: err.to_string(),
                    });
                    continue;
                }
            };

            for entry in listing {
                match entry.kind {
                    EntryKind::File | EntryKind::Symlink => files.push(entry),
                    EntryKind::Dir if self.is_prunable_dir(&entry.path) => {
                        tracing::debug!(path = %entry.path, "skipping noise directory");
                    }
                    EntryKind::Dir => queue.push_back(entry.path),
                    EntryKind::Submodule => {}
                }
            }
        }

        Ok(files)
    }

    fn is_prunable_dir(&self, dir: &str) -> bool {
        matches!(
            self.triage.path_noise(&format!("{dir}/_")),
            Some(NoiseKind::VcsMetadata | NoiseKind::Vendored | NoiseKind::BuildOutput)
        )
    }

    async fn list_dir(&self, dir: &str) -> Result<Vec<ContentEntry>, AnalyzerError> {
        let url = self.endpoints.contents(self.repo, dir);
        let response = self.get_with_retries(&url).await?;
        serde_json::from_slice::<Vec<ContentEntry>>(&response.body).map_err(|e| {
            let message = format!("unexpected listing payload: {e}");
            TransportError::Other { url, message }.into()
        })
    }

    async fn fetch_content(&self, entry: &ContentEntry) -> Result<Vec<u8>, AnalyzerError> {
        let url = self.endpoints.contents(self.repo, &entry.path);
        let response = self.get_with_retries(&url).await?;
        let file: ContentEntry = serde_json::from_slice(&response.body).map_err(|e| {
            AnalyzerError::from(TransportError::Other {
                url: url.clone(),
                message: format!("unexpected file payload: {e}"),
            })
        })?;
        decode_content(&file).ok_or_else(|| {
            TransportError::Other { url, message: "content not returned inline".to_string() }.into()
        })
    }

    /// GET with exponential backoff on transport errors.
    async fn get_with_retries(&self, url: &str) -> Result<HttpResponse, AnalyzerError> {
        let mut attempt = 0u32;
        loop {
            match self.get(url).await {
                Err(AnalyzerError::Transport(err)) if attempt < self.policy.file_retries => {
                    let delay = self.policy.retry_backoff * 2u32.saturating_pow(attempt);
                    attempt += 1;
                    tracing::debug!(url, error = %err, attempt, ?delay, "retrying request");
                    self.tracker.clock().sleep(delay).await;
                }
                other => return other,
            }
        }
    }

    /// One quota-gated GET. A throttled response is retried once after the
    /// tracker-advised wait when that wait is within policy.
    async fn get(&self, url: &str) -> Result<HttpResponse, AnalyzerError> {
        let mut throttled = false;
        loop {
            self.gate().await?;
            let request = HttpRequest::get(url)
                .headers(api_headers(self.credential))
                .timeout(self.policy.request_timeout);
            let response = self.transport.request(request).await?;
            self.tracker.record_outcome(self.credential, QuotaPool::Core, &response.headers);
            if response.is_success() {
                return Ok(response);
            }

            let err =
                classify_failure(&response, self.repo, AcquisitionMethod::Api, self.tracker.now());
            if let AnalyzerError::RateLimitExhausted { reset_at: Some(reset_at), .. } = &err {
                self.tracker.mark_exhausted(self.credential, QuotaPool::Core, *reset_at);
                if !throttled {
                    throttled = true;
                    continue;
                }
            }
            return Err(err);
        }
    }

    /// Wait out a blocked quota when the wait is short enough, otherwise fail.
    async fn gate(&self) -> Result<(), AnalyzerError> {
        if self.tracker.can_proceed(self.credential, AcquisitionMethod::Api) {
            return Ok(());
        }
        let wait = self.tracker.wait_hint(self.credential, QuotaPool::Core).unwrap_or_default();
        if wait <= self.policy.max_rate_limit_wait {
            tracing::info!(?wait, "rate limit reached, waiting for reset");
            self.tracker.clock().sleep(wait).await;
            return Ok(());
        }
        Err(AnalyzerError::RateLimitExhausted {
            method: AcquisitionMethod::Api,
            reset_at: self.tracker.snapshot(self.credential, QuotaPool::Core).map(|s| s.reset_at),
        })
    }
}

/// Decode an inline base64 payload. GitHub wraps it at 60 columns.
pub fn decode_content(entry: &ContentEntry) -> Option<Vec<u8>> {
    match (entry.encoding.as_deref(), entry.content.as_deref()) {
        (Some("base64"), Some(encoded)) => {
            let compact: String = encoded.chars().filter(|c| !c.is_whitespace()).collect();
            base64::engine::general_purpose::STANDARD.decode(compact).ok()
        }
        (_, Some("")) | (_, None) if entry.size == 0 => Some(Vec::new()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(content: Option<&str>, encoding: Option<&str>, size: u64) -> ContentEntry {
        ContentEntry {
            name: "a.py".into(),
            path: "src/a.py".into(),
            kind: EntryKind::File,
            size,
            content: content.map(str::to_string),
            encoding: encoding.map(str::to_string),
        }
    }

    #[test]
    fn decodes_wrapped_base64() {
        let e = entry(Some("cHJp\nbnQo\nMSkK\n"), Some("base64"), 9);
        assert_eq!(decode_content(&e).as_deref(), Some(&b"print(1)\n"[..]));
    }

    #[test]
    fn empty_file_decodes_to_empty() {
        assert_eq!(decode_content(&entry(Some(""), Some("none"), 0)), Some(Vec::new()));
    }

    #[test]
    fn oversized_file_has_no_inline_content() {
        assert_eq!(decode_content(&entry(Some(""), Some("none"), 5_000_000)), None);
    }
}
