//! Per-credential, per-pool quota bookkeeping.

use super::clock::Clock;
use crate::auth::{Credential, CredentialKey};
use crate::domain::{AcquisitionMethod, ArchiveEndpoint};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

/// Independently metered request budgets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum QuotaPool {
    /// REST API, shared by metadata, listings, content and the zipball endpoint.
    Core,
    /// Web host archive downloads.
    Archive,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RateLimitState {
    pub limit: u64,
    pub remaining: u64,
    pub reset_at: DateTime<Utc>,
}

impl RateLimitState {
    /// Blocked iff the budget is spent and the window has not reset yet.
    pub fn blocks_at(&self, now: DateTime<Utc>) -> bool {
        self.remaining == 0 && now < self.reset_at
    }
}

/// Holds the latest quota view for every (credential, pool) pair seen in a run.
///
/// Updates lock only the affected map shard, so concurrent requests for one
/// credential serialize while unrelated credentials proceed.
pub struct RateLimitTracker {
    clock: Arc<dyn Clock>,
    archive_endpoint: ArchiveEndpoint,
    states: DashMap<(CredentialKey, QuotaPool), RateLimitState>,
}

impl RateLimitTracker {
    pub fn new(clock: Arc<dyn Clock>, archive_endpoint: ArchiveEndpoint) -> Self {
        Self { clock, archive_endpoint, states: DashMap::new() }
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    pub fn pool_for(&self, method: AcquisitionMethod) -> QuotaPool {
        match (method, self.archive_endpoint) {
            (AcquisitionMethod::Archive, ArchiveEndpoint::Web) => QuotaPool::Archive,
            _ => QuotaPool::Core,
        }
    }

    /// Whether the API path draws from a different budget than the archive path.
    pub fn has_separate_quota(&self) -> bool {
        self.pool_for(AcquisitionMethod::Archive) != self.pool_for(AcquisitionMethod::Api)
    }

    /// Record a completed request: decrement, then refresh from `x-ratelimit-*`
    /// headers. A `retry-after` header marks the pool exhausted until then.
    pub fn record_outcome(
        &self,
        credential: &Credential,
        pool: QuotaPool,
        headers: &[(String, String)],
    ) {
        let now = self.clock.now();
        let header = |name: &str| {
            headers.iter().find(|(key, _)| key.eq_ignore_ascii_case(name)).map(|(_, v)| v.trim())
        };
        let limit = header("x-ratelimit-limit").and_then(|v| v.parse::<u64>().ok());
        let remaining = header("x-ratelimit-remaining").and_then(|v| v.parse::<u64>().ok());
        let reset = header("x-ratelimit-reset")
            .and_then(|v| v.parse::<i64>().ok())
            .and_then(|secs| DateTime::<Utc>::from_timestamp(secs, 0));
        let retry_after = header("retry-after").and_then(|v| v.parse::<i64>().ok());

        let mut entry = self
            .states
            .entry((credential.key().clone(), pool))
            .or_insert_with(|| fresh_state(credential, now));
        let state = entry.value_mut();

        if now >= state.reset_at && reset.is_none() {
            *state = fresh_state(credential, now);
        }
        state.remaining = state.remaining.saturating_sub(1);

        if let Some(limit) = limit {
            state.limit = limit;
        }
        if let Some(remaining) = remaining {
            state.remaining = remaining;
        }
        if let Some(reset) = reset {
            state.reset_at = reset;
        }
        if let Some(secs) = retry_after {
            state.remaining = 0;
            state.reset_at = now + chrono::Duration::seconds(secs.max(0));
        }

        tracing::debug!(
            credential = %credential.key(),
            ?pool,
            remaining = state.remaining,
            limit = state.limit,
            reset_at = %state.reset_at,
            "rate limit state updated"
        );
    }

    /// Record an explicit throttle signal without response headers.
    pub fn mark_exhausted(
        &self,
        credential: &Credential,
        pool: QuotaPool,
        reset_at: DateTime<Utc>,
    ) {
        let now = self.clock.now();
        let mut entry = self
            .states
            .entry((credential.key().clone(), pool))
            .or_insert_with(|| fresh_state(credential, now));
        entry.remaining = 0;
        entry.reset_at = reset_at;
    }

    pub fn can_proceed(&self, credential: &Credential, method: AcquisitionMethod) -> bool {
        self.can_proceed_in(credential, self.pool_for(method))
    }

    pub fn can_proceed_in(&self, credential: &Credential, pool: QuotaPool) -> bool {
        let now = self.clock.now();
        match self.states.get(&(credential.key().clone(), pool)) {
            Some(state) => !state.blocks_at(now),
            None => true,
        }
    }

    /// Time left until a blocked pool resets; `None` when requests may proceed.
    pub fn wait_hint(&self, credential: &Credential, pool: QuotaPool) -> Option<Duration> {
        let now = self.clock.now();
        let state = self.states.get(&(credential.key().clone(), pool))?;
        if !state.blocks_at(now) {
            return None;
        }
        (state.reset_at - now).to_std().ok()
    }

    pub fn snapshot(&self, credential: &Credential, pool: QuotaPool) -> Option<RateLimitState> {
        self.states.get(&(credential.key().clone(), pool)).map(|state| state.clone())
    }
}

fn fresh_state(credential: &Credential, now: DateTime<Utc>) -> RateLimitState {
    let limit = credential.tier().expected_hourly_limit();
    RateLimitState { limit, remaining: limit, reset_at: now + chrono::Duration::hours(1) }
}
