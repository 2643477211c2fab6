//! Paper sync use-case service.
//!
//! # Responsibility
//! - Compose a `PaperSource` and the shared `PaperCache` into the
//!   fetch-then-cache read paths used by request handlers.
//! - Apply the configured storage failure policy.
//!
//! # Invariants
//! - Source failures never escape: they are logged and the call returns an
//!   empty list without touching the cache.
//! - Reads return the freshly fetched list, not the cache contents.
//! - An empty fetch never opens a write transaction.
//! - Cache writes run on the blocking pool; a sync never parks a runtime
//!   worker while SQLite waits on a lock or the disk.

use crate::model::paper::Paper;
use crate::repo::paper_cache::PaperCache;
use crate::repo::paper_repo::RepoError;
use crate::source::{topic_query, PaperSource, SourceResult};
use log::{error, info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Instant;

pub const DEFAULT_MAX_RESULTS: usize = 20;
pub const DEFAULT_SYNC_MAX_RESULTS: usize = 10;

/// What to do when persisting a fetched batch fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StoreFailurePolicy {
    /// Surface the failure as `SyncError::Storage`.
    #[default]
    Propagate,
    /// Log the failure and still return the fetched papers.
    LogAndContinue,
}

impl StoreFailurePolicy {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Propagate => "propagate",
            Self::LogAndContinue => "log",
        }
    }
}

impl FromStr for StoreFailurePolicy {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "propagate" => Ok(Self::Propagate),
            "log" | "log_and_continue" => Ok(Self::LogAndContinue),
            other => Err(format!(
                "unsupported store failure policy `{other}`; expected propagate|log"
            )),
        }
    }
}

/// Tunables for [`SyncService`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncOptions {
    /// Result bound for `get_latest` / `get_by_topic`.
    pub default_max_results: usize,
    /// Default result bound for explicit syncs.
    pub sync_max_results: usize,
    pub store_failure: StoreFailurePolicy,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            default_max_results: DEFAULT_MAX_RESULTS,
            sync_max_results: DEFAULT_SYNC_MAX_RESULTS,
            store_failure: StoreFailurePolicy::default(),
        }
    }
}

pub type SyncResult<T> = Result<T, SyncError>;

#[derive(Debug)]
pub enum SyncError {
    /// Cache write or read failed under `StoreFailurePolicy::Propagate`.
    Storage(RepoError),
    /// The blocking cache write was cancelled before it finished.
    StoreCancelled(String),
}

impl Display for SyncError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Storage(err) => write!(f, "paper cache failure: {err}"),
            Self::StoreCancelled(message) => write!(f, "paper cache write cancelled: {message}"),
        }
    }
}

impl Error for SyncError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Storage(err) => Some(err),
            Self::StoreCancelled(_) => None,
        }
    }
}

impl From<RepoError> for SyncError {
    fn from(value: RepoError) -> Self {
        Self::Storage(value)
    }
}

/// Fetch-then-cache orchestrator.
pub struct SyncService<S: PaperSource> {
    cache: Arc<PaperCache>,
    source: S,
    options: SyncOptions,
}

impl<S: PaperSource> SyncService<S> {
    pub fn new(cache: Arc<PaperCache>, source: S) -> Self {
        Self::with_options(cache, source, SyncOptions::default())
    }

    pub fn with_options(cache: Arc<PaperCache>, source: S, options: SyncOptions) -> Self {
        Self {
            cache,
            source,
            options,
        }
    }

    pub fn options(&self) -> &SyncOptions {
        &self.options
    }

    pub fn cache(&self) -> &Arc<PaperCache> {
        &self.cache
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Fetches up to `max_results` papers for `query` and caches them.
    ///
    /// Returns the number of papers fetched.
    pub async fn sync(&self, query: &str, max_results: usize) -> SyncResult<usize> {
        let papers = self.fetch_and_store("sync", query, max_results).await?;
        Ok(papers.len())
    }

    /// Fetches the newest papers across the default topics.
    pub async fn get_latest(&self) -> SyncResult<Vec<Paper>> {
        let max_results = self.options.default_max_results;
        let started_at = Instant::now();
        let fetched = self.source.fetch_recent_default_topics(max_results).await;
        self.complete_fetch("latest", max_results, fetched, started_at)
            .await
    }

    /// Fetches papers matching `topic` across all fields.
    pub async fn get_by_topic(&self, topic: &str) -> SyncResult<Vec<Paper>> {
        let query = topic_query(topic);
        self.fetch_and_store("topic", &query, self.options.default_max_results)
            .await
    }

    /// Read-only view of the newest cached papers.
    pub fn list_cached(&self, limit: u32) -> SyncResult<Vec<Paper>> {
        Ok(self.cache.list_recent(limit)?)
    }

    async fn fetch_and_store(
        &self,
        operation: &'static str,
        query: &str,
        max_results: usize,
    ) -> SyncResult<Vec<Paper>> {
        let started_at = Instant::now();
        let fetched = self.source.fetch(query, max_results).await;
        self.complete_fetch(operation, max_results, fetched, started_at)
            .await
    }

    async fn complete_fetch(
        &self,
        operation: &'static str,
        max_results: usize,
        fetched: SourceResult<Vec<Paper>>,
        started_at: Instant,
    ) -> SyncResult<Vec<Paper>> {
        let papers = match fetched {
            Ok(papers) => papers,
            Err(err) => {
                warn!(
                    "event=sync_fetch module=service status=error op={} source={} duration_ms={} error={}",
                    operation,
                    self.source.name(),
                    started_at.elapsed().as_millis(),
                    err
                );
                return Ok(Vec::new());
            }
        };
        info!(
            "event=sync_fetch module=service status=ok op={} source={} max_results={} fetched={} duration_ms={}",
            operation,
            self.source.name(),
            max_results,
            papers.len(),
            started_at.elapsed().as_millis()
        );
        self.store(papers, operation).await
    }

    /// Writes `papers` through the cache on the blocking pool and hands
    /// them back once the write has settled.
    async fn store(&self, papers: Vec<Paper>, operation: &'static str) -> SyncResult<Vec<Paper>> {
        if papers.is_empty() {
            return Ok(papers);
        }
        let cache = Arc::clone(&self.cache);
        let joined = tokio::task::spawn_blocking(move || {
            let written = cache.upsert_many(&papers);
            (papers, written)
        })
        .await;
        let (papers, written) = match joined {
            Ok(outcome) => outcome,
            Err(err) if err.is_panic() => std::panic::resume_unwind(err.into_panic()),
            Err(err) => return Err(SyncError::StoreCancelled(err.to_string())),
        };
        match written {
            Ok(_) => Ok(papers),
            Err(err) => match self.options.store_failure {
                StoreFailurePolicy::Propagate => Err(SyncError::Storage(err)),
                StoreFailurePolicy::LogAndContinue => {
                    error!(
                        "event=sync_store module=service status=degraded op={} policy={} error={}",
                        operation,
                        self.options.store_failure.as_str(),
                        err
                    );
                    Ok(papers)
                }
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::StoreFailurePolicy;

    #[test]
    fn store_failure_policy_parses_known_values() {
        assert_eq!(
            "Propagate".parse::<StoreFailurePolicy>().unwrap(),
            StoreFailurePolicy::Propagate
        );
        assert_eq!(
            " log ".parse::<StoreFailurePolicy>().unwrap(),
            StoreFailurePolicy::LogAndContinue
        );
        assert!("retry".parse::<StoreFailurePolicy>().is_err());
    }
}
