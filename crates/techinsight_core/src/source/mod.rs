//! Paper source abstraction.
//!
//! # Responsibility
//! - Define how canonical papers are pulled from an external paper index.
//! - Keep "no matches" and "source unavailable" distinguishable for callers.
//!
//! # Invariants
//! - `fetch` returns at most `max_results` papers, newest submission first.
//! - `max_results == 0` yields `Ok(vec![])` without touching the network.
//! - Records that fail validation are dropped individually; one bad hit
//!   never discards the rest of the batch.

pub mod arxiv;

use crate::model::paper::Paper;
use async_trait::async_trait;
use log::warn;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Fixed query used when no caller-specific query is given.
pub const DEFAULT_TOPICS_QUERY: &str = "cat:cs.AI OR cat:cs.LG OR cat:cs.SE";

pub type SourceResult<T> = Result<T, SourceError>;

/// Failure to obtain results from the external index.
#[derive(Debug)]
pub enum SourceError {
    /// HTTP client could not be constructed.
    Client(String),
    /// Network-level failure (connect, timeout, body read).
    Transport(String),
    /// Non-success HTTP status.
    Status { status: u16, body: String },
    /// Response payload is not a well-formed feed.
    Parse(String),
    /// The index answered with an explicit query error.
    Rejected(String),
    /// Page held fewer entries than the advertised total allows.
    IncompletePage { expected: usize, received: usize },
    /// Retry budget spent; carries the last failure.
    RetriesExhausted { attempts: u32, last: Box<SourceError> },
}

impl SourceError {
    /// Whether another attempt may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Transport(_) | Self::IncompletePage { .. } => true,
            Self::Status { status, .. } => *status == 429 || *status >= 500,
            Self::Client(_) | Self::Parse(_) | Self::Rejected(_) => false,
            Self::RetriesExhausted { .. } => false,
        }
    }
}

impl Display for SourceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Client(message) => write!(f, "failed to build source client: {message}"),
            Self::Transport(message) => write!(f, "source request failed: {message}"),
            Self::Status { status, body } => {
                write!(f, "source returned status {status}: {body}")
            }
            Self::Parse(message) => write!(f, "failed to parse source response: {message}"),
            Self::Rejected(message) => write!(f, "source rejected query: {message}"),
            Self::IncompletePage { expected, received } => {
                write!(f, "source returned {received} of {expected} expected entries")
            }
            Self::RetriesExhausted { attempts, last } => {
                write!(f, "source unavailable after {attempts} attempts: {last}")
            }
        }
    }
}

impl Error for SourceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::RetriesExhausted { last, .. } => Some(last.as_ref()),
            _ => None,
        }
    }
}

/// External paper index client.
#[async_trait]
pub trait PaperSource: Send + Sync {
    /// Human-readable source name for logging.
    fn name(&self) -> &str;

    /// Runs `query` (in the index's own syntax) and returns up to
    /// `max_results` papers, newest first.
    async fn fetch(&self, query: &str, max_results: usize) -> SourceResult<Vec<Paper>>;

    /// Fetches the newest papers across [`DEFAULT_TOPICS_QUERY`].
    async fn fetch_recent_default_topics(&self, max_results: usize) -> SourceResult<Vec<Paper>> {
        self.fetch(DEFAULT_TOPICS_QUERY, max_results).await
    }

    /// Fail-soft variant of [`PaperSource::fetch`]: any error is logged and
    /// collapsed into an empty list.
    async fn fetch_or_empty(&self, query: &str, max_results: usize) -> Vec<Paper> {
        match self.fetch(query, max_results).await {
            Ok(papers) => papers,
            Err(err) => {
                warn!(
                    "event=source_fetch module=source status=error source={} error={}",
                    self.name(),
                    err
                );
                Vec::new()
            }
        }
    }
}

/// Wraps a free-form topic into a match-all-fields query.
pub fn topic_query(topic: &str) -> String {
    format!("all:{}", topic.trim())
}

/// Orders papers newest first; equal timestamps keep their relative order.
pub fn sort_newest_first(papers: &mut [Paper]) {
    papers.sort_by(|left, right| right.published_date().cmp(&left.published_date()));
}
