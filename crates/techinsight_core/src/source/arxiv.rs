//! arXiv export API client.
//!
//! # Responsibility
//! - Query the arXiv Atom API with submission-date descending order.
//! - Page through results with a fixed inter-request delay.
//! - Retry transient failures with linear backoff.
//! - Map Atom entries into canonical `Paper` records.
//!
//! # Invariants
//! - One `reqwest::Client` per source instance, reused for every request.
//! - Consecutive requests are separated by at least `delay`.
//! - Output is sorted newest first and truncated to `max_results`.
//! - A page shorter than the feed's `totalResults` allows goes back through
//!   the retry path; only a short page at the end of the result set stops
//!   paging.

use crate::model::paper::{Paper, RawPaper};
use crate::source::{sort_newest_first, PaperSource, SourceError, SourceResult};
use async_trait::async_trait;
use log::{debug, info, warn};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use std::time::{Duration, Instant};

pub const DEFAULT_BASE_URL: &str = "https://export.arxiv.org/api/query";
const USER_AGENT: &str = concat!("techinsight/", env!("CARGO_PKG_VERSION"));
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const MAX_ERROR_BODY_CHARS: usize = 200;

static WHITESPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid ws regex"));

/// Transport and pagination settings for [`ArxivSource`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArxivConfig {
    pub base_url: String,
    /// Results requested per page.
    pub page_size: usize,
    /// Minimum pause between consecutive requests; also the backoff unit.
    pub delay: Duration,
    /// Extra attempts per page after the first failure.
    pub num_retries: u32,
}

impl Default for ArxivConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            page_size: 10,
            delay: Duration::from_secs(3),
            num_retries: 3,
        }
    }
}

/// [`PaperSource`] backed by the arXiv export API.
pub struct ArxivSource {
    client: reqwest::Client,
    config: ArxivConfig,
    last_request: tokio::sync::Mutex<Option<Instant>>,
}

impl ArxivSource {
    /// Builds the source and its shared HTTP client.
    pub fn new(config: ArxivConfig) -> SourceResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .connect_timeout(CONNECT_TIMEOUT)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|err| SourceError::Client(err.to_string()))?;
        Ok(Self::with_client(config, client))
    }

    /// Builds the source around an existing HTTP client.
    pub fn with_client(config: ArxivConfig, client: reqwest::Client) -> Self {
        Self {
            client,
            config,
            last_request: tokio::sync::Mutex::new(None),
        }
    }

    pub fn config(&self) -> &ArxivConfig {
        &self.config
    }

    /// Fetches and parses one page, retrying transient failures.
    ///
    /// A page holding fewer entries than the feed's own `totalResults`
    /// promises is treated as transient as well.
    async fn fetch_page_with_retry(
        &self,
        query: &str,
        start: usize,
        page_len: usize,
    ) -> SourceResult<FeedPage> {
        let max_attempts = self.config.num_retries.saturating_add(1);
        let mut attempt = 0;
        loop {
            attempt += 1;
            let outcome = match self.fetch_page(query, start, page_len).await {
                Ok(body) => parse_feed(&body)
                    .and_then(|page| ensure_page_complete(page, start, page_len)),
                Err(err) => Err(err),
            };
            match outcome {
                Ok(page) => return Ok(page),
                Err(err) if err.is_retryable() && attempt < max_attempts => {
                    let backoff = self.config.delay.saturating_mul(attempt);
                    warn!(
                        "event=arxiv_request module=source status=retry attempt={} start={} backoff_ms={} error={}",
                        attempt,
                        start,
                        backoff.as_millis(),
                        err
                    );
                    tokio::time::sleep(backoff).await;
                }
                Err(err) if err.is_retryable() => {
                    return Err(SourceError::RetriesExhausted {
                        attempts: attempt,
                        last: Box::new(err),
                    });
                }
                Err(err) => return Err(err),
            }
        }
    }

    async fn fetch_page(&self, query: &str, start: usize, page_len: usize) -> SourceResult<String> {
        self.wait_for_request_slot().await;

        let start_param = start.to_string();
        let len_param = page_len.to_string();
        let response = self
            .client
            .get(&self.config.base_url)
            .query(&[
                ("search_query", query),
                ("start", start_param.as_str()),
                ("max_results", len_param.as_str()),
                ("sortBy", "submittedDate"),
                ("sortOrder", "descending"),
            ])
            .send()
            .await
            .map_err(|err| SourceError::Transport(err.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|err| SourceError::Transport(err.to_string()))?;
        if !status.is_success() {
            return Err(SourceError::Status {
                status: status.as_u16(),
                body: body.chars().take(MAX_ERROR_BODY_CHARS).collect(),
            });
        }
        Ok(body)
    }

    async fn wait_for_request_slot(&self) {
        let mut last = self.last_request.lock().await;
        if let Some(previous) = *last {
            let elapsed = previous.elapsed();
            if elapsed < self.config.delay {
                tokio::time::sleep(self.config.delay - elapsed).await;
            }
        }
        *last = Some(Instant::now());
    }
}

#[async_trait]
impl PaperSource for ArxivSource {
    fn name(&self) -> &str {
        "arxiv"
    }

    async fn fetch(&self, query: &str, max_results: usize) -> SourceResult<Vec<Paper>> {
        if max_results == 0 {
            return Ok(Vec::new());
        }

        let started_at = Instant::now();
        let page_size = self.config.page_size.max(1);
        let mut papers = Vec::new();
        let mut start = 0;

        while start < max_results {
            let page_len = page_size.min(max_results - start);
            let page = self.fetch_page_with_retry(query, start, page_len).await?;
            let entry_count = page.entries.len();
            debug!(
                "event=arxiv_page module=source status=ok start={} entries={} total={:?}",
                start, entry_count, page.total_results
            );

            papers.extend(map_entries(page.entries));
            let reached_total = page
                .total_results
                .is_some_and(|total| start + entry_count >= total);
            if entry_count < page_len || reached_total {
                break;
            }
            start += entry_count;
        }

        sort_newest_first(&mut papers);
        papers.truncate(max_results);
        info!(
            "event=source_fetch module=source status=ok source=arxiv results={} duration_ms={}",
            papers.len(),
            started_at.elapsed().as_millis()
        );
        Ok(papers)
    }
}

#[derive(Debug, Deserialize)]
struct AtomFeed {
    /// `opensearch:totalResults`; matched by local name.
    #[serde(rename = "totalResults")]
    total_results: Option<usize>,
    #[serde(rename = "entry", default)]
    entries: Vec<AtomEntry>,
}

/// One parsed response page.
#[derive(Debug)]
struct FeedPage {
    entries: Vec<RawPaper>,
    /// Hits the index reports for the whole query, when present.
    total_results: Option<usize>,
}

#[derive(Debug, Deserialize)]
struct AtomEntry {
    id: Option<String>,
    title: Option<String>,
    summary: Option<String>,
    published: Option<String>,
    #[serde(rename = "author", default)]
    authors: Vec<AtomAuthor>,
    #[serde(rename = "link", default)]
    links: Vec<AtomLink>,
    #[serde(rename = "category", default)]
    categories: Vec<AtomCategory>,
}

#[derive(Debug, Deserialize)]
struct AtomAuthor {
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AtomLink {
    #[serde(rename = "@href")]
    href: Option<String>,
    #[serde(rename = "@title")]
    title: Option<String>,
    #[serde(rename = "@type")]
    media_type: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AtomCategory {
    #[serde(rename = "@term")]
    term: Option<String>,
}

/// Parses one Atom response page into raw entries.
///
/// arXiv reports malformed queries as a single entry whose id points at
/// `/api/errors`; that case is surfaced as `SourceError::Rejected`.
fn parse_feed(body: &str) -> SourceResult<FeedPage> {
    let feed: AtomFeed =
        quick_xml::de::from_str(body).map_err(|err| SourceError::Parse(err.to_string()))?;

    let mut entries = Vec::with_capacity(feed.entries.len());
    for entry in feed.entries {
        if entry
            .id
            .as_deref()
            .is_some_and(|id| id.contains("/api/errors"))
        {
            let message = entry.summary.as_deref().map(collapse_whitespace);
            return Err(SourceError::Rejected(
                message.unwrap_or_else(|| "unknown query error".to_string()),
            ));
        }
        entries.push(entry_to_raw(entry));
    }
    Ok(FeedPage {
        entries,
        total_results: feed.total_results,
    })
}

/// Rejects a page that is shorter than the advertised total allows.
///
/// arXiv occasionally answers with an empty or truncated page while more
/// results exist; without this check that would read as "no matches".
fn ensure_page_complete(page: FeedPage, start: usize, page_len: usize) -> SourceResult<FeedPage> {
    if let Some(total) = page.total_results {
        let expected = page_len.min(total.saturating_sub(start));
        if page.entries.len() < expected {
            return Err(SourceError::IncompletePage {
                expected,
                received: page.entries.len(),
            });
        }
    }
    Ok(page)
}

fn entry_to_raw(entry: AtomEntry) -> RawPaper {
    let pdf_link = pdf_link_for(&entry);
    RawPaper {
        id: entry.id,
        title: entry.title.as_deref().map(collapse_whitespace),
        authors: entry
            .authors
            .into_iter()
            .filter_map(|author| author.name.map(|name| collapse_whitespace(&name)))
            .collect(),
        abstract_text: entry.summary.as_deref().map(collapse_whitespace),
        categories: entry
            .categories
            .into_iter()
            .filter_map(|category| category.term)
            .collect(),
        published_date: entry.published,
        pdf_link,
    }
}

fn pdf_link_for(entry: &AtomEntry) -> Option<String> {
    entry
        .links
        .iter()
        .find(|link| link.title.as_deref() == Some("pdf"))
        .or_else(|| {
            entry
                .links
                .iter()
                .find(|link| link.media_type.as_deref() == Some("application/pdf"))
        })
        .and_then(|link| link.href.clone())
        .or_else(|| {
            entry
                .id
                .as_deref()
                .filter(|id| id.contains("/abs/"))
                .map(|id| id.replacen("/abs/", "/pdf/", 1))
        })
}

fn map_entries(entries: Vec<RawPaper>) -> Vec<Paper> {
    entries
        .into_iter()
        .filter_map(|raw| {
            let source_id = raw.id.clone().unwrap_or_default();
            match Paper::from_raw(raw) {
                Ok(paper) => Some(paper),
                Err(err) => {
                    warn!(
                        "event=paper_map module=source status=dropped source_id={} error={}",
                        source_id, err
                    );
                    None
                }
            }
        })
        .collect()
}

fn collapse_whitespace(value: &str) -> String {
    WHITESPACE_RE.replace_all(value.trim(), " ").into_owned()
}
