//! Shared, process-wide handle to the paper cache file.
//!
//! # Responsibility
//! - Own the single SQLite connection opened at process start.
//! - Expose thread-safe cache operations to concurrent request handlers.
//! - Emit `paper_upsert` / `paper_list` logging events.
//!
//! # Invariants
//! - The connection lock is held for exactly one repository call and never
//!   across an `.await`.
//! - The schema is verified once when the handle is opened; every operation
//!   then runs through `SqlitePaperRepository` and its validation rules.
//!
//! # Concurrency
//! - Within one process every call, reads included, is serialized on the
//!   single connection. A read issued while a batch upsert is running waits
//!   for that upsert to commit.
//! - WAL mode only buys concurrent readers across connections: other
//!   processes (or extra handles opened on the same file) can read while
//!   this handle writes.
//! - Every method blocks the calling thread, up to the 5 s busy timeout
//!   when another connection holds the write lock. Async callers doing
//!   writes run them on the blocking pool (see `SyncService`); the quick
//!   single-statement reads are called inline.

use crate::db::{open_db, open_db_in_memory};
use crate::model::paper::Paper;
use crate::repo::paper_repo::{PaperRepository, RepoResult, SqlitePaperRepository};
use log::{debug, error, info};
use rusqlite::Connection;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use std::time::Instant;

/// Thread-safe paper cache backed by one SQLite connection.
pub struct PaperCache {
    conn: Mutex<Connection>,
    location: Option<PathBuf>,
}

impl PaperCache {
    /// Opens (creating if needed) the cache file and verifies its schema.
    pub fn open(path: impl AsRef<Path>) -> RepoResult<Self> {
        let path = path.as_ref();
        let conn = open_db(path)?;
        Self::from_connection(conn, Some(path.to_path_buf()))
    }

    /// Opens a throwaway in-memory cache.
    pub fn open_in_memory() -> RepoResult<Self> {
        let conn = open_db_in_memory()?;
        Self::from_connection(conn, None)
    }

    fn from_connection(mut conn: Connection, location: Option<PathBuf>) -> RepoResult<Self> {
        SqlitePaperRepository::try_new(&mut conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
            location,
        })
    }

    /// Backing file path, `None` for in-memory caches.
    pub fn location(&self) -> Option<&Path> {
        self.location.as_deref()
    }

    /// Idempotently stores a batch of papers in one transaction.
    ///
    /// Returns the number of rows written; an empty batch is a no-op.
    pub fn upsert_many(&self, papers: &[Paper]) -> RepoResult<usize> {
        let started_at = Instant::now();
        let result = self.with_repo(|repo| repo.upsert_many(papers));
        match &result {
            Ok(written) => info!(
                "event=paper_upsert module=repo status=ok rows={} duration_ms={}",
                written,
                started_at.elapsed().as_millis()
            ),
            Err(err) => error!(
                "event=paper_upsert module=repo status=error rows={} duration_ms={} error={}",
                papers.len(),
                started_at.elapsed().as_millis(),
                err
            ),
        }
        result
    }

    /// Returns up to `limit` stored papers, newest first.
    pub fn list_recent(&self, limit: u32) -> RepoResult<Vec<Paper>> {
        let result = self.with_repo(|repo| repo.list_recent(limit));
        match &result {
            Ok(papers) => debug!(
                "event=paper_list module=repo status=ok limit={} rows={}",
                limit,
                papers.len()
            ),
            Err(err) => error!(
                "event=paper_list module=repo status=error limit={} error={}",
                limit, err
            ),
        }
        result
    }

    pub fn get_paper(&self, id: &str) -> RepoResult<Option<Paper>> {
        self.with_repo(|repo| repo.get_paper(id))
    }

    pub fn count_papers(&self) -> RepoResult<u64> {
        self.with_repo(|repo| repo.count_papers())
    }

    fn with_repo<T, F>(&self, op: F) -> RepoResult<T>
    where
        F: FnOnce(&mut SqlitePaperRepository<'_>) -> RepoResult<T>,
    {
        // Uncommitted work rolls back on drop, so a poisoned lock is usable.
        let mut guard = self.conn.lock().unwrap_or_else(PoisonError::into_inner);
        let mut repo = SqlitePaperRepository::from_verified(&mut guard);
        op(&mut repo)
    }
}
