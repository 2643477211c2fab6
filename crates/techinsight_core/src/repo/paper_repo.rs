//! Paper repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Provide idempotent batch upsert and newest-first reads over `papers`.
//! - Keep SQL and column encoding details inside the persistence boundary.
//!
//! # Invariants
//! - A batch upsert commits in one transaction or not at all.
//! - Upsert replaces every column of an existing row (no field merge).
//! - `authors` / `categories` are stored as JSON arrays and decoded in order.
//! - `published_date` is stored as fixed-width RFC 3339 UTC text, so text
//!   order equals time order.
//! - Read paths reject invalid persisted state instead of masking it.

use crate::db::migrations::latest_version;
use crate::db::DbError;
use crate::model::paper::{Paper, PaperValidationError, RawPaper};
use chrono::SecondsFormat;
use rusqlite::{params, Connection, Row, TransactionBehavior};
use std::error::Error;
use std::fmt::{Display, Formatter};

const PAPER_SELECT_SQL: &str = "SELECT
    id,
    title,
    authors,
    abstract,
    categories,
    published_date,
    pdf_link
FROM papers";

const PAPER_UPSERT_SQL: &str = "INSERT INTO papers (
    id,
    title,
    authors,
    abstract,
    categories,
    published_date,
    pdf_link
) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
ON CONFLICT(id) DO UPDATE SET
    title = excluded.title,
    authors = excluded.authors,
    abstract = excluded.abstract,
    categories = excluded.categories,
    published_date = excluded.published_date,
    pdf_link = excluded.pdf_link;";

const PAPER_COLUMNS: [&str; 7] = [
    "id",
    "title",
    "authors",
    "abstract",
    "categories",
    "published_date",
    "pdf_link",
];

pub type RepoResult<T> = Result<T, RepoError>;

/// Storage fault taxonomy for paper persistence and query operations.
#[derive(Debug)]
pub enum RepoError {
    /// Paper failed invariant checks before write or after read.
    Validation(PaperValidationError),
    /// Underlying SQLite/bootstrap error.
    Db(DbError),
    /// JSON encoding of a sequence column failed.
    Serialization(serde_json::Error),
    /// Persisted row cannot be converted back into a valid `Paper`.
    InvalidData(String),
    /// Connection schema is not at the expected migrated version.
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    /// Required table is missing.
    MissingRequiredTable(&'static str),
    /// Required column is missing from expected table.
    MissingRequiredColumn {
        table: &'static str,
        column: &'static str,
    },
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::Serialization(err) => write!(f, "failed to encode paper column: {err}"),
            Self::InvalidData(message) => write!(f, "invalid persisted paper data: {message}"),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "paper repository requires schema version {expected_version}, got {actual_version}"
            ),
            Self::MissingRequiredTable(table) => {
                write!(f, "paper repository requires table `{table}`")
            }
            Self::MissingRequiredColumn { table, column } => write!(
                f,
                "paper repository requires column `{column}` in table `{table}`"
            ),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Db(err) => Some(err),
            Self::Serialization(err) => Some(err),
            Self::InvalidData(_) => None,
            Self::UninitializedConnection { .. } => None,
            Self::MissingRequiredTable(_) => None,
            Self::MissingRequiredColumn { .. } => None,
        }
    }
}

impl From<PaperValidationError> for RepoError {
    fn from(value: PaperValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

impl From<serde_json::Error> for RepoError {
    fn from(value: serde_json::Error) -> Self {
        Self::Serialization(value)
    }
}

/// Repository interface for the paper cache table.
pub trait PaperRepository {
    /// Inserts absent papers and fully replaces present ones, atomically.
    ///
    /// Returns the number of rows written.
    fn upsert_many(&mut self, papers: &[Paper]) -> RepoResult<usize>;
    /// Returns up to `limit` papers, newest `published_date` first.
    fn list_recent(&self, limit: u32) -> RepoResult<Vec<Paper>>;
    fn get_paper(&self, id: &str) -> RepoResult<Option<Paper>>;
    fn count_papers(&self) -> RepoResult<u64>;
}

/// SQLite-backed paper repository.
pub struct SqlitePaperRepository<'conn> {
    conn: &'conn mut Connection,
}

impl<'conn> SqlitePaperRepository<'conn> {
    /// Creates repository from a migrated connection.
    pub fn try_new(conn: &'conn mut Connection) -> RepoResult<Self> {
        ensure_paper_connection_ready(conn)?;
        Ok(Self { conn })
    }

    /// Wraps a connection already verified by `try_new`.
    pub(crate) fn from_verified(conn: &'conn mut Connection) -> Self {
        Self { conn }
    }
}

impl PaperRepository for SqlitePaperRepository<'_> {
    fn upsert_many(&mut self, papers: &[Paper]) -> RepoResult<usize> {
        if papers.is_empty() {
            return Ok(0);
        }

        let mut encoded = Vec::with_capacity(papers.len());
        for paper in papers {
            paper.validate()?;
            encoded.push(EncodedPaper::try_from_paper(paper)?);
        }

        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        {
            let mut stmt = tx.prepare_cached(PAPER_UPSERT_SQL)?;
            for row in &encoded {
                stmt.execute(params![
                    row.id,
                    row.title,
                    row.authors,
                    row.abstract_text,
                    row.categories,
                    row.published_date,
                    row.pdf_link,
                ])?;
            }
        }
        tx.commit()?;

        Ok(encoded.len())
    }

    fn list_recent(&self, limit: u32) -> RepoResult<Vec<Paper>> {
        if limit == 0 {
            return Ok(Vec::new());
        }

        let mut stmt = self.conn.prepare(&format!(
            "{PAPER_SELECT_SQL}
             ORDER BY published_date DESC, rowid ASC
             LIMIT ?1;"
        ))?;
        let mut rows = stmt.query([i64::from(limit)])?;
        let mut papers = Vec::new();

        while let Some(row) = rows.next()? {
            papers.push(parse_paper_row(row)?);
        }

        Ok(papers)
    }

    fn get_paper(&self, id: &str) -> RepoResult<Option<Paper>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{PAPER_SELECT_SQL} WHERE id = ?1;"))?;
        let mut rows = stmt.query([id])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_paper_row(row)?));
        }

        Ok(None)
    }

    fn count_papers(&self) -> RepoResult<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM papers;", [], |row| row.get(0))?;
        u64::try_from(count)
            .map_err(|_| RepoError::InvalidData(format!("negative row count `{count}`")))
    }
}

/// Column values for one paper, ready for binding.
struct EncodedPaper {
    id: String,
    title: String,
    authors: String,
    abstract_text: String,
    categories: String,
    published_date: String,
    pdf_link: String,
}

impl EncodedPaper {
    fn try_from_paper(paper: &Paper) -> RepoResult<Self> {
        Ok(Self {
            id: paper.id().to_string(),
            title: paper.title().to_string(),
            authors: serde_json::to_string(paper.authors())?,
            abstract_text: paper.abstract_text().to_string(),
            categories: serde_json::to_string(paper.categories())?,
            published_date: paper
                .published_date()
                .to_rfc3339_opts(SecondsFormat::Nanos, true),
            pdf_link: paper.pdf_link().to_string(),
        })
    }
}

fn parse_paper_row(row: &Row<'_>) -> RepoResult<Paper> {
    let id: String = row.get("id")?;

    let authors_text: String = row.get("authors")?;
    let authors = decode_string_list(&authors_text, &id, "papers.authors")?;
    let categories_text: String = row.get("categories")?;
    let categories = decode_string_list(&categories_text, &id, "papers.categories")?;

    let raw = RawPaper {
        id: Some(id.clone()),
        title: Some(row.get("title")?),
        authors,
        abstract_text: Some(row.get("abstract")?),
        categories,
        published_date: Some(row.get("published_date")?),
        pdf_link: Some(row.get("pdf_link")?),
    };

    let paper = Paper::from_raw(raw)
        .map_err(|err| RepoError::InvalidData(format!("row `{id}`: {err}")))?;
    if paper.id() != id {
        return Err(RepoError::InvalidData(format!(
            "non-normalized id `{id}` in papers.id"
        )));
    }
    Ok(paper)
}

fn decode_string_list(value: &str, id: &str, column: &'static str) -> RepoResult<Vec<String>> {
    serde_json::from_str(value).map_err(|err| {
        RepoError::InvalidData(format!("invalid JSON list in {column} for `{id}`: {err}"))
    })
}

fn ensure_paper_connection_ready(conn: &Connection) -> RepoResult<()> {
    let expected_version = latest_version();
    let actual_version: u32 = conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?;
    if actual_version != expected_version {
        return Err(RepoError::UninitializedConnection {
            expected_version,
            actual_version,
        });
    }

    if !table_exists(conn, "papers")? {
        return Err(RepoError::MissingRequiredTable("papers"));
    }

    for column in PAPER_COLUMNS {
        if !table_has_column(conn, "papers", column)? {
            return Err(RepoError::MissingRequiredColumn {
                table: "papers",
                column,
            });
        }
    }

    Ok(())
}

fn table_exists(conn: &Connection, table: &str) -> RepoResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM sqlite_master
            WHERE type = 'table' AND name = ?1
        );",
        [table],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

fn table_has_column(conn: &Connection, table: &str, column: &str) -> RepoResult<bool> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({table});"))?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let current: String = row.get(1)?;
        if current == column {
            return Ok(true);
        }
    }
    Ok(false)
}
