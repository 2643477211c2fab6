//! Paper domain model.
//!
//! # Responsibility
//! - Define the canonical record for one external research paper.
//! - Own the single validation path from raw source hits into `Paper`.
//!
//! # Invariants
//! - `id` is the normalized trailing segment of the source identifier and is
//!   never empty.
//! - `authors` and `categories` keep source order; duplicates are allowed.
//! - `published_date` is always UTC.

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Stable external identifier of a paper (e.g. `2312.12345v1`).
pub type PaperId = String;

/// Validation errors raised when a raw hit cannot become a `Paper`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaperValidationError {
    /// A required field was absent in the raw hit.
    MissingField(&'static str),
    /// Identifier is empty after URL prefix stripping.
    EmptyId,
    /// `published_date` text is not a recognized timestamp.
    InvalidPublishedDate(String),
}

impl Display for PaperValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingField(field) => write!(f, "paper field `{field}` is required"),
            Self::EmptyId => write!(f, "paper id must not be empty"),
            Self::InvalidPublishedDate(value) => {
                write!(f, "published_date `{value}` is not a valid timestamp")
            }
        }
    }
}

impl Error for PaperValidationError {}

/// Source-shaped paper record before validation.
///
/// Every scalar is optional so mappers can forward whatever the source gave
/// them and leave the required-field policy to [`Paper::from_raw`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawPaper {
    pub id: Option<String>,
    pub title: Option<String>,
    #[serde(default)]
    pub authors: Vec<String>,
    #[serde(rename = "abstract")]
    pub abstract_text: Option<String>,
    #[serde(default)]
    pub categories: Vec<String>,
    pub published_date: Option<String>,
    pub pdf_link: Option<String>,
}

/// Canonical research paper record.
///
/// Fields are private: the only way in is [`Paper::from_raw`] (or
/// deserialization, which goes through the same path).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawPaper")]
pub struct Paper {
    id: PaperId,
    title: String,
    authors: Vec<String>,
    #[serde(rename = "abstract")]
    abstract_text: String,
    categories: Vec<String>,
    published_date: DateTime<Utc>,
    pdf_link: String,
}

impl Paper {
    /// Validates a raw hit and builds the canonical record.
    ///
    /// # Errors
    /// - `MissingField` when `id`, `title`, `abstract`, `published_date` or
    ///   `pdf_link` is absent.
    /// - `EmptyId` when the id has no trailing segment.
    /// - `InvalidPublishedDate` when the timestamp cannot be parsed.
    pub fn from_raw(raw: RawPaper) -> Result<Self, PaperValidationError> {
        let raw_id = raw.id.ok_or(PaperValidationError::MissingField("id"))?;
        let id = normalize_source_id(&raw_id);
        if id.is_empty() {
            return Err(PaperValidationError::EmptyId);
        }

        let title = raw.title.ok_or(PaperValidationError::MissingField("title"))?;
        let abstract_text = raw
            .abstract_text
            .ok_or(PaperValidationError::MissingField("abstract"))?;
        let published_text = raw
            .published_date
            .ok_or(PaperValidationError::MissingField("published_date"))?;
        let published_date = parse_published_date(&published_text)?;
        let pdf_link = raw
            .pdf_link
            .ok_or(PaperValidationError::MissingField("pdf_link"))?;

        Ok(Self {
            id,
            title,
            authors: raw.authors,
            abstract_text,
            categories: raw.categories,
            published_date,
            pdf_link,
        })
    }

    /// Maps this record back into the raw source shape.
    pub fn to_raw(&self) -> RawPaper {
        RawPaper {
            id: Some(self.id.clone()),
            title: Some(self.title.clone()),
            authors: self.authors.clone(),
            abstract_text: Some(self.abstract_text.clone()),
            categories: self.categories.clone(),
            published_date: Some(format_published_date(&self.published_date)),
            pdf_link: Some(self.pdf_link.clone()),
        }
    }

    /// Re-checks invariants on a record that was rebuilt outside `from_raw`.
    pub fn validate(&self) -> Result<(), PaperValidationError> {
        if self.id.is_empty() || self.id.contains('/') {
            return Err(PaperValidationError::EmptyId);
        }
        Ok(())
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn authors(&self) -> &[String] {
        &self.authors
    }

    pub fn abstract_text(&self) -> &str {
        &self.abstract_text
    }

    pub fn categories(&self) -> &[String] {
        &self.categories
    }

    pub fn published_date(&self) -> DateTime<Utc> {
        self.published_date
    }

    pub fn pdf_link(&self) -> &str {
        &self.pdf_link
    }
}

impl TryFrom<RawPaper> for Paper {
    type Error = PaperValidationError;

    fn try_from(value: RawPaper) -> Result<Self, Self::Error> {
        Self::from_raw(value)
    }
}

/// Strips any URL path prefix from a source identifier.
///
/// `http://arxiv.org/abs/2101.12345v1` becomes `2101.12345v1`. Trailing
/// slashes are ignored so `.../abs/2101.12345/` keeps its identifier.
pub fn normalize_source_id(value: &str) -> String {
    value
        .trim()
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or_default()
        .to_string()
}

/// Parses source timestamps into UTC.
///
/// Accepts RFC 3339, naive `YYYY-MM-DDTHH:MM:SS[.f]` (read as UTC) and bare
/// `YYYY-MM-DD` (midnight UTC).
pub fn parse_published_date(value: &str) -> Result<DateTime<Utc>, PaperValidationError> {
    let trimmed = value.trim();

    if let Ok(parsed) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(parsed.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%dT%H:%M:%S%.f") {
        return Ok(naive.and_utc());
    }
    if let Some(midnight) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
    {
        return Ok(midnight.and_utc());
    }

    Err(PaperValidationError::InvalidPublishedDate(trimmed.to_string()))
}

/// Formats a timestamp as RFC 3339 UTC text.
pub fn format_published_date(value: &DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

#[cfg(test)]
mod tests {
    use super::{normalize_source_id, parse_published_date, PaperValidationError};
    use chrono::{TimeZone, Utc};

    #[test]
    fn normalize_source_id_keeps_trailing_segment() {
        assert_eq!(
            normalize_source_id("http://arxiv.org/abs/2101.12345v1"),
            "2101.12345v1"
        );
        assert_eq!(normalize_source_id("2101.12345"), "2101.12345");
        assert_eq!(
            normalize_source_id(" http://arxiv.org/abs/2101.12345/ "),
            "2101.12345"
        );
        assert_eq!(normalize_source_id("///"), "");
    }

    #[test]
    fn parse_published_date_accepts_supported_shapes() {
        let expected = Utc.with_ymd_and_hms(2023, 12, 28, 10, 0, 0).unwrap();
        assert_eq!(
            parse_published_date("2023-12-28T10:00:00Z").unwrap(),
            expected
        );
        assert_eq!(
            parse_published_date("2023-12-28T12:00:00+02:00").unwrap(),
            expected
        );
        assert_eq!(parse_published_date("2023-12-28T10:00:00").unwrap(), expected);
        assert_eq!(
            parse_published_date("2023-12-28").unwrap(),
            Utc.with_ymd_and_hms(2023, 12, 28, 0, 0, 0).unwrap()
        );
    }

    #[test]
    fn parse_published_date_rejects_garbage() {
        let err = parse_published_date("last tuesday").unwrap_err();
        assert_eq!(
            err,
            PaperValidationError::InvalidPublishedDate("last tuesday".to_string())
        );
    }
}
