//! Core domain logic for the TechInsight research backend.
//! Paper model, arXiv source, SQLite cache and the sync orchestrator live here;
//! the HTTP surface is a thin layer on top.

pub mod config;
pub mod db;
pub mod intent;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;
pub mod source;

pub use config::{AppConfig, ConfigError};
pub use intent::gemini::GeminiGenerator;
pub use intent::{Intent, IntentClassifier, IntentError, TextGenerator};
pub use logging::{default_log_level, init_logging, init_stderr_logging, logging_status};
pub use model::paper::{Paper, PaperId, PaperValidationError, RawPaper};
pub use repo::paper_cache::PaperCache;
pub use repo::paper_repo::{PaperRepository, RepoError, RepoResult, SqlitePaperRepository};
pub use service::sync_service::{
    StoreFailurePolicy, SyncError, SyncOptions, SyncResult, SyncService,
};
pub use source::arxiv::{ArxivConfig, ArxivSource};
pub use source::{PaperSource, SourceError, SourceResult};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
