//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define the paper cache data access contract.
//! - Isolate SQLite query details from sync orchestration.
//!
//! # Invariants
//! - Repository writes must enforce `Paper::validate()` before persistence.
//! - Storage faults surface as `RepoError`, never as silent empty results.

pub mod paper_cache;
pub mod paper_repo;
