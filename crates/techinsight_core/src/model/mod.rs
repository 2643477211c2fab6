//! Canonical domain model for research papers.
//!
//! # Responsibility
//! - Define the source-independent `Paper` record used by every layer.
//!
//! # Invariants
//! - Every paper is identified by its normalized external `PaperId`.
//! - Papers are replaced whole, never patched field by field.

pub mod paper;
