//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate source and cache calls into use-case level APIs.
//! - Keep the HTTP layer decoupled from fetch and storage details.

pub mod sync_service;
