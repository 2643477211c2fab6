//! HTTP surface for the TechInsight backend.
//!
//! # Responsibility
//! - Map HTTP routes onto the core sync service and intent classifier.
//! - Translate core failures into `500` plain-text responses.
//!
//! # Invariants
//! - Shared handles are built once by the caller and only cloned per request.
//! - Handlers hold no state of their own.

pub mod error;
pub mod handlers;

use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;
use techinsight_core::{IntentClassifier, PaperSource, SyncService};
use tower_http::cors::CorsLayer;

/// Handles shared by every request.
pub struct AppState<S: PaperSource> {
    pub sync: Arc<SyncService<S>>,
    pub classifier: IntentClassifier,
}

impl<S: PaperSource> AppState<S> {
    pub fn new(sync: SyncService<S>, classifier: IntentClassifier) -> Self {
        Self {
            sync: Arc::new(sync),
            classifier,
        }
    }
}

impl<S: PaperSource> Clone for AppState<S> {
    fn clone(&self) -> Self {
        Self {
            sync: Arc::clone(&self.sync),
            classifier: self.classifier.clone(),
        }
    }
}

/// Builds the application router with permissive CORS.
pub fn router<S: PaperSource + 'static>(state: AppState<S>) -> Router {
    Router::new()
        .route("/", get(handlers::root))
        .route("/research/sync", post(handlers::sync_research::<S>))
        .route("/research/latest", get(handlers::latest_research::<S>))
        .route("/research/topic/{topic}", get(handlers::research_by_topic::<S>))
        .route("/ai/intent", post(handlers::classify_intent::<S>))
        .layer(CorsLayer::permissive())
        .with_state(state)
}
