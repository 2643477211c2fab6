//! Route handlers.
//!
//! Each handler is a thin adapter: decode the request, call one core
//! operation, encode the answer.

use crate::error::ApiError;
use crate::AppState;
use axum::extract::{Path, Query, State};
use axum::Json;
use log::info;
use serde::{Deserialize, Serialize};
use techinsight_core::{Intent, Paper, PaperSource};

type Result<T> = std::result::Result<T, ApiError>;

pub const DEFAULT_SYNC_QUERY: &str = "cs.AI";

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub status: &'static str,
}

#[derive(Debug, Deserialize)]
pub struct SyncParams {
    pub query: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SyncResponse {
    pub status: &'static str,
    pub fetched: usize,
}

#[derive(Debug, Deserialize)]
pub struct IntentRequest {
    pub message: String,
}

pub async fn root() -> Json<StatusResponse> {
    Json(StatusResponse {
        status: "TechInsight backend running",
    })
}

pub async fn sync_research<S: PaperSource + 'static>(
    State(state): State<AppState<S>>,
    Query(params): Query<SyncParams>,
) -> Result<Json<SyncResponse>> {
    let query = params
        .query
        .filter(|query| !query.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_SYNC_QUERY.to_string());
    let max_results = state.sync.options().sync_max_results;
    let fetched = state.sync.sync(&query, max_results).await?;
    info!(
        "event=http_request module=server status=ok route=research_sync fetched={}",
        fetched
    );
    Ok(Json(SyncResponse {
        status: "success",
        fetched,
    }))
}

pub async fn latest_research<S: PaperSource + 'static>(
    State(state): State<AppState<S>>,
) -> Result<Json<Vec<Paper>>> {
    Ok(Json(state.sync.get_latest().await?))
}

pub async fn research_by_topic<S: PaperSource + 'static>(
    State(state): State<AppState<S>>,
    Path(topic): Path<String>,
) -> Result<Json<Vec<Paper>>> {
    Ok(Json(state.sync.get_by_topic(&topic).await?))
}

pub async fn classify_intent<S: PaperSource + 'static>(
    State(state): State<AppState<S>>,
    Json(request): Json<IntentRequest>,
) -> Json<Intent> {
    Json(state.classifier.classify(&request.message).await)
}
