//! Cache management handlers

use axum::{extract::State, Json};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::{AppResult, AppState};

#[derive(Debug, Deserialize)]
pub struct InvalidateRequest {
    pub indicator: String,
}

/// Forget the cached result for one indicator
pub async fn invalidate(
    State(state): State<AppState>,
    Json(req): Json<InvalidateRequest>,
) -> AppResult<Json<Value>> {
    state.enricher.invalidate(&req.indicator).await?;
    Ok(Json(json!({"invalidated": req.indicator.trim()})))
}

/// Drop every cached result
pub async fn flush(State(state): State<AppState>) -> AppResult<Json<Value>> {
    state.enricher.flush_cache().await?;
    tracing::warn!("Result cache flushed via API");
    Ok(Json(json!({"flushed": true})))
}
