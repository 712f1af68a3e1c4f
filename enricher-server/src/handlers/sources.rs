//! Provider listing handler

use axum::{extract::State, Json};
use enricher_core::SourceDescriptor;

use crate::AppState;

/// Registered providers and whether each has what it needs to run
pub async fn list(State(state): State<AppState>) -> Json<Vec<SourceDescriptor>> {
    Json(state.enricher.sources())
}
