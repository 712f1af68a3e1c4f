//! Search handlers: submit an indicator, poll the job

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::json;
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::jobs::JobStatus;
use crate::{AppError, AppResult, AppState};

#[derive(Debug, Deserialize, Validate)]
pub struct SearchRequest {
    /// Trimmed on the way in, so the bounds apply to what gets enriched
    #[serde(deserialize_with = "trimmed")]
    #[validate(length(min = 1, max = 2048), custom(function = "validate_indicator"))]
    pub indicator: String,
}

#[derive(Debug, Serialize)]
pub struct SearchAccepted {
    pub task_id: Uuid,
}

fn trimmed<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    Ok(raw.trim().to_string())
}

fn validate_indicator(indicator: &str) -> Result<(), ValidationError> {
    if enricher_core::is_valid(indicator) {
        Ok(())
    } else {
        Err(ValidationError::new("unsupported_indicator"))
    }
}

/// Queue an enrichment job
pub async fn submit(
    State(state): State<AppState>,
    Json(req): Json<SearchRequest>,
) -> AppResult<(StatusCode, Json<SearchAccepted>)> {
    req.validate()?;

    let task_id = state.jobs.submit(state.enricher.clone(), req.indicator.clone());
    tracing::info!("Search {} accepted for {}", task_id, req.indicator);

    Ok((StatusCode::ACCEPTED, Json(SearchAccepted { task_id })))
}

/// Report job progress: 202 pending, 200 completed, 500 failed
pub async fn status(
    State(state): State<AppState>,
    Path(task_id): Path<Uuid>,
) -> AppResult<Response> {
    let job = state
        .jobs
        .poll(task_id)
        .ok_or_else(|| AppError::NotFound(format!("Unknown task {}", task_id)))?;

    let response = match job.status {
        JobStatus::Pending => (
            StatusCode::ACCEPTED,
            Json(json!({"status": job.status, "result": null})),
        ),
        JobStatus::Completed => (
            StatusCode::OK,
            Json(json!({"status": job.status, "result": job.result})),
        ),
        JobStatus::Failed => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({"status": job.status, "error": job.error})),
        ),
    };

    Ok(response.into_response())
}
