// handlers/elevated/worker.rs - POST /api/worker

use axum::extract::State;
use serde::Serialize;
use uuid::Uuid;

use crate::app::AppState;
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult};
use crate::services::TriggerOutcome;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TriggerResponse {
    pub message: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_id: Option<Uuid>,
}

/// Claim the oldest pending job and process it in the background.
///
/// Returns as soon as the job is claimed; poll GET /api/job/:id for the result.
pub async fn trigger(State(state): State<AppState>) -> ApiResult<TriggerResponse> {
    match state.workers.trigger().await? {
        TriggerOutcome::Started(job_id) => Ok(ApiResponse::success(TriggerResponse {
            message: "Job started",
            job_id: Some(job_id),
        })),
        TriggerOutcome::NoWork => Ok(ApiResponse::success(TriggerResponse {
            message: "No pending jobs",
            job_id: None,
        })),
        TriggerOutcome::Busy => Err(ApiError::service_unavailable("All workers are busy, retry shortly")),
    }
}
