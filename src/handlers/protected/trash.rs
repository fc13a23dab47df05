// handlers/protected/trash.rs - GET/POST /api/trash, POST /api/trash/restore,
// DELETE /api/trash/permanent-delete

use axum::extract::{rejection::JsonRejection, Extension, Json, State};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::app::AppState;
use crate::database::models::Analysis;
use crate::error::ApiError;
use crate::handlers::{json_body, required_id};
use crate::middleware::{ApiResponse, ApiResult, ValidatedUser};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrashRequest {
    pub analysis_id: Option<Uuid>,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}

/// Trashed analyses of the caller, newest first
pub async fn list(
    State(state): State<AppState>,
    Extension(current): Extension<ValidatedUser>,
) -> ApiResult<Vec<Analysis>> {
    let analyses = state.store.list_analyses(current.id(), true).await?;
    Ok(ApiResponse::success(analyses))
}

pub async fn move_to_trash(
    State(state): State<AppState>,
    Extension(current): Extension<ValidatedUser>,
    payload: Result<Json<TrashRequest>, JsonRejection>,
) -> ApiResult<MessageResponse> {
    let id = required_id(json_body(payload)?.analysis_id, "analysisId")?;

    if !state.store.set_analysis_deleted(current.id(), id, true).await? {
        return Err(ApiError::not_found("Analysis not found"));
    }

    tracing::info!(analysis_id = %id, user_id = %current.id(), "Analysis moved to trash");
    Ok(ApiResponse::success(MessageResponse {
        message: "Analysis moved to trash",
    }))
}

pub async fn restore(
    State(state): State<AppState>,
    Extension(current): Extension<ValidatedUser>,
    payload: Result<Json<TrashRequest>, JsonRejection>,
) -> ApiResult<MessageResponse> {
    let id = required_id(json_body(payload)?.analysis_id, "analysisId")?;

    if !state.store.set_analysis_deleted(current.id(), id, false).await? {
        return Err(ApiError::not_found("Analysis not found in trash"));
    }

    tracing::info!(analysis_id = %id, user_id = %current.id(), "Analysis restored");
    Ok(ApiResponse::success(MessageResponse {
        message: "Analysis restored",
    }))
}

/// Hard delete; missing, foreign and live analyses are indistinguishable
pub async fn permanent_delete(
    State(state): State<AppState>,
    Extension(current): Extension<ValidatedUser>,
    payload: Result<Json<TrashRequest>, JsonRejection>,
) -> ApiResult<MessageResponse> {
    let id = required_id(json_body(payload)?.analysis_id, "analysisId")?;

    if state.store.purge_analysis(current.id(), id).await? == 0 {
        return Err(ApiError::not_found("Analysis not found, not owned, or not in trash"));
    }

    tracing::info!(analysis_id = %id, user_id = %current.id(), "Analysis permanently deleted");
    Ok(ApiResponse::success(MessageResponse {
        message: "Analysis permanently deleted",
    }))
}
