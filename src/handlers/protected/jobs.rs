// handlers/protected/jobs.rs - GET /api/job/:id

use axum::extract::{rejection::PathRejection, Extension, Path, State};
use uuid::Uuid;

use crate::app::AppState;
use crate::database::models::JobView;
use crate::error::ApiError;
use crate::handlers::path_id;
use crate::middleware::{ApiResponse, ApiResult, ValidatedUser};

/// Job status for its submitter or an admin; anyone else sees 404
pub async fn job_status(
    State(state): State<AppState>,
    Extension(current): Extension<ValidatedUser>,
    id: Result<Path<Uuid>, PathRejection>,
) -> ApiResult<JobView> {
    let id = path_id(id)?;
    let job = state
        .store
        .find_job(id)
        .await?
        .filter(|job| job.user_id == current.id() || current.is_admin())
        .ok_or_else(|| ApiError::not_found("Job not found"))?;

    Ok(ApiResponse::success(JobView::from(&job)))
}
