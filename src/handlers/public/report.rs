// handlers/public/report.rs - GET /api/public/report/:id

use axum::extract::{rejection::PathRejection, Path, State};
use uuid::Uuid;

use crate::app::AppState;
use crate::database::models::PublicReport;
use crate::error::ApiError;
use crate::handlers::path_id;
use crate::middleware::{ApiResponse, ApiResult};

/// Shareable read-only view of a finished report; trashed reports are not served
pub async fn public_report(
    State(state): State<AppState>,
    id: Result<Path<Uuid>, PathRejection>,
) -> ApiResult<PublicReport> {
    let id = path_id(id)?;
    let report = state
        .store
        .find_public_report(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Report not found"))?;

    Ok(ApiResponse::success(report))
}
