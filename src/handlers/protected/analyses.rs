// handlers/protected/analyses.rs - GET/POST /api/analyses, GET /api/analyses/:id

use axum::extract::{
    rejection::{JsonRejection, PathRejection},
    Extension, Json, Path, State,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::app::AppState;
use crate::database::models::{Analysis, NewJob};
use crate::error::ApiError;
use crate::handlers::{json_body, path_id};
use crate::middleware::{ApiResponse, ApiResult, ValidatedUser};
use crate::types::JobStatus;

const MAX_COMPANY_NAME_LEN: usize = 500;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitRequest {
    pub company_name: Option<String>,
    pub company_inn: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitResponse {
    pub job_id: Uuid,
    pub status: JobStatus,
}

/// INN is 10 digits for organisations, 12 for individual entrepreneurs
pub fn validate_inn(inn: &str) -> Result<(), ApiError> {
    let valid = matches!(inn.len(), 10 | 12) && inn.bytes().all(|b| b.is_ascii_digit());
    if valid {
        Ok(())
    } else {
        Err(ApiError::invalid_field("companyInn", "INN must be 10 or 12 digits"))
    }
}

fn validate_submission(request: SubmitRequest) -> Result<(String, String), ApiError> {
    let company_name = request.company_name.as_deref().map(str::trim).unwrap_or_default();
    let company_inn = request.company_inn.as_deref().map(str::trim).unwrap_or_default();

    if company_name.is_empty() || company_inn.is_empty() {
        return Err(ApiError::bad_request("companyName and companyInn are required"));
    }
    if company_name.chars().count() > MAX_COMPANY_NAME_LEN {
        return Err(ApiError::invalid_field(
            "companyName",
            format!("Must be at most {} characters", MAX_COMPANY_NAME_LEN),
        ));
    }
    validate_inn(company_inn)?;

    Ok((company_name.to_string(), company_inn.to_string()))
}

/// Live analyses of the caller, newest first
pub async fn list(
    State(state): State<AppState>,
    Extension(current): Extension<ValidatedUser>,
) -> ApiResult<Vec<Analysis>> {
    let analyses = state.store.list_analyses(current.id(), false).await?;
    Ok(ApiResponse::success(analyses))
}

/// Queue a report; quota is reserved against open jobs and debited on completion
pub async fn submit(
    State(state): State<AppState>,
    Extension(current): Extension<ValidatedUser>,
    payload: Result<Json<SubmitRequest>, JsonRejection>,
) -> ApiResult<SubmitResponse> {
    let (company_name, company_inn) = validate_submission(json_body(payload)?)?;

    let open_jobs = state.store.count_open_jobs(current.id()).await?;
    if i64::from(current.user.analyses_remaining) <= open_jobs {
        tracing::info!(
            user_id = %current.id(),
            remaining = current.user.analyses_remaining,
            open_jobs,
            "Submission rejected: quota exhausted"
        );
        return Err(ApiError::forbidden("No analyses remaining on your plan"));
    }

    let job = state
        .store
        .create_job(NewJob {
            user_id: current.id(),
            company_name,
            company_inn,
        })
        .await?;

    tracing::info!(job_id = %job.id, user_id = %current.id(), "Job queued");

    Ok(ApiResponse::accepted(SubmitResponse {
        job_id: job.id,
        status: job.status,
    }))
}

pub async fn show(
    State(state): State<AppState>,
    Extension(current): Extension<ValidatedUser>,
    id: Result<Path<Uuid>, PathRejection>,
) -> ApiResult<Analysis> {
    let id = path_id(id)?;
    let analysis = state
        .store
        .find_analysis(current.id(), id)
        .await?
        .ok_or_else(|| ApiError::not_found("Analysis not found"))?;
    Ok(ApiResponse::success(analysis))
}
