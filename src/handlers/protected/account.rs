// handlers/protected/account.rs - GET /api/auth/me, GET /api/user/analyses-count

use axum::extract::{Extension, State};
use serde::Serialize;

use crate::app::AppState;
use crate::database::models::UserProfile;
use crate::middleware::{ApiResponse, ApiResult, ValidatedUser};

#[derive(Debug, Serialize)]
pub struct CountResponse {
    pub count: i64,
}

/// Profile of the authenticated user, as currently stored
pub async fn me(Extension(current): Extension<ValidatedUser>) -> ApiResult<UserProfile> {
    Ok(ApiResponse::success(UserProfile::from(&current.user)))
}

/// Number of the user's live (non-trashed) analyses
pub async fn analyses_count(
    State(state): State<AppState>,
    Extension(current): Extension<ValidatedUser>,
) -> ApiResult<CountResponse> {
    let count = state.store.count_analyses(current.id()).await?;
    Ok(ApiResponse::success(CountResponse { count }))
}
