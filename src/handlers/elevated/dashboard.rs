// handlers/elevated/dashboard.rs - GET /api/admin/dashboard/users

use axum::extract::State;

use crate::app::AppState;
use crate::middleware::{ApiResponse, ApiResult};
use crate::types::PlanCounts;

/// User totals per plan; plans with no users are reported as zero
pub async fn users_by_plan(State(state): State<AppState>) -> ApiResult<PlanCounts> {
    let counts = state.store.count_users_by_plan().await?;
    Ok(ApiResponse::success(counts))
}
