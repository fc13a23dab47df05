// handlers/elevated/users.rs - per-user admin operations
//
// GET /api/admin/users/:id/analyses-count
// GET /api/admin/users/analyses-count?userId=
// PUT /api/admin/users/:id/plan

use axum::extract::{
    rejection::{JsonRejection, PathRejection, QueryRejection},
    Json, Path, Query, State,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::app::AppState;
use crate::database::models::UserProfile;
use crate::error::ApiError;
use crate::handlers::{json_body, path_id, query_params, required_id};
use crate::middleware::{ApiResponse, ApiResult};
use crate::types::Plan;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserQuery {
    pub user_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct SetPlanRequest {
    pub plan: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserCountResponse {
    pub user_id: Uuid,
    pub count: i64,
}

async fn count_for(state: &AppState, user_id: Uuid) -> ApiResult<UserCountResponse> {
    if state.store.find_user(user_id).await?.is_none() {
        return Err(ApiError::not_found("User not found"));
    }
    let count = state.store.count_analyses(user_id).await?;
    Ok(ApiResponse::success(UserCountResponse { user_id, count }))
}

pub async fn analyses_count(
    State(state): State<AppState>,
    id: Result<Path<Uuid>, PathRejection>,
) -> ApiResult<UserCountResponse> {
    count_for(&state, path_id(id)?).await
}

pub async fn analyses_count_by_query(
    State(state): State<AppState>,
    query: Result<Query<UserQuery>, QueryRejection>,
) -> ApiResult<UserCountResponse> {
    let user_id = required_id(query_params(query)?.user_id, "userId")?;
    count_for(&state, user_id).await
}

/// Move a user to a plan and reset their remaining analyses to its quota
pub async fn set_plan(
    State(state): State<AppState>,
    id: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<SetPlanRequest>, JsonRejection>,
) -> ApiResult<UserProfile> {
    let user_id = path_id(id)?;
    let plan: Plan = json_body(payload)?
        .plan
        .ok_or_else(|| ApiError::invalid_field("plan", "This field is required"))?
        .parse()
        .map_err(|e: String| ApiError::invalid_field("plan", e))?;

    let quota = state.config.plans.quota_for(plan);
    let user = state
        .store
        .set_plan(user_id, plan, quota)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    tracing::info!(user_id = %user.id, plan = %plan, quota, "Plan changed");
    Ok(ApiResponse::success(UserProfile::from(&user)))
}

#[cfg(test)]
mod tests {
    use crate::app::tests::TestApp;
    use crate::types::{Plan, Role};
    use axum::http::{Method, StatusCode};
    use serde_json::json;

    #[tokio::test]
    async fn counts_by_path_and_query() {
        let app = TestApp::new();
        let admin = app.store.seed_admin("admin@example.com");
        let user = app.store.seed_user("u@example.com", Plan::Start, 10);
        app.store.seed_analysis(user.id, "A", false);
        app.store.seed_analysis(user.id, "B", true);
        let token = app.token(admin.id, Role::Admin);

        let (status, body) = app
            .get(&format!("/api/admin/users/{}/analyses-count", user.id), Some(&token))
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "userId": user.id, "count": 1 }));

        let (status, body) = app
            .get(&format!("/api/admin/users/analyses-count?userId={}", user.id), Some(&token))
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["count"], 1);

        let (status, _) = app.get("/api/admin/users/analyses-count", Some(&token)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = app
            .get(&format!("/api/admin/users/{}/analyses-count", uuid::Uuid::new_v4()), Some(&token))
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn set_plan_resets_quota() {
        let app = TestApp::new();
        let admin = app.store.seed_admin("admin@example.com");
        let user = app.store.seed_user("u@example.com", Plan::Trial, 0);
        let token = app.token(admin.id, Role::Admin);
        let uri = format!("/api/admin/users/{}/plan", user.id);

        let (status, body) = app.send(Method::PUT, &uri, Some(&token), Some(json!({ "plan": "Optimal" }))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["plan"], "optimal");
        assert_eq!(body["analysesRemaining"], 30);

        let (status, body) = app.send(Method::PUT, &uri, Some(&token), Some(json!({ "plan": "gold" }))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["field_errors"]["plan"].is_string());

        let missing = format!("/api/admin/users/{}/plan", uuid::Uuid::new_v4());
        let (status, _) = app.send(Method::PUT, &missing, Some(&token), Some(json!({ "plan": "start" }))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
