// handlers/public/bootstrap.rs - POST /api/admin/init
//
// Grants the admin role to the account named by ADMIN_BOOTSTRAP_EMAIL while
// no admin exists yet. Disabled when the variable is unset.

use axum::extract::State;
use serde::Serialize;

use crate::app::AppState;
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult};
use crate::services::accounts::normalize_email;
use crate::types::Role;

#[derive(Debug, Serialize)]
pub struct BootstrapResponse {
    pub message: String,
    pub email: String,
}

pub async fn admin_init(State(state): State<AppState>) -> ApiResult<BootstrapResponse> {
    let Some(email) = state.config.security.bootstrap_admin_email.as_deref() else {
        return Err(ApiError::forbidden("Admin bootstrap is disabled"));
    };
    let email = normalize_email(email);

    if state.store.count_admins().await? > 0 {
        return Err(ApiError::conflict("An admin already exists"));
    }

    let user = state
        .store
        .set_role_by_email(&email, Role::Admin)
        .await?
        .ok_or_else(|| ApiError::not_found("Bootstrap user not found; register it first"))?;

    tracing::warn!(user_id = %user.id, "Granted admin role via bootstrap");

    Ok(ApiResponse::success(BootstrapResponse {
        message: "Admin role granted".to_string(),
        email: user.email,
    }))
}

#[cfg(test)]
mod tests {
    use crate::app::tests::TestApp;
    use crate::config::AppConfig;
    use crate::types::Plan;
    use axum::http::{Method, StatusCode};

    fn bootstrap_app() -> TestApp {
        TestApp::with_config(AppConfig::from_lookup(|key| {
            (key == "ADMIN_BOOTSTRAP_EMAIL").then(|| "Boss@Example.com".to_string())
        }))
    }

    #[tokio::test]
    async fn disabled_without_configured_email() {
        let app = TestApp::new();
        let (status, _) = app.send(Method::POST, "/api/admin/init", None, None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn promotes_configured_user_once() {
        let app = bootstrap_app();

        let (status, _) = app.send(Method::POST, "/api/admin/init", None, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        app.store.seed_user("boss@example.com", Plan::Trial, 3);
        let (status, body) = app.send(Method::POST, "/api/admin/init", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["email"], "boss@example.com");

        let (status, _) = app.send(Method::POST, "/api/admin/init", None, None).await;
        assert_eq!(status, StatusCode::CONFLICT);
    }
}
