// handlers/public/auth.rs - POST /api/auth/register, /api/auth/login, /api/auth/logout

use axum::{
    extract::{rejection::JsonRejection, Json, State},
    http::header,
    response::IntoResponse,
};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::app::AppState;
use crate::auth::{clear_session_cookie, session_cookie};
use crate::database::models::UserProfile;
use crate::error::ApiError;
use crate::handlers::json_body;
use crate::middleware::{ApiResponse, ApiResult};
use crate::services::accounts;

#[derive(Debug, Deserialize)]
pub struct CredentialsRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    #[serde(rename = "expiresIn")]
    pub expires_in: i64,
    pub user: UserProfile,
}

/// POST /api/auth/register - create a trial account
pub async fn register(
    State(state): State<AppState>,
    payload: Result<Json<CredentialsRequest>, JsonRejection>,
) -> ApiResult<UserProfile> {
    let request = json_body(payload)?;
    let user = accounts::register(
        state.store.as_ref(),
        &state.config.plans,
        request.email.as_deref().unwrap_or_default(),
        request.password.as_deref().unwrap_or_default(),
    )
    .await?;

    Ok(ApiResponse::created(UserProfile::from(&user)))
}

/// POST /api/auth/login - verify credentials, return a token and set the session cookie
pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<CredentialsRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let request = json_body(payload)?;
    let (Some(email), Some(password)) = (request.email, request.password) else {
        return Err(ApiError::bad_request("Email and password are required"));
    };

    let user = accounts::authenticate(state.store.as_ref(), &email, &password).await?;
    let token = state.tokens.issue(user.id, user.role)?;
    let cookie = session_cookie(&state.config.security, &token, state.tokens.expiry_secs());

    tracing::info!(user_id = %user.id, "User logged in");

    Ok((
        [(header::SET_COOKIE, cookie)],
        ApiResponse::success(LoginResponse {
            token,
            expires_in: state.tokens.expiry_secs(),
            user: UserProfile::from(&user),
        }),
    ))
}

/// POST /api/auth/logout - clear the session cookie; tokens are stateless
pub async fn logout(State(state): State<AppState>) -> impl IntoResponse {
    (
        [(header::SET_COOKIE, clear_session_cookie(&state.config.security))],
        ApiResponse::success(json!({ "message": "Logged out" })),
    )
}

#[cfg(test)]
mod tests {
    use crate::app::tests::TestApp;
    use axum::http::{header, Method, Request, StatusCode};
    use serde_json::json;

    #[tokio::test]
    async fn register_then_login_then_me() {
        let app = TestApp::new();

        let (status, body) = app
            .send(
                Method::POST,
                "/api/auth/register",
                None,
                Some(json!({ "email": "Buyer@Example.com", "password": "long-enough" })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["email"], "buyer@example.com");
        assert_eq!(body["plan"], "trial");
        assert_eq!(body["analysesRemaining"], 3);
        assert!(body.get("passwordHash").is_none());
        assert!(body.get("password_hash").is_none());

        let (status, body) = app
            .send(
                Method::POST,
                "/api/auth/login",
                None,
                Some(json!({ "email": "buyer@example.com", "password": "long-enough" })),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        let token = body["token"].as_str().unwrap().to_string();

        let (status, me) = app.get("/api/auth/me", Some(&token)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(me["email"], "buyer@example.com");
        assert_eq!(me["role"], "user");
    }

    #[tokio::test]
    async fn login_sets_http_only_cookie() {
        let app = TestApp::new();
        app.send(
            Method::POST,
            "/api/auth/register",
            None,
            Some(json!({ "email": "c@example.com", "password": "long-enough" })),
        )
        .await;

        let request = Request::builder()
            .method(Method::POST)
            .uri("/api/auth/login")
            .header(header::CONTENT_TYPE, "application/json")
            .body(axum::body::Body::from(
                json!({ "email": "c@example.com", "password": "long-enough" }).to_string(),
            ))
            .unwrap();
        let response = tower::ServiceExt::oneshot(crate::app::app(app.state.clone()), request)
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let cookie = response.headers()[header::SET_COOKIE].to_str().unwrap();
        assert!(cookie.starts_with("mv_session="));
        assert!(cookie.contains("HttpOnly"));
    }

    #[tokio::test]
    async fn bad_credentials_and_bad_input() {
        let app = TestApp::new();

        let (status, body) = app
            .send(Method::POST, "/api/auth/register", None, Some(json!({ "email": "nope", "password": "x" })))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "VALIDATION_ERROR");

        let (status, body) = app
            .send(
                Method::POST,
                "/api/auth/login",
                None,
                Some(json!({ "email": "ghost@example.com", "password": "long-enough" })),
            )
            .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["message"], "Invalid email or password");

        let (status, _) = app.send(Method::POST, "/api/auth/login", None, Some(json!({}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn logout_clears_cookie() {
        let app = TestApp::new();
        let request = Request::builder()
            .method(Method::POST)
            .uri("/api/auth/logout")
            .body(axum::body::Body::empty())
            .unwrap();
        let response = tower::ServiceExt::oneshot(crate::app::app(app.state.clone()), request)
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let cookie = response.headers()[header::SET_COOKIE].to_str().unwrap();
        assert!(cookie.contains("Max-Age=0"));
    }
}
