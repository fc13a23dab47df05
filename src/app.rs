use axum::{
    http::{HeaderValue, StatusCode},
    middleware::from_fn,
    middleware::from_fn_with_state,
    response::{IntoResponse, Json},
    routing::{delete, get, post, put},
    Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::auth::TokenService;
use crate::config::AppConfig;
use crate::database::Store;
use crate::handlers;
use crate::middleware::{jwt_auth_middleware, require_admin_middleware, validate_user_middleware};
use crate::services::WorkerPool;

/// Shared handles injected into every handler and middleware
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub store: Arc<dyn Store>,
    pub tokens: Arc<TokenService>,
    pub workers: Arc<WorkerPool>,
}

pub fn app(state: AppState) -> Router {
    Router::new()
        // Public
        .route("/", get(root))
        .route("/health", get(health))
        .merge(public_routes())
        // Protected: JWT, then user re-validation
        .merge(
            protected_routes()
                .route_layer(from_fn_with_state(state.clone(), validate_user_middleware))
                .route_layer(from_fn_with_state(state.clone(), jwt_auth_middleware)),
        )
        // Elevated: JWT, user re-validation, admin role
        .merge(
            elevated_routes()
                .route_layer(from_fn(require_admin_middleware))
                .route_layer(from_fn_with_state(state.clone(), validate_user_middleware))
                .route_layer(from_fn_with_state(state.clone(), jwt_auth_middleware)),
        )
        // Global middleware
        .layer(cors_layer(&state.config))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn public_routes() -> Router<AppState> {
    use handlers::public::{auth, bootstrap, report};

    Router::new()
        .route("/api/auth/register", post(auth::register))
        .route("/api/auth/login", post(auth::login))
        .route("/api/auth/logout", post(auth::logout))
        .route("/api/public/report/:id", get(report::public_report))
        .route("/api/admin/init", post(bootstrap::admin_init))
}

fn protected_routes() -> Router<AppState> {
    use handlers::protected::{account, analyses, jobs, trash};

    Router::new()
        .route("/api/auth/me", get(account::me))
        .route("/api/user/analyses-count", get(account::analyses_count))
        .route("/api/analyses", get(analyses::list).post(analyses::submit))
        .route("/api/analyses/:id", get(analyses::show))
        .route("/api/job/:id", get(jobs::job_status))
        .route("/api/trash", get(trash::list).post(trash::move_to_trash))
        .route("/api/trash/restore", post(trash::restore))
        .route("/api/trash/permanent-delete", delete(trash::permanent_delete))
}

fn elevated_routes() -> Router<AppState> {
    use handlers::elevated::{dashboard, users, worker};

    Router::new()
        .route("/api/admin/dashboard/users", get(dashboard::users_by_plan))
        .route("/api/admin/users/analyses-count", get(users::analyses_count_by_query))
        .route("/api/admin/users/:id/analyses-count", get(users::analyses_count))
        .route("/api/admin/users/:id/plan", put(users::set_plan))
        .route("/api/worker", post(worker::trigger))
}

fn cors_layer(config: &AppConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .security
        .cors_origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    if origins.is_empty() {
        return CorsLayer::new();
    }

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([
            axum::http::Method::GET,
            axum::http::Method::POST,
            axum::http::Method::PUT,
            axum::http::Method::DELETE,
        ])
        .allow_headers([axum::http::header::AUTHORIZATION, axum::http::header::CONTENT_TYPE])
        .allow_credentials(true)
}

async fn root() -> Json<Value> {
    Json(json!({
        "name": "Metal Vector API",
        "version": env!("CARGO_PKG_VERSION"),
        "description": "Company analysis reports with plan quotas and a background job queue",
        "endpoints": {
            "health": "/health (public)",
            "auth": "/api/auth/register, /api/auth/login, /api/auth/logout (public); /api/auth/me (protected)",
            "reports": "/api/public/report/:id (public)",
            "analyses": "/api/analyses[/:id], /api/job/:id, /api/user/analyses-count (protected)",
            "trash": "/api/trash, /api/trash/restore, /api/trash/permanent-delete (protected)",
            "admin": "/api/admin/*, /api/worker (admin)",
        }
    }))
}

async fn health(axum::extract::State(state): axum::extract::State<AppState>) -> impl IntoResponse {
    let now = chrono::Utc::now();

    match state.store.health_check().await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({
                "status": "ok",
                "timestamp": now,
                "database": "ok",
                "workersInFlight": state.workers.in_flight(),
            })),
        ),
        Err(e) => {
            tracing::warn!("Health check failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "status": "degraded",
                    "timestamp": now,
                    "database": "unavailable",
                })),
            )
        }
    }
}
