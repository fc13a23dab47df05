use axum::{extract::Request, middleware::Next, response::Response};

use super::validate_user::ValidatedUser;
use crate::error::ApiError;

/// Admin tier gate; must run after `validate_user_middleware`
pub async fn require_admin_middleware(request: Request, next: Next) -> Result<Response, ApiError> {
    let current = request
        .extensions()
        .get::<ValidatedUser>()
        .ok_or_else(|| ApiError::unauthorized("Authentication required"))?;

    if !current.is_admin() {
        tracing::warn!(user_id = %current.id(), "Non-admin attempted an admin endpoint");
        return Err(ApiError::forbidden("Admin access required"));
    }

    Ok(next.run(request).await)
}
