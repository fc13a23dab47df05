use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

use super::auth::AuthUser;
use crate::app::AppState;
use crate::database::models::User;
use crate::error::ApiError;
use crate::types::Role;

/// The authenticated user as currently stored; its role is authoritative
#[derive(Clone, Debug)]
pub struct ValidatedUser {
    pub user: User,
}

impl ValidatedUser {
    pub fn id(&self) -> Uuid {
        self.user.id
    }

    pub fn is_admin(&self) -> bool {
        self.user.role == Role::Admin
    }
}

/// Middleware that re-loads the token's user so deletions and role changes apply immediately
pub async fn validate_user_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let auth_user = request
        .extensions()
        .get::<AuthUser>()
        .cloned()
        .ok_or_else(|| ApiError::unauthorized("Authentication required"))?;

    let Some(user) = state.store.find_user(auth_user.user_id).await? else {
        tracing::warn!(user_id = %auth_user.user_id, "Token refers to a user that no longer exists");
        return Err(ApiError::unauthorized("Invalid or expired token"));
    };

    if user.role != auth_user.role {
        tracing::debug!(
            user_id = %user.id,
            token_role = %auth_user.role,
            stored_role = %user.role,
            "Token role is stale; using stored role"
        );
    }

    request.extensions_mut().insert(ValidatedUser { user });

    Ok(next.run(request).await)
}
