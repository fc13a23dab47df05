use std::collections::HashMap;

use crate::auth::password::{hash_password, verify_password, PasswordError, DUMMY_HASH};
use crate::config::PlanConfig;
use crate::database::models::{NewUser, User};
use crate::database::Store;
use crate::error::ApiError;
use crate::types::{Plan, Role};

pub const MIN_PASSWORD_LEN: usize = 8;
pub const MAX_EMAIL_LEN: usize = 254;

const INVALID_CREDENTIALS: &str = "Invalid email or password";

/// Lowercase and trim so lookups and the unique index agree
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn validate_credentials(email: &str, password: &str) -> Result<(), ApiError> {
    let mut field_errors = HashMap::new();

    if email.is_empty() {
        field_errors.insert("email".to_string(), "This field is required".to_string());
    } else if email.len() > MAX_EMAIL_LEN || !email.contains('@') || email.starts_with('@') || email.ends_with('@') {
        field_errors.insert("email".to_string(), "Invalid email address".to_string());
    }

    if password.chars().count() < MIN_PASSWORD_LEN {
        field_errors.insert(
            "password".to_string(),
            format!("Password must be at least {} characters", MIN_PASSWORD_LEN),
        );
    }

    if field_errors.is_empty() {
        Ok(())
    } else {
        Err(ApiError::validation_error("Invalid registration data", Some(field_errors)))
    }
}

/// Create a trial account
pub async fn register(store: &dyn Store, plans: &PlanConfig, email: &str, password: &str) -> Result<User, ApiError> {
    let email = normalize_email(email);
    validate_credentials(&email, password)?;

    // Argon2 is CPU bound; keep it off the async workers
    let password = password.to_string();
    let password_hash = tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .map_err(|e| {
            tracing::error!("Password hashing task failed: {}", e);
            ApiError::internal_server_error("Failed to create account")
        })?
        .map_err(|e| {
            tracing::error!("Password hashing failed: {}", e);
            ApiError::internal_server_error("Failed to create account")
        })?;

    let user = store
        .create_user(NewUser {
            email,
            password_hash,
            role: Role::User,
            plan: Plan::Trial,
            analyses_remaining: plans.quota_for(Plan::Trial),
        })
        .await?;

    tracing::info!(user_id = %user.id, "Registered user");
    Ok(user)
}

/// Check credentials; unknown email and wrong password are indistinguishable
pub async fn authenticate(store: &dyn Store, email: &str, password: &str) -> Result<User, ApiError> {
    let email = normalize_email(email);
    let Some(user) = store.find_user_by_email(&email).await? else {
        // Unknown emails pay the same hashing cost as registered ones
        let _ = verify_off_runtime(password, DUMMY_HASH.to_string()).await;
        tracing::debug!("Login attempt for unknown email");
        return Err(ApiError::unauthorized(INVALID_CREDENTIALS));
    };

    match verify_off_runtime(password, user.password_hash.clone()).await? {
        Ok(true) => Ok(user),
        Ok(false) => {
            tracing::debug!(user_id = %user.id, "Login attempt with wrong password");
            Err(ApiError::unauthorized(INVALID_CREDENTIALS))
        }
        Err(e) => {
            tracing::error!(user_id = %user.id, "Stored password hash unreadable: {}", e);
            Err(ApiError::unauthorized(INVALID_CREDENTIALS))
        }
    }
}

async fn verify_off_runtime(password: &str, hash: String) -> Result<Result<bool, PasswordError>, ApiError> {
    let password = password.to_string();
    tokio::task::spawn_blocking(move || verify_password(&password, &hash))
        .await
        .map_err(|e| {
            tracing::error!("Password verification task failed: {}", e);
            ApiError::internal_server_error("Failed to verify credentials")
        })
}
