pub mod password;

use axum::http::{header, HeaderMap};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::config::SecurityConfig;
use crate::types::Role;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub role: Role,
    pub exp: i64,
    pub iat: i64,
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Missing authentication token")]
    MissingToken,
    #[error("Authorization header must use Bearer token format")]
    MalformedHeader,
    #[error("Invalid or expired token")]
    InvalidToken(#[source] jsonwebtoken::errors::Error),
    #[error("JWT generation error: {0}")]
    TokenGeneration(#[source] jsonwebtoken::errors::Error),
    #[error("Invalid JWT secret")]
    InvalidSecret,
}

/// Signs and verifies session tokens with the configured HS256 secret
pub struct TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    expiry: Duration,
}

impl TokenService {
    pub fn new(secret: &str, expiry_hours: u64) -> Result<Self, AuthError> {
        if secret.is_empty() {
            return Err(AuthError::InvalidSecret);
        }
        Ok(Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            expiry: Duration::hours(expiry_hours as i64),
        })
    }

    pub fn from_config(config: &SecurityConfig) -> Result<Self, AuthError> {
        Self::new(&config.jwt_secret, config.jwt_expiry_hours)
    }

    pub fn expiry_secs(&self) -> i64 {
        self.expiry.num_seconds()
    }

    pub fn issue(&self, user_id: Uuid, role: Role) -> Result<String, AuthError> {
        let now = Utc::now();
        let claims = Claims {
            sub: user_id,
            role,
            iat: now.timestamp(),
            exp: (now + self.expiry).timestamp(),
        };
        encode(&Header::default(), &claims, &self.encoding).map_err(AuthError::TokenGeneration)
    }

    pub fn verify(&self, token: &str) -> Result<Claims, AuthError> {
        decode::<Claims>(token, &self.decoding, &Validation::default())
            .map(|data| data.claims)
            .map_err(AuthError::InvalidToken)
    }
}

/// Token from `Authorization: Bearer`, falling back to the session cookie
pub fn extract_token(headers: &HeaderMap, cookie_name: &str) -> Result<String, AuthError> {
    if let Some(value) = headers.get(header::AUTHORIZATION) {
        let value = value.to_str().map_err(|_| AuthError::MalformedHeader)?;
        let token = value.strip_prefix("Bearer ").ok_or(AuthError::MalformedHeader)?.trim();
        if token.is_empty() {
            return Err(AuthError::MissingToken);
        }
        return Ok(token.to_string());
    }

    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, value)| *name == cookie_name && !value.is_empty())
        .map(|(_, value)| value.to_string())
        .ok_or(AuthError::MissingToken)
}

/// Set-Cookie value carrying a fresh session token
pub fn session_cookie(config: &SecurityConfig, token: &str, max_age_secs: i64) -> String {
    let mut cookie = format!(
        "{}={}; HttpOnly; Path=/; SameSite=Lax; Max-Age={}",
        config.cookie_name, token, max_age_secs
    );
    if config.require_https {
        cookie.push_str("; Secure");
    }
    cookie
}

/// Set-Cookie value that removes the session cookie
pub fn clear_session_cookie(config: &SecurityConfig) -> String {
    session_cookie(config, "", 0)
}
