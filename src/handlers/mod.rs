// handlers/mod.rs - 3-tier handler layout
//
// Public (no auth) → Protected (JWT + live user) → Elevated (admin role)

pub mod elevated;
pub mod protected;
pub mod public;

use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{Json, Path, Query};
use uuid::Uuid;

use crate::error::ApiError;

/// Unwrap a JSON body, turning extractor rejections into 400s with our error shape
pub(crate) fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    payload.map(|Json(body)| body).map_err(|rejection| {
        tracing::debug!("Rejected request body: {}", rejection);
        ApiError::bad_request(format!("Invalid JSON body: {}", rejection.body_text()))
    })
}

/// `:id` path segment parsed as a UUID
pub(crate) fn path_id(path: Result<Path<Uuid>, PathRejection>) -> Result<Uuid, ApiError> {
    path.map(|Path(id)| id)
        .map_err(|_| ApiError::invalid_field("id", "Must be a valid UUID"))
}

pub(crate) fn query_params<T>(query: Result<Query<T>, QueryRejection>) -> Result<T, ApiError> {
    query
        .map(|Query(params)| params)
        .map_err(|rejection| ApiError::bad_request(rejection.body_text()))
}

/// Required id field from a JSON body
pub(crate) fn required_id(value: Option<Uuid>, field: &str) -> Result<Uuid, ApiError> {
    value.ok_or_else(|| ApiError::invalid_field(field, "This field is required"))
}
