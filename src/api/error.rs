//! Uniform `{"error": ...}` response shape for both the read and admin
//! surfaces.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde::Serialize;
use serde_json::json;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    NotFound(String),
    /// Duplicate backfill: `409` with `existingJobId`.
    #[error("duplicate job")]
    Conflict { message: String, existing_job_id: i64 },
    #[error("too many requests")]
    RateLimited(String),
    #[error(transparent)]
    Db(#[from] crate::db::Error),
    #[error(transparent)]
    Aggregation(#[from] crate::aggregation::Error),
    #[error(transparent)]
    Queue(#[from] crate::queue::Error),
    #[error(transparent)]
    Rpc(#[from] crate::rpc::Error),
}

#[derive(Serialize)]
struct ConflictBody {
    error: String,
    #[serde(rename = "existingJobId")]
    existing_job_id: i64,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, json!({ "error": msg })),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, json!({ "error": msg })),
            ApiError::Conflict { message, existing_job_id } => (
                StatusCode::CONFLICT,
                serde_json::to_value(ConflictBody { error: message, existing_job_id })
                    .unwrap_or_else(|_| json!({ "error": "conflict" })),
            ),
            ApiError::RateLimited(msg) => (StatusCode::TOO_MANY_REQUESTS, json!({ "error": msg })),
            ApiError::Db(crate::db::Error::NotFound) => {
                (StatusCode::NOT_FOUND, json!({ "error": "not found" }))
            }
            ApiError::Db(e) => (StatusCode::INTERNAL_SERVER_ERROR, json!({ "error": e.to_string() })),
            ApiError::Aggregation(e) => (StatusCode::INTERNAL_SERVER_ERROR, json!({ "error": e.to_string() })),
            ApiError::Queue(e) => (StatusCode::INTERNAL_SERVER_ERROR, json!({ "error": e.to_string() })),
            ApiError::Rpc(e) => (StatusCode::INTERNAL_SERVER_ERROR, json!({ "error": e.to_string() })),
        };
        (status, Json(body)).into_response()
    }
}
