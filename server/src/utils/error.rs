//! Unified error handling
//!
//! - [`AppError`] - application error enum
//! - [`AppResponse`] - the envelope every error response is serialized into
//!
//! Success responses are plain JSON bodies; errors always carry a stable
//! code from the table below so clients can branch without string matching.
//!
//! # Error code scheme
//!
//! | Prefix | Category | Example |
//! |--------|----------|---------|
//! | E1xxx  | Credit errors | E1001 insufficient credits |
//! | E2xxx  | Permission errors | E2001 not a participant |
//! | E4xxx  | Lifecycle errors | E4001 invalid state transition |
//! | E9xxx  | System errors | E9002 database error |

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use tracing::error;

use crate::db::repository::RepoError;

pub type AppResult<T> = Result<T, AppError>;

/// Error response envelope
///
/// ```json
/// {
///   "code": "E4001",
///   "message": "Invalid state transition: ..."
/// }
/// ```
#[derive(Debug, Serialize)]
pub struct AppResponse<T> {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

/// Application error enum
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    // ========== Credit errors ==========
    #[error("Insufficient credits: {0}")]
    /// Available balance cannot cover the reservation (422)
    InsufficientCredits(String),

    // ========== Permission errors ==========
    #[error("Permission denied: {0}")]
    /// Caller is not the participant this operation belongs to (403)
    Forbidden(String),

    // ========== Lifecycle errors ==========
    #[error("Invalid state transition: {0}")]
    /// Session/bounty/class is not in a state this operation accepts (409)
    InvalidStateTransition(String),

    #[error("Conflict: {0}")]
    /// A concurrent operation got there first with a different outcome (409)
    Conflict(String),

    // ========== Request errors ==========
    #[error("Resource not found: {0}")]
    /// Resource does not exist (404)
    NotFound(String),

    #[error("Validation failed: {0}")]
    /// Malformed or out-of-range request payload (400)
    Validation(String),

    // ========== System errors ==========
    #[error("Database error: {0}")]
    /// Database failure (500)
    Database(String),

    #[error("Internal server error: {0}")]
    /// Anything else (500)
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::InsufficientCredits(msg) => {
                (StatusCode::UNPROCESSABLE_ENTITY, "E1001", msg.as_str())
            }

            AppError::Forbidden(msg) => (StatusCode::FORBIDDEN, "E2001", msg.as_str()),

            AppError::InvalidStateTransition(msg) => (StatusCode::CONFLICT, "E4001", msg.as_str()),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, "E4002", msg.as_str()),

            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "E0003", msg.as_str()),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "E0002", msg.as_str()),

            AppError::Database(msg) => {
                error!(target: "database", error = %msg, "Database error occurred");
                (StatusCode::INTERNAL_SERVER_ERROR, "E9002", "Database error")
            }
            AppError::Internal(msg) => {
                error!(target: "internal", error = %msg, "Internal error occurred");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "E9001",
                    "Internal server error",
                )
            }
        };

        let body = Json(AppResponse::<()> {
            code: code.to_string(),
            message: message.to_string(),
            data: None,
        });

        (status, body).into_response()
    }
}

impl From<RepoError> for AppError {
    fn from(e: RepoError) -> Self {
        match e {
            RepoError::NotFound(msg) => AppError::NotFound(msg),
            RepoError::Duplicate(msg) => AppError::Conflict(msg),
            RepoError::Validation(msg) => AppError::Validation(msg),
            RepoError::Database(msg) => AppError::Database(msg),
        }
    }
}

impl From<sqlx::Error> for AppError {
    fn from(e: sqlx::Error) -> Self {
        AppError::from(RepoError::from(e))
    }
}
