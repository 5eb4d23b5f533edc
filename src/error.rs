use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use crate::comments::{CommentError, FieldError, RepositoryError, ServiceError};

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Comment not found")]
    NotFound,

    #[error("{0}")]
    Unauthenticated(&'static str),

    /// Ownership mismatch. Reported as 401, the same status as a bad credential.
    #[error("User not authorized")]
    Forbidden,

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Validation failed")]
    Validation(Vec<FieldError>),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Pool error: {0}")]
    Pool(#[from] r2d2::Error),

    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),
}

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::NotFound => AppError::NotFound,
            ServiceError::Rule(CommentError::NotOwner) => AppError::Forbidden,
            ServiceError::Rule(rule) => AppError::BadRequest(rule.to_string()),
            ServiceError::Repository(e) => AppError::Repository(e),
        }
    }
}

fn msg(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "msg": message }))).into_response()
}

fn server_error() -> Response {
    msg(StatusCode::INTERNAL_SERVER_ERROR, "Server error")
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            AppError::NotFound => msg(StatusCode::NOT_FOUND, "Comment not found"),
            AppError::Unauthenticated(reason) => msg(StatusCode::UNAUTHORIZED, reason),
            AppError::Forbidden => msg(StatusCode::UNAUTHORIZED, "User not authorized"),
            AppError::BadRequest(message) => msg(StatusCode::BAD_REQUEST, &message),
            AppError::Validation(errors) => {
                (StatusCode::BAD_REQUEST, Json(json!({ "errors": errors }))).into_response()
            }
            AppError::Database(e) => {
                tracing::error!("Database error: {}", e);
                server_error()
            }
            AppError::Pool(e) => {
                tracing::error!("Pool error: {}", e);
                server_error()
            }
            AppError::Repository(e) => {
                tracing::error!("Repository error: {}", e);
                server_error()
            }
        }
    }
}

pub type AppResult<T> = Result<T, AppError>;
