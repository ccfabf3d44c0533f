use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::auth_provider::AuthProviderError;

/// RepoError
///
/// Failures reported by the persistence layer.
#[derive(Error, Debug)]
pub enum RepoError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A unique constraint rejected the write (duplicate slug, name, ...).
    #[error("{0}")]
    Conflict(String),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

impl RepoError {
    /// Maps unique-constraint violations to `Conflict`, everything else to `Database`.
    pub fn from_sqlx(e: sqlx::Error) -> Self {
        match &e {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                RepoError::Conflict(db.message().to_string())
            }
            _ => RepoError::Database(e),
        }
    }
}

/// AppError
///
/// The error type returned by handlers. Rendered as
/// `{ "success": false, "message": "..." }` with a matching status code.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Unauthorized")]
    Unauthorized,

    #[error("Forbidden: admin access required")]
    Forbidden,

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Conflict(String),

    #[error("Server configuration error: {0}")]
    Configuration(&'static str),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error(transparent)]
    AuthProvider(#[from] AuthProviderError),

    #[error(transparent)]
    Repository(RepoError),
}

impl From<RepoError> for AppError {
    fn from(e: RepoError) -> Self {
        match e {
            RepoError::Conflict(message) => AppError::Conflict(message),
            other => AppError::Repository(other),
        }
    }
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::Forbidden => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::AuthProvider(AuthProviderError::Rejected(_)) => StatusCode::BAD_REQUEST,
            AppError::AuthProvider(AuthProviderError::NotConfigured) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            AppError::AuthProvider(_) => StatusCode::BAD_GATEWAY,
            AppError::Configuration(_) | AppError::Storage(_) | AppError::Repository(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        // Internal details stay in the logs.
        let message = if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
            match self {
                AppError::Configuration(_) | AppError::AuthProvider(_) => self.to_string(),
                _ => "An unexpected error occurred".to_string(),
            }
        } else {
            self.to_string()
        };

        (status, Json(json!({ "success": false, "message": message }))).into_response()
    }
}
