use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use mongodb::error::ErrorKind;
use thiserror::Error;

/// Server code MongoDB returns when the connected principal lacks a privilege.
const MONGO_UNAUTHORIZED: i32 = 13;

#[derive(Debug, Error)]
pub enum AppError {
    /// Rejected before any write happened.
    #[error("{0}")]
    Validation(String),

    #[error("UNAUTHORIZED")]
    Unauthorized,

    /// Either the caller's capability set or the storage layer refused the operation.
    #[error("PERMISSION_DENIED")]
    PermissionDenied,

    #[error("{0}")]
    NotFound(String),

    /// The target exists but is in a state that forbids the operation.
    #[error("{0}")]
    Conflict(String),

    #[error("database error: {0}")]
    Database(String),

    #[error("content error: {0}")]
    Content(String),

    #[error("internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, AppError>;

impl AppError {
    pub fn validation(code: &str) -> Self {
        AppError::Validation(code.to_string())
    }
    pub fn not_found(code: &str) -> Self {
        AppError::NotFound(code.to_string())
    }
    pub fn conflict(code: &str) -> Self {
        AppError::Conflict(code.to_string())
    }

    /// Body sent to the client. Server-side failures are collapsed into a
    /// generic code so driver messages never leak.
    pub fn code(&self) -> String {
        match self {
            AppError::Database(_) => "DATABASE_UNAVAILABLE".to_string(),
            AppError::Content(_) => "CONTENT_UNAVAILABLE".to_string(),
            AppError::Internal(_) => "INTERNAL_ERROR".to_string(),
            other => other.to_string(),
        }
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) | AppError::Conflict(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::PermissionDenied => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Database(_) | AppError::Content(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }
        HttpResponse::build(status).body(self.code())
    }
}

impl From<mongodb::error::Error> for AppError {
    fn from(error: mongodb::error::Error) -> Self {
        match error.kind.as_ref() {
            ErrorKind::Command(command) if command.code == MONGO_UNAUTHORIZED => {
                AppError::PermissionDenied
            }
            ErrorKind::Authentication { .. } => AppError::PermissionDenied,
            _ => AppError::Database(error.to_string()),
        }
    }
}

impl From<mongodb::bson::ser::Error> for AppError {
    fn from(error: mongodb::bson::ser::Error) -> Self {
        AppError::Internal(error.to_string())
    }
}

impl From<mongodb::bson::de::Error> for AppError {
    fn from(error: mongodb::bson::de::Error) -> Self {
        AppError::Database(error.to_string())
    }
}

impl From<reqwest::Error> for AppError {
    fn from(error: reqwest::Error) -> Self {
        AppError::Content(error.to_string())
    }
}
