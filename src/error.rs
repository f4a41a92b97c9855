//! Error type shared by every handler
//!
//! Each variant maps to one HTTP status. Server-side failures are logged and
//! answered with a generic message so storage details never reach the client.

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::model::ExistingLink;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),

    #[error("This link is already saved as \"{}\"", .existing.title)]
    DuplicateUrl { existing: ExistingLink },

    #[error("Link not found")]
    NotFound,

    #[error("Invalid or missing authorization header")]
    Unauthorized,

    #[error("You are not authorized to modify this link")]
    NotOwner,

    #[error("Transaction error: {0}")]
    Transaction(#[from] redb::TransactionError),

    #[error("Table error: {0}")]
    Table(#[from] redb::TableError),

    #[error("Storage error: {0}")]
    Storage(#[from] redb::StorageError),

    #[error("Commit error: {0}")]
    Commit(#[from] redb::CommitError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) | AppError::DuplicateUrl { .. } => StatusCode::BAD_REQUEST,
            AppError::NotFound => StatusCode::NOT_FOUND,
            AppError::Unauthorized | AppError::NotOwner => StatusCode::UNAUTHORIZED,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            AppError::Validation(_) => "ValidationError",
            AppError::DuplicateUrl { .. } => "DuplicateUrl",
            AppError::NotFound => "NotFound",
            AppError::Unauthorized => "Unauthorized",
            AppError::NotOwner => "NotOwner",
            _ => "InternalError",
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match &self {
            AppError::DuplicateUrl { existing } => json!({
                "error": self.kind(),
                "message": self.to_string(),
                "existingLink": existing,
            }),
            _ if status.is_server_error() => {
                tracing::error!(error = %self, "request failed");
                json!({
                    "error": self.kind(),
                    "message": "Internal server error",
                })
            }
            _ => json!({
                "error": self.kind(),
                "message": self.to_string(),
            }),
        };

        (status, Json(body)).into_response()
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::Validation(rejection.body_text())
    }
}

pub type AppResult<T> = Result<T, AppError>;
