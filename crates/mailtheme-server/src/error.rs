//! Error handling for the API server

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use mailtheme::MailError;
use serde_json::json;
use thiserror::Error;

/// Result type for API operations
pub type Result<T> = std::result::Result<T, ApiError>;

/// API error types
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Mail(#[from] MailError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Page rendering failed: {0}")]
    Page(#[from] askama::Error),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Mail(e) => match e {
                MailError::NoSuchTheme { .. } | MailError::NoSuchTemplate { .. } => {
                    StatusCode::NOT_FOUND
                }
                MailError::MissingMeta { .. }
                | MailError::InvalidMeta { .. }
                | MailError::Serialization { .. } => StatusCode::BAD_REQUEST,
                MailError::Render { .. } => StatusCode::UNPROCESSABLE_ENTITY,
                MailError::NoHandler { .. } | MailError::Template(_) | MailError::Bus(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
            ApiError::Config(_) | ApiError::Io(_) | ApiError::Page(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            ApiError::Mail(e) => e.code(),
            ApiError::Config(_) => "CONFIG",
            ApiError::Io(_) | ApiError::Page(_) => "INTERNAL",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let error_message = match &self {
            ApiError::Mail(_) => self.to_string(),
            ApiError::Config(_) => "Configuration error".to_string(),
            ApiError::Io(_) | ApiError::Page(_) => "Internal server error".to_string(),
        };

        let mut body = json!({
            "error": error_message,
            "code": self.code(),
            "status": status.as_u16()
        });
        if let ApiError::Mail(e) = &self {
            if !e.issues().is_empty() {
                body["issues"] = json!(e.issues());
            }
        }

        (status, Json(body)).into_response()
    }
}
