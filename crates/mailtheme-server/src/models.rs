//! API models for requests and responses

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Standard API response wrapper
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub data: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn new(data: T) -> Self {
        Self {
            data,
            message: None,
        }
    }

    pub fn with_message(data: T, message: String) -> Self {
        Self {
            data,
            message: Some(message),
        }
    }
}

/// Body of a generate request
///
/// `lang` falls back to the configured preview language. A missing `meta` is
/// passed through so the registry can reject it.
#[derive(Debug, Default, Deserialize)]
pub struct GenerateRequest {
    #[serde(default)]
    pub lang: Option<String>,

    #[serde(default)]
    pub meta: Option<Value>,
}
