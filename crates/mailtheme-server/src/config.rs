//! Server configuration management

use std::str::FromStr;

use crate::error::{ApiError, Result};
use serde::{Deserialize, Serialize};

/// Which surfaces the server exposes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunMode {
    /// Preview pages are mounted
    Development,
    Production,
}

impl FromStr for RunMode {
    type Err = ApiError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "development" | "dev" => Ok(RunMode::Development),
            "production" | "prod" => Ok(RunMode::Production),
            other => Err(ApiError::Config(format!("Invalid RUN_MODE value: {}", other))),
        }
    }
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to
    pub host: String,

    /// Port to bind to
    pub port: u16,

    pub run_mode: RunMode,

    /// Language requested when generating from the preview form
    pub preview_lang: String,
}

impl ServerConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            host: std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()
                .map_err(|_| ApiError::Config("Invalid PORT value".to_string()))?,
            run_mode: std::env::var("RUN_MODE")
                .unwrap_or_else(|_| "development".to_string())
                .parse()?,
            preview_lang: std::env::var("PREVIEW_LANG")
                .ok()
                .filter(|lang| !lang.trim().is_empty())
                .unwrap_or_else(|| "en".to_string()),
        })
    }

    pub fn is_development(&self) -> bool {
        self.run_mode == RunMode::Development
    }

    /// Address string for the listener
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            run_mode: RunMode::Development,
            preview_lang: "en".to_string(),
        }
    }
}
