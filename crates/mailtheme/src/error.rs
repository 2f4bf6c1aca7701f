//! Error types for the mailtheme library
//!
//! `MailError` is the one error type that travels across the event bus. It is
//! serializable so a returnable call can hand the exact failure back to the
//! caller, whichever participant raised it.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Main error type for mail registration and generation
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum MailError {
    /// Generation or template registration against an unknown theme
    #[error("Theme [{theme_id}] not found")]
    NoSuchTheme { theme_id: String },

    /// The theme exists but does not carry the requested template
    #[error("Template [{template_id}] not found in theme [{theme_id}]")]
    NoSuchTemplate {
        theme_id: String,
        template_id: String,
    },

    /// Generation was requested without any metadata payload
    #[error("No meta provided for template [{template_id}] in theme [{theme_id}]")]
    MissingMeta {
        theme_id: String,
        template_id: String,
    },

    /// Metadata failed schema validation
    #[error("Invalid meta for template [{template_id}] in theme [{theme_id}] - {}", join_issues(.issues))]
    InvalidMeta {
        theme_id: String,
        template_id: String,
        issues: Vec<ValidationIssue>,
    },

    /// The theme process has no runnable handler for a template the registry knows about
    #[error("Handler for mail [{template_id}] not found")]
    NoHandler { template_id: String },

    /// Failure raised inside a theme's own rendering code
    #[error("Render failed: {message}")]
    Render { message: String },

    /// A template descriptor could not be built
    #[error("Template error: {0}")]
    Template(#[from] TemplateError),

    /// Transport-level failure on the event bus
    #[error("Bus error: {0}")]
    Bus(#[from] BusError),

    /// Payload could not be encoded or decoded for the bus
    #[error("Serialization error: {reason}")]
    Serialization { reason: String },
}

/// Errors raised while building a template descriptor
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TemplateError {
    #[error("Missing required attribute: {attribute}")]
    MissingAttribute { attribute: String },

    #[error("Template [{template_id}] declares no languages")]
    NoLanguages { template_id: String },

    #[error("Template [{template_id}] declares invalid patterns - {}", join_issues(.issues))]
    InvalidPattern {
        template_id: String,
        issues: Vec<ValidationIssue>,
    },

    #[error("Example data for template [{template_id}] does not satisfy its schema - {}", join_issues(.issues))]
    InvalidExampleData {
        template_id: String,
        issues: Vec<ValidationIssue>,
    },
}

/// Transport failures reported by the event bus
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BusError {
    #[error("No handler registered for event [{event}]")]
    NoResponder { event: String },

    #[error("A handler is already registered for event [{event}]")]
    HandlerExists { event: String },

    #[error("Handler for event [{event}] dropped the call without responding")]
    Dropped { event: String },
}

/// A single schema violation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationIssue {
    /// Dotted path to the offending field
    pub path: String,
    /// Human-readable description of the violation
    pub message: String,
}

impl ValidationIssue {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}: {})", self.path, self.message)
    }
}

fn join_issues(issues: &[ValidationIssue]) -> String {
    issues
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Shorthand result type for mailtheme operations
pub type Result<T> = std::result::Result<T, MailError>;

impl From<serde_json::Error> for MailError {
    fn from(error: serde_json::Error) -> Self {
        MailError::Serialization {
            reason: error.to_string(),
        }
    }
}

impl MailError {
    /// Create a render error from anything printable
    pub fn render(message: impl fmt::Display) -> Self {
        MailError::Render {
            message: message.to_string(),
        }
    }

    /// Stable machine-readable code for the error kind
    pub fn code(&self) -> &'static str {
        match self {
            MailError::NoSuchTheme { .. } => "NO_THEME",
            MailError::NoSuchTemplate { .. } => "NO_TEMPLATE",
            MailError::MissingMeta { .. } => "NO_META",
            MailError::InvalidMeta { .. } => "INVALID_META",
            MailError::NoHandler { .. } => "NO_HANDLER",
            MailError::Render { .. } => "RENDER_FAILED",
            MailError::Template(_) => "INVALID_TEMPLATE",
            MailError::Bus(_) => "BUS_ERROR",
            MailError::Serialization { .. } => "SERIALIZATION",
        }
    }

    /// Validation issues carried by an `InvalidMeta` error
    pub fn issues(&self) -> &[ValidationIssue] {
        match self {
            MailError::InvalidMeta { issues, .. } => issues,
            MailError::Template(TemplateError::InvalidExampleData { issues, .. })
            | MailError::Template(TemplateError::InvalidPattern { issues, .. }) => issues,
            _ => &[],
        }
    }
}
