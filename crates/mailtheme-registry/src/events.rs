//! Event names and wire payloads for the registry protocol

use mailtheme::MailTemplate;
use serde::{Deserialize, Serialize};

/// List all registered theme ids
pub const GET_THEMES: &str = "GetThemes";

/// List the templates of one theme
pub const GET_TEMPLATES: &str = "GetTemplates";

/// Validate metadata and render a mail through the owning theme
pub const GENERATE_EMAIL: &str = "GenerateEmail";

/// Theme client announcing its dispatch handler
pub const REGISTER_THEME: &str = "registerTheme";

/// Theme client publishing a template descriptor
pub const REGISTER_TEMPLATE: &str = "registerTemplate";

/// Event a theme answers when the registry dispatches a generation to it
pub fn theme_event(theme_id: &str) -> String {
    format!("theme.{}.generate", theme_id)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetTemplatesRequest {
    pub theme_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateEmailRequest {
    pub theme_id: String,
    pub template_id: String,
    pub lang: String,
    /// Absent and `null` are both treated as missing
    #[serde(default)]
    pub meta: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterThemeRequest {
    pub theme_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterTemplateRequest {
    pub theme_id: String,
    #[serde(flatten)]
    pub template: MailTemplate,
}

/// Payload the registry sends to a theme's dispatch event
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DispatchRequest {
    pub template_id: String,
    pub lang: String,
    pub meta: serde_json::Value,
}
