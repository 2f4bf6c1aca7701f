//! Caller-side access to a registry over the bus

use mailtheme::{EventBus, GeneratedMail, MailTemplate, Result};
use serde_json::Value;

use crate::events::{
    GENERATE_EMAIL, GET_TEMPLATES, GET_THEMES, GenerateEmailRequest, GetTemplatesRequest,
};

/// Typed wrapper over the registry's read and generate events
#[derive(Debug, Clone)]
pub struct RegistryClient {
    bus: EventBus,
}

impl RegistryClient {
    pub fn new(bus: EventBus) -> Self {
        Self { bus }
    }

    pub async fn get_themes(&self) -> Result<Vec<String>> {
        self.bus.call(GET_THEMES, &()).await
    }

    pub async fn get_templates(&self, theme_id: &str) -> Result<Vec<MailTemplate>> {
        let request = GetTemplatesRequest {
            theme_id: theme_id.to_string(),
        };
        self.bus.call(GET_TEMPLATES, &request).await
    }

    pub async fn generate_email(
        &self,
        theme_id: &str,
        template_id: &str,
        lang: &str,
        meta: Option<Value>,
    ) -> Result<GeneratedMail> {
        let request = GenerateEmailRequest {
            theme_id: theme_id.to_string(),
            template_id: template_id.to_string(),
            lang: lang.to_string(),
            meta,
        };
        self.bus.call(GENERATE_EMAIL, &request).await
    }
}
