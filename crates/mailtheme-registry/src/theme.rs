//! Theme client used by participants that provide templates

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use mailtheme::{
    EmailTemplate, EventBus, GeneratedMail, MailError, MailTemplate, Result, ReturnableHandler,
    TemplateHandler,
};
use serde_json::Value;
use tokio::sync::{OnceCell, RwLock};
use tracing::{debug, info, warn};

use crate::events::{
    DispatchRequest, REGISTER_TEMPLATE, REGISTER_THEME, RegisterTemplateRequest,
    RegisterThemeRequest, theme_event,
};

type HandlerTable = Arc<RwLock<HashMap<String, Arc<dyn TemplateHandler>>>>;

/// One entry of a bulk registration
///
/// `template` is `None` when the source did not provide anything usable as a
/// template; such entries are skipped.
pub struct TemplateModule {
    pub source: String,
    pub template: Option<Arc<dyn EmailTemplate>>,
}

impl TemplateModule {
    pub fn new(source: impl Into<String>, template: Arc<dyn EmailTemplate>) -> Self {
        Self {
            source: source.into(),
            template: Some(template),
        }
    }

    pub fn empty(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            template: None,
        }
    }
}

/// Answers the registry's dispatch calls from the local handler table
struct ThemeDispatch {
    handlers: HandlerTable,
}

#[async_trait]
impl ReturnableHandler for ThemeDispatch {
    async fn handle(&self, args: Value) -> Result<Value> {
        let request: DispatchRequest = serde_json::from_value(args)?;
        let handler = self
            .handlers
            .read()
            .await
            .get(&request.template_id)
            .cloned()
            .ok_or_else(|| MailError::NoHandler {
                template_id: request.template_id.clone(),
            })?;

        let mail = handler.render(&request.lang, request.meta).await?;
        Ok(serde_json::to_value(mail)?)
    }
}

struct EmailTemplateHandler(Arc<dyn EmailTemplate>);

#[async_trait]
impl TemplateHandler for EmailTemplateHandler {
    async fn render(&self, lang: &str, meta: Value) -> Result<GeneratedMail> {
        self.0.render(lang, meta).await
    }
}

/// Registers one theme and its templates with the registry
///
/// The theme itself is registered at most once per client, however many
/// templates follow and however often initialisation is triggered.
pub struct ThemeClient {
    bus: EventBus,
    theme_id: String,
    handlers: HandlerTable,
    listening: AtomicBool,
    registered: OnceCell<()>,
}

impl ThemeClient {
    pub fn new(bus: EventBus, theme_id: impl Into<String>) -> Self {
        Self {
            bus,
            theme_id: theme_id.into(),
            handlers: Arc::new(RwLock::new(HashMap::new())),
            listening: AtomicBool::new(false),
            registered: OnceCell::new(),
        }
    }

    pub fn theme_id(&self) -> &str {
        &self.theme_id
    }

    /// Register the theme unless this client already did
    pub async fn ensure_registered(&self) -> Result<()> {
        self.registered
            .get_or_try_init(|| self.register_theme())
            .await?;
        Ok(())
    }

    async fn register_theme(&self) -> Result<()> {
        debug!("Registering theme {}", self.theme_id);
        // The listener outlives a failed registerTheme, so only bind it once
        if !self.listening.swap(true, Ordering::SeqCst) {
            let dispatch = ThemeDispatch {
                handlers: Arc::clone(&self.handlers),
            };
            if let Err(e) = self
                .bus
                .on_returnable_event(theme_event(&self.theme_id), dispatch)
            {
                warn!(
                    "Theme {} is already served on this bus, generation stays with the first provider: {}",
                    self.theme_id, e
                );
            }
        }

        let request = RegisterThemeRequest {
            theme_id: self.theme_id.clone(),
        };
        self.bus.call::<_, ()>(REGISTER_THEME, &request).await?;
        info!("Registered theme {}", self.theme_id);
        Ok(())
    }

    /// Register a template descriptor together with the handler that renders it
    ///
    /// A template id this client already holds a handler for keeps its first
    /// handler, matching the registry which keeps the first descriptor.
    pub async fn register_template<H>(&self, template: MailTemplate, handler: H) -> Result<()>
    where
        H: TemplateHandler + 'static,
    {
        self.add_template(template, Arc::new(handler)).await?;
        Ok(())
    }

    // Returns false when the id was already taken
    async fn add_template(
        &self,
        template: MailTemplate,
        handler: Arc<dyn TemplateHandler>,
    ) -> Result<bool> {
        self.ensure_registered().await?;

        let id = template.id.to_string();
        {
            let mut handlers = self.handlers.write().await;
            if handlers.contains_key(&id) {
                warn!(
                    "Template {} already registered in theme {}, keeping the first",
                    id, self.theme_id
                );
                return Ok(false);
            }
            handlers.insert(id.clone(), handler);
        }

        debug!("Registering template {}", id);
        let request = RegisterTemplateRequest {
            theme_id: self.theme_id.clone(),
            template,
        };
        self.bus.call::<_, ()>(REGISTER_TEMPLATE, &request).await?;
        info!("Registered template {}", id);
        Ok(true)
    }

    /// Register a self-describing template
    pub async fn register_email_template(&self, template: Arc<dyn EmailTemplate>) -> Result<()> {
        let descriptor = template.descriptor()?;
        self.register_template(descriptor, EmailTemplateHandler(template))
            .await
    }

    /// Register a batch of templates, skipping entries that are not usable
    ///
    /// Returns how many templates were registered. Registry failures still
    /// abort the batch.
    pub async fn register_email_templates<I>(&self, modules: I) -> Result<usize>
    where
        I: IntoIterator<Item = TemplateModule>,
    {
        self.ensure_registered().await?;

        let mut registered = 0;
        for module in modules {
            let Some(template) = module.template else {
                warn!(
                    "Template {} is not a valid email template, skipping",
                    module.source
                );
                continue;
            };
            let descriptor = match template.descriptor() {
                Ok(descriptor) => descriptor,
                Err(e) => {
                    warn!("Template {} has an invalid descriptor, skipping: {}", module.source, e);
                    continue;
                }
            };
            debug!("Registering template {}", module.source);
            if self
                .add_template(descriptor, Arc::new(EmailTemplateHandler(template)))
                .await?
            {
                registered += 1;
            }
        }
        Ok(registered)
    }
}
