//! Binds a [`Registry`] to the event bus

use std::sync::Arc;

use async_trait::async_trait;
use mailtheme::{BusError, EventBus, GeneratedMail, ReturnableHandler, Result};
use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;
use tracing::{debug, info};

use crate::events::{
    DispatchRequest, GENERATE_EMAIL, GET_TEMPLATES, GET_THEMES, GenerateEmailRequest,
    GetTemplatesRequest, REGISTER_TEMPLATE, REGISTER_THEME, RegisterTemplateRequest,
    RegisterThemeRequest, theme_event,
};
use crate::registry::{Dispatcher, Registry};

/// Dispatcher that forwards generation to a theme's bus event
#[derive(Debug, Clone)]
pub struct BusDispatcher {
    bus: EventBus,
    event: String,
}

impl BusDispatcher {
    pub fn new(bus: EventBus, event: impl Into<String>) -> Self {
        Self {
            bus,
            event: event.into(),
        }
    }

    /// Dispatcher for the conventional callback event of a theme
    pub fn for_theme(bus: EventBus, theme_id: &str) -> Self {
        Self::new(bus, theme_event(theme_id))
    }
}

#[async_trait]
impl Dispatcher for BusDispatcher {
    async fn dispatch(&self, template_id: &str, lang: &str, meta: Value) -> Result<GeneratedMail> {
        let request = DispatchRequest {
            template_id: template_id.to_string(),
            lang: lang.to_string(),
            meta,
        };
        self.bus.call(&self.event, &request).await
    }
}

#[derive(Debug, Clone, Copy)]
enum Operation {
    GetThemes,
    GetTemplates,
    GenerateEmail,
    RegisterTheme,
    RegisterTemplate,
}

impl Operation {
    const ALL: [(Operation, &'static str); 5] = [
        (Operation::GetThemes, GET_THEMES),
        (Operation::GetTemplates, GET_TEMPLATES),
        (Operation::GenerateEmail, GENERATE_EMAIL),
        (Operation::RegisterTheme, REGISTER_THEME),
        (Operation::RegisterTemplate, REGISTER_TEMPLATE),
    ];
}

struct RegistryHandler {
    registry: Arc<Registry>,
    bus: EventBus,
    operation: Operation,
}

fn parse<T: DeserializeOwned>(args: Value) -> Result<T> {
    Ok(serde_json::from_value(args)?)
}

fn respond<T: Serialize>(value: T) -> Result<Value> {
    Ok(serde_json::to_value(value)?)
}

#[async_trait]
impl ReturnableHandler for RegistryHandler {
    async fn handle(&self, args: Value) -> Result<Value> {
        debug!("Registry handling {:?}", self.operation);
        match self.operation {
            Operation::GetThemes => respond(self.registry.list_themes().await),
            Operation::GetTemplates => {
                let request: GetTemplatesRequest = parse(args)?;
                respond(self.registry.list_templates(&request.theme_id).await)
            }
            Operation::GenerateEmail => {
                let request: GenerateEmailRequest = parse(args)?;
                let mail = self
                    .registry
                    .generate(
                        &request.theme_id,
                        &request.template_id,
                        &request.lang,
                        request.meta,
                    )
                    .await?;
                respond(mail)
            }
            Operation::RegisterTheme => {
                let request: RegisterThemeRequest = parse(args)?;
                let dispatcher = BusDispatcher::for_theme(self.bus.clone(), &request.theme_id);
                self.registry
                    .register_theme(&request.theme_id, Arc::new(dispatcher))
                    .await;
                Ok(Value::Null)
            }
            Operation::RegisterTemplate => {
                let request: RegisterTemplateRequest = parse(args)?;
                self.registry
                    .register_template(&request.theme_id, request.template)
                    .await?;
                Ok(Value::Null)
            }
        }
    }
}

/// Serves the registry's operations on a bus
pub struct RegistryService;

impl RegistryService {
    /// Register the five registry events on the bus
    ///
    /// Fails if any of the events already has a handler, which means another
    /// registry is already serving this bus. Nothing is bound in that case.
    pub fn bind(registry: Arc<Registry>, bus: &EventBus) -> Result<()> {
        if let Some((_, event)) = Operation::ALL
            .iter()
            .find(|(_, event)| bus.has_returnable_handler(event))
        {
            return Err(BusError::HandlerExists {
                event: event.to_string(),
            }
            .into());
        }

        for (operation, event) in Operation::ALL {
            bus.on_returnable_event(
                event,
                RegistryHandler {
                    registry: Arc::clone(&registry),
                    bus: bus.clone(),
                    operation,
                },
            )?;
        }
        info!("Registry serving {} events", Operation::ALL.len());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mailtheme::{MailError, MailTemplate};
    use serde_json::json;

    #[tokio::test]
    async fn test_bind_twice_is_rejected() {
        let bus = EventBus::new();
        let registry = Arc::new(Registry::new());

        RegistryService::bind(Arc::clone(&registry), &bus).unwrap();
        let err = RegistryService::bind(registry, &bus).unwrap_err();
        assert_eq!(err.code(), "BUS_ERROR");
    }

    #[tokio::test]
    async fn test_bind_leaves_partially_served_bus_untouched() {
        let bus = EventBus::new();
        bus.on_returnable_event(GENERATE_EMAIL, |_args: Value| async move {
            Ok::<_, MailError>(Value::Null)
        })
        .unwrap();

        let err = RegistryService::bind(Arc::new(Registry::new()), &bus).unwrap_err();
        assert_eq!(
            err,
            MailError::Bus(BusError::HandlerExists {
                event: GENERATE_EMAIL.to_string()
            })
        );
        assert!(!bus.has_returnable_handler(GET_THEMES));
        assert!(!bus.has_returnable_handler(REGISTER_THEME));
    }

    #[tokio::test]
    async fn test_register_template_over_bus_requires_theme() {
        let bus = EventBus::new();
        RegistryService::bind(Arc::new(Registry::new()), &bus).unwrap();

        let request = RegisterTemplateRequest {
            theme_id: "t1".to_string(),
            template: MailTemplate::builder("a").name("A").lang("en").build().unwrap(),
        };
        let err = bus.call::<_, ()>(REGISTER_TEMPLATE, &request).await.unwrap_err();
        assert_eq!(
            err,
            MailError::NoSuchTheme {
                theme_id: "t1".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_dispatch_without_theme_listener_is_a_bus_failure() {
        let bus = EventBus::new();
        let registry = Arc::new(Registry::new());
        RegistryService::bind(Arc::clone(&registry), &bus).unwrap();

        bus.call::<_, ()>(REGISTER_THEME, &RegisterThemeRequest { theme_id: "ghost".to_string() })
            .await
            .unwrap();
        let request = RegisterTemplateRequest {
            theme_id: "ghost".to_string(),
            template: MailTemplate::builder("a").name("A").lang("en").build().unwrap(),
        };
        bus.call::<_, ()>(REGISTER_TEMPLATE, &request).await.unwrap();

        let err = registry
            .generate("ghost", "a", "en", Some(json!({})))
            .await
            .unwrap_err();
        assert!(matches!(err, MailError::Bus(_)));
    }

    #[tokio::test]
    async fn test_malformed_request_is_a_serialization_error() {
        let bus = EventBus::new();
        RegistryService::bind(Arc::new(Registry::new()), &bus).unwrap();

        let err = bus
            .emit_returnable_event(GET_TEMPLATES, json!({ "wrong": 1 }))
            .await
            .unwrap_err();
        assert_eq!(err.code(), "SERIALIZATION");
    }
}
