//! The registry store and its validate-then-dispatch protocol

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use mailtheme::{
    GeneratedMail, MailError, MailTemplate, MetaValidator, Result, SchemaValidator,
};
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};

/// Capability a theme hands the registry for rendering its templates
#[async_trait]
pub trait Dispatcher: Send + Sync {
    async fn dispatch(&self, template_id: &str, lang: &str, meta: Value) -> Result<GeneratedMail>;
}

struct ThemeState {
    handler: Arc<dyn Dispatcher>,
    templates: Vec<MailTemplate>,
}

/// Process-wide authority over themes and their templates
///
/// Themes live for as long as the registry does. Each theme keeps the handler
/// it was first registered with and its templates in registration order.
pub struct Registry {
    themes: RwLock<BTreeMap<String, ThemeState>>,
    validator: Arc<dyn MetaValidator>,
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl Registry {
    /// Create an empty registry using the built-in schema validator
    pub fn new() -> Self {
        Self::with_validator(Arc::new(SchemaValidator))
    }

    /// Create an empty registry with a custom metadata validator
    pub fn with_validator(validator: Arc<dyn MetaValidator>) -> Self {
        Self {
            themes: RwLock::new(BTreeMap::new()),
            validator,
        }
    }

    /// Register a theme's dispatch handler
    ///
    /// Returns `false` when the theme already existed. In that case the
    /// conflict is logged and the original handler is kept.
    pub async fn register_theme(&self, theme_id: &str, handler: Arc<dyn Dispatcher>) -> bool {
        let mut themes = self.themes.write().await;
        if themes.contains_key(theme_id) {
            error!("Theme [{}] already registered", theme_id);
            return false;
        }
        themes.insert(
            theme_id.to_string(),
            ThemeState {
                handler,
                templates: Vec::new(),
            },
        );
        info!("Theme [{}] registered.", theme_id);
        true
    }

    /// Attach a template to an existing theme
    ///
    /// A template id already present under the theme is ignored with a
    /// warning; the first registration stays.
    pub async fn register_template(&self, theme_id: &str, template: MailTemplate) -> Result<()> {
        let mut themes = self.themes.write().await;
        let theme = themes.get_mut(theme_id).ok_or_else(|| MailError::NoSuchTheme {
            theme_id: theme_id.to_string(),
        })?;

        if theme.templates.iter().any(|t| t.id == template.id) {
            warn!(
                "Template [{}] already registered in theme [{}], keeping the first",
                template.id, theme_id
            );
            return Ok(());
        }

        info!("Template [{}] registered in theme [{}]", template.id, theme_id);
        theme.templates.push(template);
        Ok(())
    }

    /// All known theme ids, in sorted order
    pub async fn list_themes(&self) -> Vec<String> {
        self.themes.read().await.keys().cloned().collect()
    }

    /// Templates of a theme in registration order; empty for an unknown theme
    pub async fn list_templates(&self, theme_id: &str) -> Vec<MailTemplate> {
        self.themes
            .read()
            .await
            .get(theme_id)
            .map(|theme| theme.templates.clone())
            .unwrap_or_default()
    }

    pub async fn theme_count(&self) -> usize {
        self.themes.read().await.len()
    }

    /// Validate a generation request and dispatch it to the owning theme
    ///
    /// Checks run in a fixed order: theme, template, presence of metadata,
    /// schema validation. An undeclared language only logs a warning. Errors
    /// from the theme handler are returned as they are.
    pub async fn generate(
        &self,
        theme_id: &str,
        template_id: &str,
        lang: &str,
        meta: Option<Value>,
    ) -> Result<GeneratedMail> {
        let (handler, template) = {
            let themes = self.themes.read().await;
            let theme = themes.get(theme_id).ok_or_else(|| MailError::NoSuchTheme {
                theme_id: theme_id.to_string(),
            })?;
            let template = theme
                .templates
                .iter()
                .find(|t| t.id.as_ref() == template_id)
                .cloned()
                .ok_or_else(|| MailError::NoSuchTemplate {
                    theme_id: theme_id.to_string(),
                    template_id: template_id.to_string(),
                })?;
            (Arc::clone(&theme.handler), template)
        };

        let meta = match meta {
            Some(Value::Null) | None => {
                return Err(MailError::MissingMeta {
                    theme_id: theme_id.to_string(),
                    template_id: template_id.to_string(),
                });
            }
            Some(meta) => meta,
        };

        let valid_meta = self
            .validator
            .validate(&template.meta_schema, &meta)
            .map_err(|issues| {
                debug!(
                    "Rejected meta for template [{}] in theme [{}] with {} issue(s)",
                    template_id,
                    theme_id,
                    issues.len()
                );
                MailError::InvalidMeta {
                    theme_id: theme_id.to_string(),
                    template_id: template_id.to_string(),
                    issues,
                }
            })?;

        if !template.supports_lang(lang) {
            warn!(
                "Template [{}] in theme [{}] does not support language [{}]",
                template_id, theme_id, lang
            );
        }

        info!("Generating email [{}] from theme [{}]", template_id, theme_id);
        handler.dispatch(template_id, lang, valid_meta).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mailtheme::{FieldType, Schema, ValidationIssue};
    use serde_json::json;
    use std::sync::Mutex;

    /// Records every dispatch and answers with a fixed subject
    struct Recording {
        subject: &'static str,
        calls: Mutex<Vec<(String, String, Value)>>,
    }

    impl Recording {
        fn new(subject: &'static str) -> Arc<Self> {
            Arc::new(Self {
                subject,
                calls: Mutex::new(Vec::new()),
            })
        }

        fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl Dispatcher for Recording {
        async fn dispatch(&self, template_id: &str, lang: &str, meta: Value) -> Result<GeneratedMail> {
            self.calls
                .lock()
                .unwrap()
                .push((template_id.to_string(), lang.to_string(), meta));
            Ok(GeneratedMail {
                subject: self.subject.to_string(),
                plain: "P".to_string(),
                html: "<p>H</p>".to_string(),
                text: None,
            })
        }
    }

    struct Failing;

    #[async_trait]
    impl Dispatcher for Failing {
        async fn dispatch(&self, _template_id: &str, _lang: &str, _meta: Value) -> Result<GeneratedMail> {
            Err(MailError::render("font missing"))
        }
    }

    fn template(id: &str) -> MailTemplate {
        MailTemplate::builder(id)
            .name(format!("Template {}", id))
            .lang("en")
            .meta_schema(
                Schema::builder()
                    .field("name", FieldType::String)
                    .field("count", FieldType::Number)
                    .build(),
            )
            .example_data(json!({ "name": "Alex", "count": 1 }))
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn test_template_requires_existing_theme() {
        let registry = Registry::new();
        let err = registry.register_template("t1", template("a")).await.unwrap_err();
        assert_eq!(
            err,
            MailError::NoSuchTheme {
                theme_id: "t1".to_string()
            }
        );
        assert!(registry.list_templates("t1").await.is_empty());
    }

    #[tokio::test]
    async fn test_first_theme_handler_wins() {
        let registry = Registry::new();
        let first = Recording::new("first");
        let second = Recording::new("second");

        assert!(registry.register_theme("t1", first.clone()).await);
        assert!(!registry.register_theme("t1", second.clone()).await);
        registry.register_template("t1", template("a")).await.unwrap();

        let mail = registry
            .generate("t1", "a", "en", Some(json!({ "name": "Alex", "count": 2 })))
            .await
            .unwrap();

        assert_eq!(mail.subject, "first");
        assert_eq!(first.call_count(), 1);
        assert_eq!(second.call_count(), 0);
        assert_eq!(registry.theme_count().await, 1);
    }

    #[tokio::test]
    async fn test_templates_listed_in_registration_order() {
        let registry = Registry::new();
        registry.register_theme("t1", Recording::new("s")).await;
        for id in ["c", "a", "b"] {
            registry.register_template("t1", template(id)).await.unwrap();
        }

        let ids: Vec<_> = registry
            .list_templates("t1")
            .await
            .into_iter()
            .map(|t| t.id.to_string())
            .collect();
        assert_eq!(ids, vec!["c", "a", "b"]);
    }

    #[tokio::test]
    async fn test_duplicate_template_keeps_first() {
        let registry = Registry::new();
        registry.register_theme("t1", Recording::new("s")).await;
        registry.register_template("t1", template("a")).await.unwrap();

        let mut renamed = template("a");
        renamed.name = "Replacement".to_string();
        registry.register_template("t1", renamed).await.unwrap();

        let templates = registry.list_templates("t1").await;
        assert_eq!(templates.len(), 1);
        assert_eq!(templates[0].name, "Template a");
    }

    #[tokio::test]
    async fn test_missing_meta_checked_before_validation() {
        let registry = Registry::new();
        let handler = Recording::new("s");
        registry.register_theme("t1", handler.clone()).await;
        registry.register_template("t1", template("a")).await.unwrap();

        for meta in [None, Some(Value::Null)] {
            let err = registry.generate("t1", "a", "en", meta).await.unwrap_err();
            assert_eq!(err.code(), "NO_META");
        }
        assert_eq!(handler.call_count(), 0);
    }

    #[tokio::test]
    async fn test_invalid_meta_reports_each_violated_field() {
        let registry = Registry::new();
        let handler = Recording::new("s");
        registry.register_theme("t1", handler.clone()).await;
        registry.register_template("t1", template("a")).await.unwrap();

        let err = registry
            .generate("t1", "a", "en", Some(json!({ "count": "many" })))
            .await
            .unwrap_err();

        assert_eq!(
            err.issues(),
            &[
                ValidationIssue::new("name", "Required"),
                ValidationIssue::new("count", "Expected number"),
            ]
        );
        assert_eq!(handler.call_count(), 0);
    }

    #[tokio::test]
    async fn test_unknown_template_in_known_theme() {
        let registry = Registry::new();
        registry.register_theme("t1", Recording::new("s")).await;

        let err = registry
            .generate("t1", "missing", "en", Some(json!({})))
            .await
            .unwrap_err();
        assert_eq!(err.code(), "NO_TEMPLATE");
    }

    #[tokio::test]
    async fn test_unsupported_language_still_generates() {
        let registry = Registry::new();
        let handler = Recording::new("s");
        registry.register_theme("t1", handler.clone()).await;
        registry.register_template("t1", template("a")).await.unwrap();

        registry
            .generate("t1", "a", "fr", Some(json!({ "name": "Alex", "count": 1 })))
            .await
            .unwrap();

        let calls = handler.calls.lock().unwrap();
        assert_eq!(calls[0].1, "fr");
    }

    #[tokio::test]
    async fn test_handler_receives_normalized_meta() {
        let registry = Registry::new();
        let handler = Recording::new("s");
        registry.register_theme("t1", handler.clone()).await;
        registry.register_template("t1", template("a")).await.unwrap();

        registry
            .generate("t1", "a", "en", Some(json!({ "name": "Alex", "count": 1, "extra": true })))
            .await
            .unwrap();

        let calls = handler.calls.lock().unwrap();
        assert_eq!(calls[0].2, json!({ "name": "Alex", "count": 1 }));
    }

    #[tokio::test]
    async fn test_handler_errors_are_not_reclassified() {
        let registry = Registry::new();
        registry.register_theme("t1", Arc::new(Failing)).await;
        registry.register_template("t1", template("a")).await.unwrap();

        let err = registry
            .generate("t1", "a", "en", Some(json!({ "name": "Alex", "count": 1 })))
            .await
            .unwrap_err();
        assert_eq!(err, MailError::render("font missing"));
    }

    #[tokio::test]
    async fn test_custom_validator_is_used() {
        struct RejectAll;
        impl MetaValidator for RejectAll {
            fn validate(
                &self,
                _schema: &Schema,
                _value: &Value,
            ) -> std::result::Result<Value, Vec<ValidationIssue>> {
                Err(vec![ValidationIssue::new("<root>", "Rejected")])
            }
        }

        let registry = Registry::with_validator(Arc::new(RejectAll));
        registry.register_theme("t1", Recording::new("s")).await;
        registry.register_template("t1", template("a")).await.unwrap();

        let err = registry
            .generate("t1", "a", "en", Some(json!({ "name": "Alex", "count": 1 })))
            .await
            .unwrap_err();
        assert_eq!(err.code(), "INVALID_META");
    }
}
