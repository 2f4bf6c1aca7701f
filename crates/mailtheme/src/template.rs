//! Mail template descriptors

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{MailError, Result, TemplateError};
use crate::schema::Schema;

/// Identifier of a template, unique within its theme
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(transparent)]
pub struct TemplateId(pub String);

impl From<String> for TemplateId {
    fn from(s: String) -> Self {
        TemplateId(s)
    }
}

impl From<&str> for TemplateId {
    fn from(s: &str) -> Self {
        TemplateId(s.to_string())
    }
}

impl AsRef<str> for TemplateId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TemplateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Everything the registry knows about a template
///
/// The descriptor carries no rendering code; that stays with the theme that
/// registered it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MailTemplate {
    pub id: TemplateId,

    /// Display name
    pub name: String,

    pub description: String,

    /// Supported language tags
    pub langs: Vec<String>,

    /// Schema the generation metadata must satisfy
    pub meta_schema: Schema,

    /// Sample metadata that satisfies `meta_schema`
    pub example_data: serde_json::Value,
}

impl MailTemplate {
    /// Create a new template builder
    pub fn builder(id: impl Into<TemplateId>) -> MailTemplateBuilder {
        MailTemplateBuilder::new(id.into())
    }

    /// Whether the template declares the given language
    pub fn supports_lang(&self, lang: &str) -> bool {
        self.langs.iter().any(|l| l == lang)
    }
}

/// Builder for creating template descriptors with a fluent API
#[derive(Debug)]
pub struct MailTemplateBuilder {
    id: TemplateId,
    name: Option<String>,
    description: Option<String>,
    langs: Vec<String>,
    meta_schema: Option<Schema>,
    example_data: Option<serde_json::Value>,
}

impl MailTemplateBuilder {
    pub fn new(id: TemplateId) -> Self {
        MailTemplateBuilder {
            id,
            name: None,
            description: None,
            langs: Vec::new(),
            meta_schema: None,
            example_data: None,
        }
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Add a supported language
    pub fn lang(mut self, lang: impl Into<String>) -> Self {
        self.langs.push(lang.into());
        self
    }

    pub fn langs<I, S>(mut self, langs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.langs.extend(langs.into_iter().map(Into::into));
        self
    }

    pub fn meta_schema(mut self, schema: Schema) -> Self {
        self.meta_schema = Some(schema);
        self
    }

    pub fn example_data(mut self, data: serde_json::Value) -> Self {
        self.example_data = Some(data);
        self
    }

    /// Build the descriptor
    ///
    /// Fails when the name is missing, no language is declared, a schema
    /// pattern does not compile, or the example data does not satisfy the
    /// schema.
    pub fn build(self) -> Result<MailTemplate> {
        let name = self.name.ok_or_else(|| {
            MailError::Template(TemplateError::MissingAttribute {
                attribute: "name".to_string(),
            })
        })?;
        if self.langs.is_empty() {
            return Err(TemplateError::NoLanguages {
                template_id: self.id.to_string(),
            }
            .into());
        }

        let meta_schema = self.meta_schema.unwrap_or_default();
        if let Err(issues) = meta_schema.check_patterns() {
            return Err(TemplateError::InvalidPattern {
                template_id: self.id.to_string(),
                issues,
            }
            .into());
        }

        let example_data = self
            .example_data
            .unwrap_or_else(|| serde_json::Value::Object(Default::default()));
        if let Err(issues) = meta_schema.validate(&example_data) {
            return Err(TemplateError::InvalidExampleData {
                template_id: self.id.to_string(),
                issues,
            }
            .into());
        }

        Ok(MailTemplate {
            id: self.id,
            name,
            description: self.description.unwrap_or_default(),
            langs: self.langs,
            meta_schema,
            example_data,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{FieldType, SchemaField};
    use serde_json::json;

    fn name_schema() -> Schema {
        Schema::builder().field("name", FieldType::String).build()
    }

    #[test]
    fn test_builder_produces_descriptor() {
        let template = MailTemplate::builder("tmpl1")
            .name("Welcome")
            .description("Sent after sign-up")
            .langs(["en", "de"])
            .meta_schema(name_schema())
            .example_data(json!({ "name": "Alex" }))
            .build()
            .unwrap();

        assert_eq!(template.id.as_ref(), "tmpl1");
        assert!(template.supports_lang("de"));
        assert!(!template.supports_lang("fr"));
    }

    #[test]
    fn test_descriptor_wire_shape() {
        let template = MailTemplate::builder("tmpl1")
            .name("Welcome")
            .lang("en")
            .meta_schema(name_schema())
            .example_data(json!({ "name": "Alex" }))
            .build()
            .unwrap();

        let value = serde_json::to_value(&template).unwrap();
        assert_eq!(value["id"], "tmpl1");
        assert_eq!(value["exampleData"], json!({ "name": "Alex" }));
        assert!(value["metaSchema"]["fields"].is_array());
    }

    #[test]
    fn test_builder_rejects_missing_langs() {
        let err = MailTemplate::builder("tmpl1").name("Welcome").build().unwrap_err();
        assert_eq!(
            err,
            MailError::Template(TemplateError::NoLanguages {
                template_id: "tmpl1".to_string()
            })
        );
    }

    #[test]
    fn test_builder_rejects_invalid_example_data() {
        let err = MailTemplate::builder("tmpl1")
            .name("Welcome")
            .lang("en")
            .meta_schema(name_schema())
            .example_data(json!({ "name": 42 }))
            .build()
            .unwrap_err();

        assert_eq!(err.code(), "INVALID_TEMPLATE");
        assert_eq!(err.issues().len(), 1);
    }

    #[test]
    fn test_builder_rejects_uncompilable_pattern() {
        let schema = Schema::builder()
            .with(SchemaField::new("code", FieldType::String).with_pattern("[0-9"))
            .build();

        // No example value for `code`, so only the pattern check can catch it
        let err = MailTemplate::builder("tmpl1")
            .name("Welcome")
            .lang("en")
            .meta_schema(schema)
            .build()
            .unwrap_err();

        assert!(matches!(
            err,
            MailError::Template(TemplateError::InvalidPattern { .. })
        ));
        assert_eq!(err.issues()[0].path, "code");
    }
}
