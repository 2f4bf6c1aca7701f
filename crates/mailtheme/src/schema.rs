//! Schema definition for template metadata

use std::collections::HashMap;
use std::sync::RwLock;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use time::format_description::well_known::Rfc3339;

use crate::error::ValidationIssue;

/// Supported field types in a schema
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    String,
    Number,
    Boolean,
    Date,
    Object(Box<Schema>),
    Array(Box<FieldType>),
}

/// A field in a schema with metadata
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SchemaField {
    pub key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    pub field_type: FieldType,
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    /// Regular expression a string value must match
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_length: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_length: Option<usize>,
}

impl SchemaField {
    /// Create a required field of the given type
    pub fn new(key: impl Into<String>, field_type: FieldType) -> Self {
        SchemaField {
            key: key.into(),
            label: None,
            field_type,
            required: true,
            description: None,
            default: None,
            pattern: None,
            min_length: None,
            max_length: None,
        }
    }

    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_default(mut self, default: Value) -> Self {
        self.default = Some(default);
        self
    }

    pub fn with_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.pattern = Some(pattern.into());
        self
    }

    /// Bound the length of a string value (in characters)
    pub fn with_length(mut self, min: Option<usize>, max: Option<usize>) -> Self {
        self.min_length = min;
        self.max_length = max;
        self
    }
}

/// A schema describing the metadata a template accepts
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Schema {
    pub fields: Vec<SchemaField>,
}

/// Capability that checks a value against a schema
///
/// On success the validator returns the normalized value handed on to the
/// theme; on failure it returns every issue it found.
pub trait MetaValidator: Send + Sync {
    fn validate(
        &self,
        schema: &Schema,
        value: &Value,
    ) -> std::result::Result<Value, Vec<ValidationIssue>>;
}

/// Default validator backed by the schema IR in this module
#[derive(Debug, Clone, Copy, Default)]
pub struct SchemaValidator;

impl MetaValidator for SchemaValidator {
    fn validate(
        &self,
        schema: &Schema,
        value: &Value,
    ) -> std::result::Result<Value, Vec<ValidationIssue>> {
        schema.validate(value)
    }
}

impl Schema {
    /// Create a new empty schema
    pub fn new() -> Self {
        Schema { fields: Vec::new() }
    }

    /// Start a fluent schema builder
    pub fn builder() -> SchemaBuilder {
        SchemaBuilder::default()
    }

    /// Add a field to the schema
    pub fn add_field(&mut self, field: SchemaField) -> &mut Self {
        self.fields.push(field);
        self
    }

    /// Look up a field by key
    pub fn field(&self, key: &str) -> Option<&SchemaField> {
        self.fields.iter().find(|f| f.key == key)
    }

    /// Validate data against this schema
    ///
    /// Every violated field contributes one issue. The returned value keeps
    /// only declared fields and fills absent optional fields from their
    /// declared default.
    pub fn validate(&self, data: &Value) -> std::result::Result<Value, Vec<ValidationIssue>> {
        let mut issues = Vec::new();
        let normalized = self.validate_object(data, "", &mut issues);
        if issues.is_empty() {
            Ok(normalized)
        } else {
            Err(issues)
        }
    }

    fn validate_object(&self, data: &Value, prefix: &str, issues: &mut Vec<ValidationIssue>) -> Value {
        let Some(data_obj) = data.as_object() else {
            let path = if prefix.is_empty() { "<root>" } else { prefix };
            issues.push(ValidationIssue::new(path, "Expected object"));
            return Value::Null;
        };

        let mut normalized = Map::new();
        for field in &self.fields {
            let path = join_path(prefix, &field.key);
            match data_obj.get(&field.key) {
                None | Some(Value::Null) => {
                    if let Some(default) = &field.default {
                        normalized.insert(field.key.clone(), default.clone());
                    } else if field.required {
                        issues.push(ValidationIssue::new(path, "Required"));
                    }
                }
                Some(value) => {
                    if let Some(v) = validate_field(field, &field.field_type, value, &path, issues) {
                        normalized.insert(field.key.clone(), v);
                    }
                }
            }
        }

        Value::Object(normalized)
    }

    /// Check that every declared pattern, nested ones included, compiles
    pub fn check_patterns(&self) -> std::result::Result<(), Vec<ValidationIssue>> {
        let mut issues = Vec::new();
        self.collect_pattern_issues("", &mut issues);
        if issues.is_empty() {
            Ok(())
        } else {
            Err(issues)
        }
    }

    fn collect_pattern_issues(&self, prefix: &str, issues: &mut Vec<ValidationIssue>) {
        for field in &self.fields {
            let path = join_path(prefix, &field.key);
            if let Some(pattern) = &field.pattern {
                if let Err(e) = compile_pattern(pattern) {
                    issues.push(ValidationIssue::new(&path, format!("Invalid pattern: {}", e)));
                }
            }

            let mut field_type = &field.field_type;
            while let FieldType::Array(item_type) = field_type {
                field_type = item_type;
            }
            if let FieldType::Object(sub_schema) = field_type {
                sub_schema.collect_pattern_issues(&path, issues);
            }
        }
    }

    /// Convert a string-only form submission into typed JSON
    ///
    /// Values are parsed according to the declared field type. Empty inputs
    /// for optional fields are dropped; anything that does not parse is kept
    /// as the raw string so validation reports it.
    pub fn coerce_form(&self, form: &HashMap<String, String>) -> Value {
        let mut data = Map::new();
        for (key, raw) in form {
            let field = self.field(key);
            if raw.is_empty() && field.is_some_and(|f| !f.required) {
                continue;
            }
            let value = match field.map(|f| &f.field_type) {
                Some(FieldType::Number) => raw
                    .parse::<f64>()
                    .ok()
                    .and_then(serde_json::Number::from_f64)
                    .map(Value::Number)
                    .unwrap_or_else(|| Value::String(raw.clone())),
                Some(FieldType::Boolean) => match raw.as_str() {
                    "true" | "on" | "1" => Value::Bool(true),
                    "false" | "off" | "0" => Value::Bool(false),
                    _ => Value::String(raw.clone()),
                },
                Some(FieldType::Object(_)) | Some(FieldType::Array(_)) => {
                    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.clone()))
                }
                _ => Value::String(raw.clone()),
            };
            data.insert(key.clone(), value);
        }
        Value::Object(data)
    }
}

static PATTERNS: Lazy<RwLock<HashMap<String, Regex>>> = Lazy::new(Default::default);

// Compiled patterns are cached by source; schemas are validated on every generation
fn compile_pattern(pattern: &str) -> std::result::Result<Regex, regex::Error> {
    if let Some(re) = PATTERNS
        .read()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
        .get(pattern)
    {
        return Ok(re.clone());
    }

    let re = Regex::new(pattern)?;
    PATTERNS
        .write()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
        .insert(pattern.to_string(), re.clone());
    Ok(re)
}

fn join_path(prefix: &str, key: &str) -> String {
    if prefix.is_empty() {
        key.to_string()
    } else {
        format!("{}.{}", prefix, key)
    }
}

// Returns the normalized value, or None after recording an issue
fn validate_field(
    field: &SchemaField,
    field_type: &FieldType,
    value: &Value,
    path: &str,
    issues: &mut Vec<ValidationIssue>,
) -> Option<Value> {
    match field_type {
        FieldType::String => {
            let Some(s) = value.as_str() else {
                issues.push(ValidationIssue::new(path, "Expected string"));
                return None;
            };
            let len = s.chars().count();
            if let Some(min) = field.min_length {
                if len < min {
                    issues.push(ValidationIssue::new(
                        path,
                        format!("String must contain at least {} character(s)", min),
                    ));
                    return None;
                }
            }
            if let Some(max) = field.max_length {
                if len > max {
                    issues.push(ValidationIssue::new(
                        path,
                        format!("String must contain at most {} character(s)", max),
                    ));
                    return None;
                }
            }
            if let Some(pattern) = &field.pattern {
                match compile_pattern(pattern) {
                    Ok(re) if re.is_match(s) => {}
                    Ok(_) => {
                        issues.push(ValidationIssue::new(path, "Invalid"));
                        return None;
                    }
                    Err(e) => {
                        issues.push(ValidationIssue::new(path, format!("Invalid pattern: {}", e)));
                        return None;
                    }
                }
            }
            Some(value.clone())
        }
        FieldType::Number => {
            if !value.is_number() {
                issues.push(ValidationIssue::new(path, "Expected number"));
                return None;
            }
            Some(value.clone())
        }
        FieldType::Boolean => {
            if !value.is_boolean() {
                issues.push(ValidationIssue::new(path, "Expected boolean"));
                return None;
            }
            Some(value.clone())
        }
        FieldType::Date => {
            let parsed = value.as_str().is_some_and(|s| {
                time::OffsetDateTime::parse(s, &Rfc3339).is_ok()
                    || time::Date::parse(s, time::macros::format_description!("[year]-[month]-[day]"))
                        .is_ok()
            });
            if !parsed {
                issues.push(ValidationIssue::new(path, "Expected date"));
                return None;
            }
            Some(value.clone())
        }
        FieldType::Object(sub_schema) => {
            let before = issues.len();
            let normalized = sub_schema.validate_object(value, path, issues);
            (issues.len() == before).then_some(normalized)
        }
        FieldType::Array(item_type) => {
            let Some(array) = value.as_array() else {
                issues.push(ValidationIssue::new(path, "Expected array"));
                return None;
            };
            let before = issues.len();
            let items: Vec<Value> = array
                .iter()
                .enumerate()
                .filter_map(|(i, item)| {
                    validate_field(field, item_type, item, &format!("{}[{}]", path, i), issues)
                })
                .collect();
            (issues.len() == before).then_some(Value::Array(items))
        }
    }
}

/// Builder for schemas with a fluent API
#[derive(Debug, Default)]
pub struct SchemaBuilder {
    fields: Vec<SchemaField>,
}

impl SchemaBuilder {
    /// Add a required field
    pub fn field(mut self, key: impl Into<String>, field_type: FieldType) -> Self {
        self.fields.push(SchemaField::new(key, field_type));
        self
    }

    /// Add an optional field
    pub fn optional(mut self, key: impl Into<String>, field_type: FieldType) -> Self {
        self.fields.push(SchemaField::new(key, field_type).optional());
        self
    }

    /// Add a fully specified field
    pub fn with(mut self, field: SchemaField) -> Self {
        self.fields.push(field);
        self
    }

    pub fn build(self) -> Schema {
        Schema {
            fields: self.fields,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn verification_schema() -> Schema {
        Schema::builder()
            .with(
                SchemaField::new("otp", FieldType::String)
                    .with_length(Some(5), Some(10))
                    .with_pattern("^[0-9A-Za-z-]+$"),
            )
            .field("companyName", FieldType::String)
            .optional("companyLogo", FieldType::String)
            .build()
    }

    #[test]
    fn test_valid_data_is_normalized() {
        let schema = verification_schema();
        let data = json!({
            "otp": "12345",
            "companyName": "Acme",
            "unexpected": true
        });

        let normalized = schema.validate(&data).unwrap();
        assert_eq!(normalized, json!({ "otp": "12345", "companyName": "Acme" }));
    }

    #[test]
    fn test_one_issue_per_violated_field() {
        let schema = verification_schema();
        let data = json!({ "otp": "12", "companyLogo": 4 });

        let issues = schema.validate(&data).unwrap_err();
        assert_eq!(issues.len(), 3);
        assert_eq!(issues[0].path, "otp");
        assert_eq!(issues[1], ValidationIssue::new("companyName", "Required"));
        assert_eq!(issues[2], ValidationIssue::new("companyLogo", "Expected string"));
    }

    #[test]
    fn test_pattern_mismatch() {
        let schema = verification_schema();
        let issues = schema
            .validate(&json!({ "otp": "12 345", "companyName": "Acme" }))
            .unwrap_err();
        assert_eq!(issues, vec![ValidationIssue::new("otp", "Invalid")]);
    }

    #[test]
    fn test_check_patterns_reaches_nested_fields() {
        assert!(verification_schema().check_patterns().is_ok());

        let company = Schema::builder()
            .with(SchemaField::new("vat", FieldType::String).with_pattern("(unclosed"))
            .build();
        let schema = Schema::builder()
            .field("companies", FieldType::Array(Box::new(FieldType::Object(Box::new(company)))))
            .build();

        let issues = schema.check_patterns().unwrap_err();
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].path, "companies.vat");
        assert!(issues[0].message.starts_with("Invalid pattern"));
    }

    #[test]
    fn test_defaults_fill_missing_optional_fields() {
        let schema = Schema::builder()
            .with(SchemaField::new("colour", FieldType::String).optional().with_default(json!("#000000")))
            .build();

        let normalized = schema.validate(&json!({})).unwrap();
        assert_eq!(normalized, json!({ "colour": "#000000" }));
    }

    #[test]
    fn test_nested_paths() {
        let address = Schema::builder().field("city", FieldType::String).build();
        let schema = Schema::builder()
            .field("address", FieldType::Object(Box::new(address)))
            .field("tags", FieldType::Array(Box::new(FieldType::Number)))
            .build();

        let issues = schema
            .validate(&json!({ "address": {}, "tags": [1, "two"] }))
            .unwrap_err();
        let paths: Vec<_> = issues.iter().map(|i| i.path.as_str()).collect();
        assert_eq!(paths, vec!["address.city", "tags[1]"]);
    }

    #[test]
    fn test_date_fields() {
        let schema = Schema::builder().field("stayDate", FieldType::Date).build();
        assert!(schema.validate(&json!({ "stayDate": "2024-03-01" })).is_ok());
        assert!(schema.validate(&json!({ "stayDate": "2024-03-01T10:00:00Z" })).is_ok());
        assert!(schema.validate(&json!({ "stayDate": "yesterday" })).is_err());
    }

    #[test]
    fn test_root_must_be_object() {
        let issues = verification_schema().validate(&json!("nope")).unwrap_err();
        assert_eq!(issues, vec![ValidationIssue::new("<root>", "Expected object")]);
    }

    #[test]
    fn test_coerce_form_uses_field_types() {
        let schema = Schema::builder()
            .field("name", FieldType::String)
            .field("nights", FieldType::Number)
            .optional("subscribed", FieldType::Boolean)
            .optional("nickname", FieldType::String)
            .build();

        let form = HashMap::from([
            ("name".to_string(), "Alex".to_string()),
            ("nights".to_string(), "3".to_string()),
            ("subscribed".to_string(), "on".to_string()),
            ("nickname".to_string(), String::new()),
        ]);

        let data = schema.coerce_form(&form);
        assert_eq!(data, json!({ "name": "Alex", "nights": 3.0, "subscribed": true }));
        assert!(schema.validate(&data).is_ok());
    }
}
