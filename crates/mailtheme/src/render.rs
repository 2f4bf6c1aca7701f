//! Mail rendering
//!
//! The registry never renders anything itself. Rendering happens inside the
//! theme that owns a template, behind the [`TemplateHandler`] and
//! [`EmailTemplate`] traits. [`MailLayout`] is a small placeholder renderer
//! themes can use when they do not bring their own engine.

use std::future::Future;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{MailError, Result};
use crate::template::MailTemplate;

/// Rendered output of a generation request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedMail {
    pub subject: String,
    /// Plain-text rendering of the HTML body
    pub plain: String,
    pub html: String,
    /// Optional hand-written text override
    pub text: Option<String>,
}

/// Renders one template given a language and validated metadata
#[async_trait]
pub trait TemplateHandler: Send + Sync {
    async fn render(&self, lang: &str, meta: Value) -> Result<GeneratedMail>;
}

#[async_trait]
impl<F, Fut> TemplateHandler for F
where
    F: Fn(String, Value) -> Fut + Send + Sync,
    Fut: Future<Output = Result<GeneratedMail>> + Send,
{
    async fn render(&self, lang: &str, meta: Value) -> Result<GeneratedMail> {
        (self)(lang.to_string(), meta).await
    }
}

/// A template that carries both its descriptor and its renderer
#[async_trait]
pub trait EmailTemplate: Send + Sync {
    /// Descriptor published to the registry
    fn descriptor(&self) -> Result<MailTemplate>;

    async fn render(&self, lang: &str, meta: Value) -> Result<GeneratedMail>;
}

static PLACEHOLDER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{\{\s*([A-Za-z0-9_.]+)\s*\}\}").expect("placeholder regex"));

static TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<[^>]*>").expect("tag regex"));

static BLOCK_END: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)<br\s*/?>|</(p|div|h[1-6]|li|tr|table|section)>").expect("block regex"));

/// A `{{variable}}` substitution layout producing subject, HTML and plain text
#[derive(Debug, Clone)]
pub struct MailLayout {
    subject: String,
    html: String,
    text: Option<String>,
}

impl MailLayout {
    pub fn new(subject: impl Into<String>, html: impl Into<String>) -> Self {
        MailLayout {
            subject: subject.into(),
            html: html.into(),
            text: None,
        }
    }

    /// Attach a hand-written text override
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    /// Render against metadata
    ///
    /// Values are HTML-escaped in the body but inserted verbatim in the
    /// subject and text override. Unknown placeholders render as empty.
    pub fn render(&self, meta: &Value) -> Result<GeneratedMail> {
        if !meta.is_object() {
            return Err(MailError::render("Variables must be an object"));
        }

        let html = substitute(&self.html, meta, true);
        Ok(GeneratedMail {
            subject: substitute(&self.subject, meta, false),
            plain: html_to_plain(&html),
            html,
            text: self.text.as_ref().map(|t| substitute(t, meta, false)),
        })
    }
}

fn lookup<'a>(meta: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.').try_fold(meta, |value, key| value.get(key))
}

fn substitute(template: &str, meta: &Value, escape: bool) -> String {
    PLACEHOLDER
        .replace_all(template, |caps: &regex::Captures<'_>| {
            let raw = match lookup(meta, &caps[1]) {
                Some(Value::String(s)) => s.clone(),
                Some(Value::Null) | None => String::new(),
                Some(other) => other.to_string(),
            };
            if escape { escape_html(&raw) } else { raw }
        })
        .into_owned()
}

/// Escape text for inclusion in HTML content or attribute values
fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Strip markup from rendered HTML, keeping block boundaries as line breaks
fn html_to_plain(html: &str) -> String {
    let with_breaks = BLOCK_END.replace_all(html, "\n");
    let stripped = TAG.replace_all(&with_breaks, "");
    let decoded = stripped
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&nbsp;", " ")
        .replace("&amp;", "&");

    decoded
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}
