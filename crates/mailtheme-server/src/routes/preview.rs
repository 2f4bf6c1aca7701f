//! Browser preview of registered themes
//!
//! Pages are askama templates under `templates/`. Generation failures are
//! shown in the result panes instead of failing the request.

use std::collections::HashMap;

use crate::{AppState, error::Result};
use askama::Template;
use axum::{
    Form, Router,
    extract::{Path, State},
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
    routing::get,
};
use mailtheme::{FieldType, GeneratedMail, MailError, MailTemplate};
use serde_json::Value;
use tracing::{debug, warn};

#[derive(Template)]
#[template(path = "index.html")]
struct IndexTemplate {
    themes: Vec<String>,
}

#[derive(Template)]
#[template(path = "theme.html")]
struct ThemeTemplate {
    theme_id: String,
    templates: Vec<MailTemplate>,
}

#[derive(Template)]
#[template(path = "template.html")]
struct TemplatePage {
    theme_id: String,
    template_id: String,
    name: String,
    description: String,
    fields: Vec<FormField>,
    result: Option<PreviewResult>,
}

struct FormField {
    key: String,
    label: String,
    kind: &'static str,
    required: bool,
    value: String,
}

struct PreviewResult {
    subject: String,
    html: String,
    plain_lines: Vec<String>,
    text: String,
    input: String,
}

/// Create preview routes
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_themes))
        .route("/favicon.ico", get(no_favicon))
        .route("/{theme_id}", get(list_templates))
        .route("/{theme_id}/favicon.ico", get(no_favicon))
        .route("/{theme_id}/{template_id}", get(show_form).post(generate))
        .route("/{theme_id}/{template_id}/favicon.ico", get(no_favicon))
}

fn page<T: Template>(template: T) -> Result<Html<String>> {
    Ok(Html(template.render()?))
}

async fn no_favicon() -> StatusCode {
    StatusCode::NOT_FOUND
}

// None when the theme is unknown
async fn theme_templates(state: &AppState, theme_id: &str) -> Result<Option<Vec<MailTemplate>>> {
    let themes = state.client.get_themes().await?;
    if !themes.iter().any(|t| t == theme_id) {
        return Ok(None);
    }
    Ok(Some(state.client.get_templates(theme_id).await?))
}

enum Lookup {
    Found(MailTemplate),
    Redirect(Redirect),
}

async fn lookup(state: &AppState, theme_id: &str, template_id: &str) -> Result<Lookup> {
    let Some(templates) = theme_templates(state, theme_id).await? else {
        return Ok(Lookup::Redirect(Redirect::to("/")));
    };
    match templates.into_iter().find(|t| t.id.0 == template_id) {
        Some(template) => Ok(Lookup::Found(template)),
        None => Ok(Lookup::Redirect(Redirect::to(&format!("/{}", theme_id)))),
    }
}

async fn list_themes(State(state): State<AppState>) -> Result<Html<String>> {
    let themes = state.client.get_themes().await?;
    page(IndexTemplate { themes })
}

async fn list_templates(
    State(state): State<AppState>,
    Path(theme_id): Path<String>,
) -> Result<Response> {
    let Some(templates) = theme_templates(&state, &theme_id).await? else {
        debug!("Unknown theme {}, redirecting", theme_id);
        return Ok(Redirect::to("/").into_response());
    };

    Ok(page(ThemeTemplate {
        theme_id,
        templates,
    })?
    .into_response())
}

async fn show_form(
    State(state): State<AppState>,
    Path((theme_id, template_id)): Path<(String, String)>,
) -> Result<Response> {
    let template = match lookup(&state, &theme_id, &template_id).await? {
        Lookup::Found(template) => template,
        Lookup::Redirect(redirect) => return Ok(redirect.into_response()),
    };

    let fields = form_fields(&template, &template.example_data);
    Ok(page(TemplatePage {
        theme_id,
        template_id,
        name: template.name,
        description: template.description,
        fields,
        result: None,
    })?
    .into_response())
}

async fn generate(
    State(state): State<AppState>,
    Path((theme_id, template_id)): Path<(String, String)>,
    Form(form): Form<HashMap<String, String>>,
) -> Result<Response> {
    let template = match lookup(&state, &theme_id, &template_id).await? {
        Lookup::Found(template) => template,
        Lookup::Redirect(redirect) => return Ok(redirect.into_response()),
    };

    let meta = template.meta_schema.coerce_form(&form);
    let mail = match state
        .client
        .generate_email(
            &theme_id,
            &template_id,
            &state.config.preview_lang,
            Some(meta.clone()),
        )
        .await
    {
        Ok(mail) => mail,
        Err(e) => {
            warn!("Preview generation of {}/{} failed: {}", theme_id, template_id, e);
            error_mail(&e)
        }
    };

    let fields = form_fields(&template, &meta);
    Ok(page(TemplatePage {
        theme_id,
        template_id,
        name: template.name,
        description: template.description,
        fields,
        result: Some(preview_result(mail, &meta)),
    })?
    .into_response())
}

fn error_mail(error: &MailError) -> GeneratedMail {
    GeneratedMail {
        subject: "ERROR".to_string(),
        plain: error.to_string(),
        html: "ERROR".to_string(),
        text: Some("ERROR".to_string()),
    }
}

fn form_fields(template: &MailTemplate, values: &Value) -> Vec<FormField> {
    template
        .meta_schema
        .fields
        .iter()
        .map(|field| FormField {
            key: field.key.clone(),
            label: field.label.clone().unwrap_or_else(|| field.key.clone()),
            kind: match field.field_type {
                FieldType::Number => "number",
                FieldType::Date => "date",
                _ => "text",
            },
            required: field.required,
            value: match values.get(&field.key) {
                Some(Value::String(s)) => s.clone(),
                Some(Value::Null) | None => String::new(),
                Some(other) => other.to_string(),
            },
        })
        .collect()
}

fn preview_result(mail: GeneratedMail, input: &Value) -> PreviewResult {
    PreviewResult {
        subject: mail.subject,
        plain_lines: mail.plain.lines().map(str::to_string).collect(),
        html: mail.html,
        text: mail.text.unwrap_or_default(),
        input: serde_json::to_string_pretty(input).unwrap_or_else(|_| input.to_string()),
    }
}
