//! Example theme bundled with the preview server

use std::sync::Arc;

use async_trait::async_trait;
use mailtheme::{
    EmailTemplate, EventBus, FieldType, GeneratedMail, MailLayout, MailTemplate, Result, Schema,
    SchemaField,
};
use mailtheme_registry::{TemplateModule, ThemeClient};
use serde_json::{Value, json};
use tracing::info;

pub const THEME_ID: &str = "examples";

/// Register every example template with the registry behind `bus`
pub async fn register(bus: &EventBus) -> Result<ThemeClient> {
    let theme = ThemeClient::new(bus.clone(), THEME_ID);
    let registered = theme.register_email_templates(modules()).await?;
    info!("Registered {} example templates in theme {}", registered, theme.theme_id());
    Ok(theme)
}

fn modules() -> Vec<TemplateModule> {
    vec![
        TemplateModule::new("email-verification", Arc::new(EmailVerification)),
        TemplateModule::new("review-received", Arc::new(ReviewReceived)),
    ]
}

const STYLE: &str = "font-family: -apple-system, 'Segoe UI', 'Helvetica Neue', sans-serif; color: #333;";

/// One-time code mail
pub struct EmailVerification;

const VERIFICATION_LOGO: &str = r#"<img src="{{companyLogo}}" width="75" height="45" alt="{{companyName}} Logo" />"#;
const VERIFICATION_NAME: &str = r#"<h1 style="height: 45px;">{{companyName}}</h1>"#;

const VERIFICATION_BODY: &str = r#"</div>
<div style="padding: 25px 35px;">
<h1 style="font-size: 20px; font-weight: bold;">Verify your email address</h1>
<p>Thanks for starting the account creation process. We want to make sure it's really you. Please enter the following verification code when prompted. If you don't want to create an account, you can ignore this message.</p>
<p style="font-weight: bold; text-align: center;">Verification code</p>
<p style="font-size: 36px; font-weight: bold; text-align: center;">{{otp}}</p>
<p style="text-align: center;">(This code is valid for 10 minutes)</p>
</div>
<hr />
<p style="padding: 25px 35px;">{{companyName}} will never email you and ask you to disclose or verify your password, credit card, or banking account number.</p>
</div>"#;

impl EmailVerification {
    fn layout(meta: &Value) -> MailLayout {
        let has_logo = meta
            .get("companyLogo")
            .and_then(Value::as_str)
            .is_some_and(|logo| !logo.is_empty());
        let header = if has_logo {
            VERIFICATION_LOGO
        } else {
            VERIFICATION_NAME
        };

        let html = [
            r#"<div style=""#,
            STYLE,
            r#" background-color: #eee; padding: 20px;"><div style="background-color: {{headerColour}}; padding: 20px 0; text-align: center;">"#,
            header,
            VERIFICATION_BODY,
        ]
        .concat();

        MailLayout::new("Verification Email", html)
            .with_text("[{{companyName}}] Verification code: {{otp}}")
    }
}

#[async_trait]
impl EmailTemplate for EmailVerification {
    fn descriptor(&self) -> Result<MailTemplate> {
        let schema = Schema::builder()
            .with(
                SchemaField::new("otp", FieldType::String)
                    .with_label("Verification code")
                    .with_pattern("^[0-9A-Za-z-]+$")
                    .with_length(Some(5), Some(10)),
            )
            .field("headerColour", FieldType::String)
            .optional("companyLogo", FieldType::String)
            .field("companyName", FieldType::String)
            .build();

        MailTemplate::builder("email-verification")
            .name("Verification Email")
            .description("This is a verification email")
            .lang("en")
            .meta_schema(schema)
            .example_data(json!({
                "otp": "12345",
                "headerColour": "#000000",
                "companyLogo": "https://www.google.com/images/branding/googlelogo/1x/googlelogo_light_color_272x92dp.png",
                "companyName": "Company Name"
            }))
            .build()
    }

    async fn render(&self, _lang: &str, meta: Value) -> Result<GeneratedMail> {
        Self::layout(&meta).render(&meta)
    }
}

/// Notification that a guest review was published
pub struct ReviewReceived;

const REVIEW_BODY: &str = r#"
<img src="{{authorImage}}" width="96" height="96" alt="{{authorName}}" style="border-radius: 50%;" />
<h2>Here's what {{authorName}} wrote</h2>
<blockquote style="padding: 24px; background-color: #f2f3f3; border-radius: 4px;">{{reviewText}}</blockquote>
<p>Now that the review period is over, we've posted {{authorName}}'s review to your profile.</p>
<p>While it's too late to write a review of your own, you can send your feedback to {{authorName}} using your message thread.</p>
<hr />
<p style="font-size: 12px; color: #9ca299;">Common questions: how do reviews work, how do star ratings work, can I leave a review after 14 days?</p>
</div>"#;

#[async_trait]
impl EmailTemplate for ReviewReceived {
    fn descriptor(&self) -> Result<MailTemplate> {
        let schema = Schema::builder()
            .optional("authorName", FieldType::String)
            .optional("authorImage", FieldType::String)
            .optional("reviewText", FieldType::String)
            .build();

        MailTemplate::builder("review-received")
            .name("Review Received")
            .description("This is a review email")
            .lang("en")
            .meta_schema(schema)
            .example_data(json!({
                "authorName": "Alex",
                "authorImage": "https://www.gravatar.com/avatar/aa",
                "reviewText": "Alan was a great guest! Easy communication, the apartment was left in great condition, very polite, and respectful of all house rules."
            }))
            .build()
    }

    async fn render(&self, _lang: &str, meta: Value) -> Result<GeneratedMail> {
        let html = [
            r#"<div style=""#,
            STYLE,
            r#" max-width: 580px; margin: 0 auto; padding: 20px;">"#,
            REVIEW_BODY,
        ]
        .concat();

        MailLayout::new("Review Received", html)
            .with_text("Review: {{reviewText}} - {{authorName}}")
            .render(&meta)
    }
}
