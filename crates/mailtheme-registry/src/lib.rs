//! # Mailtheme Registry
//!
//! The registry is the single authority that maps theme ids to a theme's
//! dispatch handler and its templates. Callers reach it over the event bus:
//!
//! - `GetThemes` / `GetTemplates` read the catalogue
//! - `GenerateEmail` validates metadata against the template schema and
//!   dispatches to the owning theme
//! - `registerTheme` / `registerTemplate` are issued by [`ThemeClient`]s
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use mailtheme::{EventBus, MailLayout, MailTemplate, schema};
//! use mailtheme_registry::{Registry, RegistryClient, RegistryService, ThemeClient};
//! use serde_json::{Value, json};
//!
//! # async fn example() -> mailtheme::Result<()> {
//! let bus = EventBus::new();
//! RegistryService::bind(Arc::new(Registry::new()), &bus)?;
//!
//! let theme = ThemeClient::new(bus.clone(), "t1");
//! let template = MailTemplate::builder("welcome")
//!     .name("Welcome")
//!     .lang("en")
//!     .meta_schema(schema! { name: String })
//!     .example_data(json!({ "name": "Alex" }))
//!     .build()?;
//! theme
//!     .register_template(template, |_lang: String, meta: Value| async move {
//!         MailLayout::new("Hi {{name}}", "<p>Welcome, {{name}}</p>").render(&meta)
//!     })
//!     .await?;
//!
//! let mail = RegistryClient::new(bus)
//!     .generate_email("t1", "welcome", "en", Some(json!({ "name": "Alex" })))
//!     .await?;
//! println!("{}", mail.subject);
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod events;
pub mod registry;
pub mod service;
pub mod theme;

pub use client::RegistryClient;
pub use registry::{Dispatcher, Registry};
pub use service::{BusDispatcher, RegistryService};
pub use theme::{TemplateModule, ThemeClient};
