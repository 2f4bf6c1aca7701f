//! Mailtheme lets theme providers publish mail templates whose metadata is
//! described by a schema, and lets callers request rendered mail over an
//! in-process event bus.

pub mod bus;
pub mod error;
#[macro_use]
mod macros;
pub mod render;
pub mod schema;
pub mod template;

// Re-export core types
pub use bus::{BroadcastHandler, EventBus, ReturnableHandler};
pub use error::{BusError, MailError, Result, TemplateError, ValidationIssue};
pub use render::{EmailTemplate, GeneratedMail, MailLayout, TemplateHandler};
pub use schema::{FieldType, MetaValidator, Schema, SchemaBuilder, SchemaField, SchemaValidator};
pub use template::{MailTemplate, MailTemplateBuilder, TemplateId};

/// Get the library version
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
