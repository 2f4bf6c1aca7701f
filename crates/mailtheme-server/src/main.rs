//! Mailtheme HTTP Server
//!
//! Hosts a registry on an in-process event bus, registers the bundled example
//! theme, and exposes a JSON API plus browser preview pages for it.

use axum::{Router, extract::State, response::Json, routing::get};
use mailtheme::EventBus;
use mailtheme_registry::{Registry, RegistryClient, RegistryService};
use serde_json::{Value, json};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;

mod config;
mod error;
mod models;
mod routes;
mod themes;

use config::ServerConfig;
use error::Result;

/// Main application state
#[derive(Clone)]
pub struct AppState {
    pub client: RegistryClient,
    pub config: ServerConfig,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables
    dotenv::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(std::env::var("RUST_LOG").unwrap_or_else(|_| {
            "mailtheme_server=debug,mailtheme_registry=debug,tower_http=debug".to_string()
        }))
        .init();

    // Load configuration
    let config = ServerConfig::from_env()?;
    info!(
        "Starting Mailtheme Server on {}:{} in {:?} mode",
        config.host, config.port, config.run_mode
    );

    // Registry first, so themes have someone to register with
    let bus = EventBus::new();
    let registry = Arc::new(Registry::new());
    RegistryService::bind(Arc::clone(&registry), &bus)?;

    let _examples = themes::register(&bus).await?;
    info!("Registry holds {} themes", registry.theme_count().await);

    let state = AppState {
        client: RegistryClient::new(bus),
        config: config.clone(),
    };

    // Build router
    let app = create_router(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(config.bind_address()).await?;
    info!("🚀 Server listening on http://{}", listener.local_addr()?);

    axum::serve(listener, app).await?;

    Ok(())
}

/// Create the main application router
fn create_router(state: AppState) -> Router {
    let mut router = Router::new()
        // Health check
        .route("/health", get(health_check))
        // API routes
        .nest("/api", routes::api::router());

    if state.config.is_development() {
        router = router.merge(routes::preview::router());
    }

    router
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}

/// Health check endpoint
async fn health_check(State(state): State<AppState>) -> Result<Json<Value>> {
    let themes = state.client.get_themes().await?;
    Ok(Json(json!({
        "status": "healthy",
        "service": "mailtheme-server",
        "version": env!("CARGO_PKG_VERSION"),
        "mailtheme": mailtheme::version(),
        "themes": themes.len(),
        "timestamp": time::OffsetDateTime::now_utc()
    })))
}

/// Router over a fresh registry with the example theme registered
#[cfg(test)]
pub(crate) async fn test_app(config: ServerConfig) -> Router {
    let bus = EventBus::new();
    RegistryService::bind(Arc::new(Registry::new()), &bus).unwrap();
    themes::register(&bus).await.unwrap();

    create_router(AppState {
        client: RegistryClient::new(bus),
        config,
    })
}
