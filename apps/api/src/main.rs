mod chat;
mod config;
mod errors;
mod forecast;
mod inventory;
mod llm_client;
mod routes;
mod state;
mod store;
mod strategies;

use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::llm_client::LlmClient;
use crate::routes::build_router;
use crate::state::AppState;
use crate::store::SessionStore;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_CRATE_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting SupplySense API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize LLM client
    let completions = Arc::new(LlmClient::new(
        config.perplexity_api_url.clone(),
        config.perplexity_api_key.clone(),
        config.model.clone(),
    ));
    info!("LLM client initialized (model: {})", config.model);

    // Session store: snapshot, per-hash result caches, chat history
    let store = Arc::new(SessionStore::new());

    let state = AppState { completions, store };

    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()); // TODO: tighten CORS in production

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
