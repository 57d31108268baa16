pub mod health;

use axum::{
    extract::State,
    routing::{delete, get, post},
    Json, Router,
};
use serde_json::{json, Value};

use crate::chat;
use crate::forecast;
use crate::inventory::handlers as inventory_handlers;
use crate::state::AppState;
use crate::strategies::handlers as strategy_handlers;

/// DELETE /api/v1/session
/// Resets the session store: snapshot, caches, and chat history.
async fn handle_reset_session(State(state): State<AppState>) -> Json<Value> {
    state.store.reset();
    Json(json!({ "status": "reset" }))
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        .route(
            "/api/v1/inventory",
            post(inventory_handlers::handle_upload).get(inventory_handlers::handle_get),
        )
        .route(
            "/api/v1/strategies/generate",
            post(strategy_handlers::handle_generate),
        )
        .route(
            "/api/v1/strategies/select",
            post(strategy_handlers::handle_select),
        )
        .route(
            "/api/v1/strategies/optimized",
            get(strategy_handlers::handle_optimized),
        )
        .route("/api/v1/forecast", post(forecast::handle_generate))
        .route("/api/v1/chat", post(chat::handle_chat))
        .route("/api/v1/session", delete(handle_reset_session))
        .with_state(state)
}
