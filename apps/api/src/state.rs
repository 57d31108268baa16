use std::sync::Arc;

use crate::llm_client::CompletionBackend;
use crate::store::SessionStore;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    /// Pluggable completion backend. Production wires the HTTP client; tests
    /// stub it to script model output.
    pub completions: Arc<dyn CompletionBackend>,
    pub store: Arc<SessionStore>,
}
