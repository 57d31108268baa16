//! Axum route handlers for the Strategies API.

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::errors::AppError;
use crate::llm_client::{ChatMessage, LlmError};
use crate::state::AppState;
use crate::store::Snapshot;
use crate::strategies::engine::{apply_strategies, OptimizedProduct};
use crate::strategies::parser::parse_strategies;
use crate::strategies::prompts::{STRATEGY_PROMPT_TEMPLATE, STRATEGY_SYSTEM};
use crate::strategies::savings::total_selected_savings;
use crate::strategies::OptimizationStrategy;

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StrategiesResponse {
    pub strategies: Vec<OptimizationStrategy>,
    /// Served from the per-snapshot cache without a model call.
    pub cached: bool,
    /// The endpoint call succeeded but no strategy list could be recovered.
    /// Rendered as "no strategies available", not as an error banner.
    pub parse_failed: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectRequest {
    pub selected_ids: Vec<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectResponse {
    pub selected_ids: Vec<String>,
    pub total_selected_savings: f64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OptimizedResponse {
    pub products: Vec<OptimizedProduct>,
    pub selected_ids: Vec<String>,
    pub total_selected_savings: f64,
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/v1/strategies/generate
///
/// Fetches optimization strategies from the model for the current snapshot.
/// An unchanged inventory hash is served from the cache without a new call.
pub async fn handle_generate(
    State(state): State<AppState>,
) -> Result<Json<StrategiesResponse>, AppError> {
    let snapshot = require_snapshot(&state)?;

    if let Some(strategies) = state.store.cached_strategies(&snapshot.hash) {
        info!(
            "Serving {} cached strategies for snapshot {}",
            strategies.len(),
            &snapshot.hash[..12]
        );
        return Ok(Json(StrategiesResponse {
            strategies,
            cached: true,
            parse_failed: false,
        }));
    }

    let inventory_json = serde_json::to_string_pretty(&snapshot.products)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to serialize inventory: {e}")))?;
    let prompt = STRATEGY_PROMPT_TEMPLATE.replace("{inventory_json}", &inventory_json);
    let messages = [
        ChatMessage::system(STRATEGY_SYSTEM),
        ChatMessage::user(prompt),
    ];

    let completion = match state.completions.complete(&messages).await {
        Ok(completion) => completion,
        // Empty content is payload-level: same outcome as an unparsable body.
        Err(LlmError::EmptyContent) => {
            warn!("Strategy completion carried no content");
            return Ok(Json(StrategiesResponse {
                strategies: Vec::new(),
                cached: false,
                parse_failed: true,
            }));
        }
        Err(e) => return Err(AppError::from_fetch_failure(e)),
    };

    match parse_strategies(&completion.content) {
        Ok(strategies) => {
            info!(
                "Parsed {} strategies for snapshot {}",
                strategies.len(),
                &snapshot.hash[..12]
            );
            state.store.put_strategies(&snapshot.hash, strategies.clone());
            Ok(Json(StrategiesResponse {
                strategies,
                cached: false,
                parse_failed: false,
            }))
        }
        Err(failure) => {
            // Indistinguishable from "the model legitimately found nothing".
            warn!("Strategy response unusable: {failure}");
            Ok(Json(StrategiesResponse {
                strategies: Vec::new(),
                cached: false,
                parse_failed: true,
            }))
        }
    }
}

/// POST /api/v1/strategies/select
///
/// Stores the selected strategy ids for the current snapshot. Selection is
/// not pruned against the strategy list here; stale ids are ignored at
/// application time.
pub async fn handle_select(
    State(state): State<AppState>,
    Json(request): Json<SelectRequest>,
) -> Result<Json<SelectResponse>, AppError> {
    let snapshot = require_snapshot(&state)?;

    state
        .store
        .set_selected_ids(&snapshot.hash, request.selected_ids.clone());

    let strategies = state
        .store
        .cached_strategies(&snapshot.hash)
        .unwrap_or_default();
    let total = total_selected_savings(&strategies, &request.selected_ids);

    Ok(Json(SelectResponse {
        selected_ids: request.selected_ids,
        total_selected_savings: total,
    }))
}

/// GET /api/v1/strategies/optimized
///
/// Applies the current selection onto a working copy of the base snapshot and
/// returns the optimized products (changed first), per-field change
/// summaries, and the aggregate selected-savings figure.
pub async fn handle_optimized(
    State(state): State<AppState>,
) -> Result<Json<OptimizedResponse>, AppError> {
    let snapshot = require_snapshot(&state)?;

    let strategies = state
        .store
        .cached_strategies(&snapshot.hash)
        .unwrap_or_default();
    let selected_ids = state.store.selected_ids(&snapshot.hash);

    let products = apply_strategies(&snapshot.products, &strategies, &selected_ids);
    let total = total_selected_savings(&strategies, &selected_ids);

    Ok(Json(OptimizedResponse {
        products,
        selected_ids,
        total_selected_savings: total,
    }))
}

fn require_snapshot(state: &AppState) -> Result<Snapshot, AppError> {
    state.store.snapshot().ok_or_else(|| {
        AppError::Validation("No inventory loaded. Upload inventory first.".to_string())
    })
}
