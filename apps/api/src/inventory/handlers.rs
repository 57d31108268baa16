//! Axum route handlers for inventory upload and retrieval.

use axum::{
    extract::State,
    http::{header, HeaderMap},
    Json,
};
use serde::Serialize;
use serde_json::Value;
use tracing::info;

use crate::errors::AppError;
use crate::inventory::loader::{products_from_csv, products_from_records};
use crate::inventory::{compute_metrics, InventoryMetrics, Product};
use crate::state::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    pub hash: String,
    pub products: Vec<Product>,
    pub metrics: InventoryMetrics,
    /// True when this inventory content was seen before and its cached
    /// strategies/metrics were reused.
    pub previously_seen: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryView {
    pub hash: String,
    pub products: Vec<Product>,
    pub metrics: InventoryMetrics,
}

/// POST /api/v1/inventory
///
/// Builds the base snapshot from the request body: a JSON array of loose
/// records when the content type says JSON, raw CSV text otherwise.
pub async fn handle_upload(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: String,
) -> Result<Json<UploadResponse>, AppError> {
    let products = if is_json(&headers) {
        let records: Vec<Value> = serde_json::from_str(&body)
            .map_err(|e| AppError::Validation(format!("Body is not a JSON array: {e}")))?;
        products_from_records(&records)
    } else {
        products_from_csv(body.as_bytes())
            .map_err(|e| AppError::Validation(format!("Unreadable CSV: {e}")))?
    };

    if products.is_empty() {
        return Err(AppError::Validation(
            "Inventory contained no product rows".to_string(),
        ));
    }

    let (hash, metrics, previously_seen) = state.store.set_snapshot(products.clone());
    info!(
        "Loaded inventory snapshot {}: {} products (previously_seen={})",
        &hash[..12],
        products.len(),
        previously_seen
    );

    Ok(Json(UploadResponse {
        hash,
        products,
        metrics,
        previously_seen,
    }))
}

/// GET /api/v1/inventory
pub async fn handle_get(State(state): State<AppState>) -> Result<Json<InventoryView>, AppError> {
    let snapshot = state
        .store
        .snapshot()
        .ok_or_else(|| AppError::NotFound("No inventory loaded".to_string()))?;
    let metrics = state
        .store
        .metrics(&snapshot.hash)
        .unwrap_or_else(|| compute_metrics(&snapshot.products));

    Ok(Json(InventoryView {
        hash: snapshot.hash,
        products: snapshot.products,
        metrics,
    }))
}

fn is_json(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.contains("json"))
        .unwrap_or(false)
}
