//! Inventory domain model — canonical products and derived cost figures.
//!
//! A loaded inventory is the *base snapshot*: read-only ground truth that
//! strategy application diffs against. Only an inventory upload replaces it.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

pub mod handlers;
pub mod loader;

/// A single inventory line item in canonical shape.
///
/// `total_landed` is derived: it must always equal `landed_cost()` of the
/// four cost inputs at the moment of computation. Callers never assign it
/// directly; use [`Product::recompute_total_landed`] after any cost write.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub supplier: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stock_level: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub abc_class: Option<String>,
    pub unit_cost: f64,
    pub shipping: f64,
    /// Storage cost per month, in currency units.
    pub storage: f64,
    /// Annual carrying cost as a percentage of `unit_cost`.
    pub carrying_cost: f64,
    pub days_in_inventory: f64,
    /// Informational only — never recomputed by the engine.
    pub margin: f64,
    /// Informational only — never recomputed by the engine.
    pub turnover: f64,
    pub total_landed: f64,
}

impl Product {
    pub fn recompute_total_landed(&mut self) {
        self.total_landed = landed_cost(
            self.unit_cost,
            self.shipping,
            self.storage,
            self.carrying_cost,
        );
    }
}

/// Total landed cost: unit + shipping + storage + carrying-cost share.
pub fn landed_cost(unit_cost: f64, shipping: f64, storage: f64, carrying_cost: f64) -> f64 {
    unit_cost + shipping + storage + unit_cost * carrying_cost / 100.0
}

/// Aggregate figures for the dashboard cards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryMetrics {
    pub product_count: usize,
    pub total_landed_cost: f64,
    pub average_margin: f64,
}

pub fn compute_metrics(products: &[Product]) -> InventoryMetrics {
    let total_landed_cost = products.iter().map(|p| p.total_landed).sum();
    let average_margin = if products.is_empty() {
        0.0
    } else {
        products.iter().map(|p| p.margin).sum::<f64>() / products.len() as f64
    };
    InventoryMetrics {
        product_count: products.len(),
        total_landed_cost,
        average_margin,
    }
}

/// Content hash of a snapshot, used as the cache key for fetched strategies,
/// forecasts, and metrics. Same products in the same order ⇒ same key.
pub fn snapshot_hash(products: &[Product]) -> String {
    let mut hasher = Sha256::new();
    for p in products {
        // Struct field order is stable, so the serialized form is too.
        let encoded = serde_json::to_string(p).unwrap_or_default();
        hasher.update(encoded.as_bytes());
        hasher.update(b"\n");
    }
    let digest = hasher.finalize();
    let mut out = String::with_capacity(64);
    for byte in digest {
        out.push_str(&format!("{byte:02x}"));
    }
    out
}

#[cfg(test)]
pub(crate) fn sample_product(id: &str) -> Product {
    let mut p = Product {
        id: id.to_string(),
        name: format!("Product {id}"),
        category: None,
        supplier: None,
        stock_level: None,
        abc_class: None,
        unit_cost: 45.0,
        shipping: 3.5,
        storage: 0.8,
        carrying_cost: 15.0,
        days_in_inventory: 87.0,
        margin: 48.0,
        turnover: 4.2,
        total_landed: 0.0,
    };
    p.recompute_total_landed();
    p
}
