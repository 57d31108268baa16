//! Strategy application engine — applies selected strategies onto a working
//! copy of the base snapshot and diffs the result.
//!
//! Conflict policy is last write wins, applied in strategy-selection order
//! then instruction-array order. The engine never merges or averages
//! conflicting instructions; this is a chosen policy.

use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::inventory::Product;
use crate::strategies::{ChangeField, OptimizationStrategy};

/// Numeric fields differing by no more than this are considered unchanged.
pub const FIELD_TOLERANCE: f64 = 1e-9;

/// Fields compared between the base and working snapshots.
const DIFF_FIELDS: &[&str] = &[
    "unitCost",
    "shipping",
    "storage",
    "carryingCost",
    "daysInInventory",
    "totalLanded",
];

/// One field's before/after record for a product whose optimized value
/// differs from the base snapshot beyond tolerance.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeSummaryEntry {
    pub field: String,
    pub original_value: f64,
    pub new_value: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,
}

/// A product from the working snapshot, annotated for display.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OptimizedProduct {
    #[serde(flatten)]
    pub product: Product,
    pub is_changed: bool,
    pub change_summary: Vec<ChangeSummaryEntry>,
}

/// Applies the selected strategies to a clone of `base` and returns the
/// annotated result, changed products first, then by id ascending.
///
/// Selected ids that no longer resolve to a strategy are silently skipped;
/// pruning stale selection state is the caller's concern.
pub fn apply_strategies(
    base: &[Product],
    strategies: &[OptimizationStrategy],
    selected_ids: &[String],
) -> Vec<OptimizedProduct> {
    let selected: Vec<&OptimizationStrategy> = selected_ids
        .iter()
        .filter_map(|id| {
            let found = strategies.iter().find(|s| &s.id == id);
            if found.is_none() {
                debug!("Selected strategy '{id}' not in current batch; skipping");
            }
            found
        })
        .collect();

    // Working copy: the base stays untouched for diffing.
    let mut working: Vec<Product> = base.to_vec();

    for strategy in &selected {
        for instruction in &strategy.detailed_changes {
            let Some(product) = working.iter_mut().find(|p| p.id == instruction.product_id)
            else {
                continue; // unknown product id is a no-op, not an error
            };
            let Some(value) = coerce_numeric(&instruction.new_value) else {
                continue; // unparsable value: retain current field, never NaN
            };
            match instruction.field {
                ChangeField::UnitCost => product.unit_cost = value,
                ChangeField::Shipping => product.shipping = value,
                ChangeField::Storage => product.storage = value,
                ChangeField::CarryingCost => product.carrying_cost = value,
                ChangeField::DaysInInventory => product.days_in_inventory = value,
            }
            if instruction.field != ChangeField::DaysInInventory {
                product.recompute_total_landed();
            }
        }
    }

    let mut optimized: Vec<OptimizedProduct> = working
        .into_iter()
        .zip(base.iter())
        .map(|(after, before)| summarize(before, after, &selected))
        .collect();

    optimized.sort_by(|a, b| {
        b.is_changed
            .cmp(&a.is_changed)
            .then_with(|| a.product.id.cmp(&b.product.id))
    });
    optimized
}

fn summarize(
    before: &Product,
    after: Product,
    selected: &[&OptimizationStrategy],
) -> OptimizedProduct {
    let mut change_summary = Vec::new();
    for &field in DIFF_FIELDS {
        let original_value = field_value(before, field);
        let new_value = field_value(&after, field);
        if (original_value - new_value).abs() > FIELD_TOLERANCE {
            change_summary.push(ChangeSummaryEntry {
                field: field.to_string(),
                original_value,
                new_value,
                reasoning: find_reasoning(selected, &after.id, field),
            });
        }
    }
    let is_changed = !change_summary.is_empty();
    OptimizedProduct {
        product: after,
        is_changed,
        change_summary,
    }
}

fn field_value(product: &Product, field: &str) -> f64 {
    match field {
        "unitCost" => product.unit_cost,
        "shipping" => product.shipping,
        "storage" => product.storage,
        "carryingCost" => product.carrying_cost,
        "daysInInventory" => product.days_in_inventory,
        "totalLanded" => product.total_landed,
        _ => 0.0,
    }
}

/// Reasoning from the first selected strategy (selection order) whose
/// instructions reference this product+field. Derived fields such as
/// `totalLanded` are never referenced directly, so they carry no reasoning.
fn find_reasoning(
    selected: &[&OptimizationStrategy],
    product_id: &str,
    field: &str,
) -> Option<String> {
    for strategy in selected {
        for instruction in &strategy.detailed_changes {
            if instruction.product_id == product_id && instruction.field.wire_name() == field {
                if let Some(reasoning) = &instruction.reasoning {
                    return Some(reasoning.clone());
                }
            }
        }
    }
    None
}

/// Numeric coercion for instruction values: numbers pass through, numeric
/// strings parse, everything else (including NaN) is rejected.
fn coerce_numeric(value: &Value) -> Option<f64> {
    let parsed = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    if parsed.is_nan() {
        return None;
    }
    Some(parsed)
}
