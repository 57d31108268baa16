//! Cost-optimization strategies — typed model output, recovery parsing,
//! application onto a snapshot, and savings aggregation.

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub mod engine;
pub mod handlers;
pub mod parser;
pub mod prompts;
pub mod savings;

/// Declared impact of a strategy. Wire values match the model's vocabulary
/// (`"Very High"` is two words).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Impact {
    Low,
    #[default]
    Medium,
    High,
    #[serde(rename = "Very High")]
    VeryHigh,
}

/// The product fields a change instruction may target. Anything else in a
/// model response is malformed and the instruction is ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChangeField {
    #[serde(rename = "unitCost")]
    UnitCost,
    #[serde(rename = "shipping")]
    Shipping,
    #[serde(rename = "storage")]
    Storage,
    #[serde(rename = "carryingCost")]
    CarryingCost,
    #[serde(rename = "daysInInventory")]
    DaysInInventory,
}

impl ChangeField {
    pub fn wire_name(&self) -> &'static str {
        match self {
            ChangeField::UnitCost => "unitCost",
            ChangeField::Shipping => "shipping",
            ChangeField::Storage => "storage",
            ChangeField::CarryingCost => "carryingCost",
            ChangeField::DaysInInventory => "daysInInventory",
        }
    }

    pub fn from_wire(name: &str) -> Option<Self> {
        match name {
            "unitCost" => Some(ChangeField::UnitCost),
            "shipping" => Some(ChangeField::Shipping),
            "storage" => Some(ChangeField::Storage),
            "carryingCost" => Some(ChangeField::CarryingCost),
            "daysInInventory" => Some(ChangeField::DaysInInventory),
            _ => None,
        }
    }
}

/// A single field-level edit targeting one product.
///
/// `new_value` stays a raw JSON value until application: the engine coerces
/// it to the field's native type and leaves the field untouched when the
/// coercion fails.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeInstruction {
    pub product_id: String,
    pub field: ChangeField,
    pub new_value: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,
}

/// An AI-suggested optimization bundle. Validated once at parse time and
/// never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OptimizationStrategy {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub estimated_savings: f64,
    #[serde(default)]
    pub impact: Impact,
    #[serde(default)]
    pub detailed_changes: Vec<ChangeInstruction>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub web_findings: Option<String>,
}
