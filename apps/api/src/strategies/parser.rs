//! Strategy response parser — recovers a typed strategy list from whatever
//! text the completion endpoint produced.
//!
//! Recovery is an ordered chain of attempts, each isolated so one failure
//! cannot abort a still-viable later attempt:
//!   1. strict parse of the whole text as a JSON array
//!   2. strict parse of a ```json fenced block's inner content
//!   3. strict parse of the first balanced `[...]` substring
//! When all three fail the caller gets a [`ParseFailure`] carrying the
//! original text. That is "no strategies available", not a fatal error.

use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

use crate::strategies::{ChangeField, ChangeInstruction, Impact, OptimizationStrategy};

/// The endpoint call succeeded but the payload could not be coerced into a
/// JSON array after all recovery attempts. Retains the raw text for
/// diagnostics.
#[derive(Debug, Error)]
#[error("could not recover a JSON array from model output ({} bytes)", raw.len())]
pub struct ParseFailure {
    pub raw: String,
}

/// Recovers a JSON array from free-form model output.
pub fn extract_json_array(text: &str) -> Result<Vec<Value>, ParseFailure> {
    if let Some(array) = try_strict(text.trim()) {
        return Ok(array);
    }
    if let Some(array) = try_fenced_block(text) {
        return Ok(array);
    }
    if let Some(array) = try_bracket_scan(text) {
        return Ok(array);
    }
    Err(ParseFailure {
        raw: text.to_string(),
    })
}

/// Full pipeline: recover the array, then validate elements into typed
/// strategies. Partial filtering is logged, never thrown.
pub fn parse_strategies(text: &str) -> Result<Vec<OptimizationStrategy>, ParseFailure> {
    let elements = extract_json_array(text)?;
    Ok(validate_strategies(elements))
}

fn try_strict(text: &str) -> Option<Vec<Value>> {
    match serde_json::from_str::<Value>(text) {
        Ok(Value::Array(items)) => Some(items),
        _ => None,
    }
}

fn try_fenced_block(text: &str) -> Option<Vec<Value>> {
    let start = text.find("```json")?;
    let inner = &text[start + "```json".len()..];
    let end = inner.find("```")?;
    try_strict(inner[..end].trim())
}

/// Scans for the first balanced `[...]` substring, respecting JSON strings
/// and escapes, and strict-parses it.
fn try_bracket_scan(text: &str) -> Option<Vec<Value>> {
    let open = text.find('[')?;
    let bytes = text.as_bytes();
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, &byte) in bytes[open..].iter().enumerate() {
        if escaped {
            escaped = false;
            continue;
        }
        match byte {
            b'\\' if in_string => escaped = true,
            b'"' => in_string = !in_string,
            b'[' if !in_string => depth += 1,
            b']' if !in_string => {
                depth -= 1;
                if depth == 0 {
                    return try_strict(&text[open..=open + offset]);
                }
            }
            _ => {}
        }
    }
    None
}

/// Validates raw array elements into strategies.
///
/// Elements lacking `id`, `title`, or a `detailedChanges` key are dropped;
/// a present-but-non-array `detailedChanges` is coerced to empty. A missing
/// or unrecognized `impact` falls back to Medium. A batch that is partially
/// malformed still surfaces its valid elements.
pub fn validate_strategies(elements: Vec<Value>) -> Vec<OptimizationStrategy> {
    let total = elements.len();
    let mut strategies = Vec::new();

    for element in elements {
        match validate_strategy(&element) {
            Some(strategy) => strategies.push(strategy),
            None => warn!("Dropping malformed strategy element: {element}"),
        }
    }

    if strategies.len() < total {
        warn!(
            "Strategy validation kept {} of {} elements",
            strategies.len(),
            total
        );
    } else {
        debug!("Strategy validation kept all {total} elements");
    }
    strategies
}

fn validate_strategy(element: &Value) -> Option<OptimizationStrategy> {
    let object = element.as_object()?;

    let id = object.get("id")?.as_str()?.to_string();
    let title = object.get("title")?.as_str()?.to_string();
    let raw_changes = object.get("detailedChanges")?;

    let detailed_changes = match raw_changes {
        Value::Array(items) => items
            .iter()
            .filter_map(|item| validate_instruction(item, &id))
            .collect(),
        // Present but not an array: coerce rather than drop the strategy.
        _ => Vec::new(),
    };

    let impact = object
        .get("impact")
        .and_then(|v| serde_json::from_value::<Impact>(v.clone()).ok())
        .unwrap_or_default();

    Some(OptimizationStrategy {
        id,
        title,
        description: object
            .get("description")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        estimated_savings: object
            .get("estimatedSavings")
            .map(numeric_or_zero)
            .unwrap_or(0.0),
        impact,
        detailed_changes,
        web_findings: object
            .get("webFindings")
            .and_then(Value::as_str)
            .map(str::to_string),
    })
}

fn validate_instruction(item: &Value, strategy_id: &str) -> Option<ChangeInstruction> {
    let object = item.as_object().or_else(|| {
        warn!("Strategy '{strategy_id}': non-object change instruction dropped");
        None
    })?;

    let product_id = object.get("productId")?.as_str()?.to_string();
    let field_name = object.get("field").and_then(Value::as_str)?;
    let Some(field) = ChangeField::from_wire(field_name) else {
        warn!("Strategy '{strategy_id}': unknown change field '{field_name}' ignored");
        return None;
    };

    Some(ChangeInstruction {
        product_id,
        field,
        new_value: object.get("newValue").cloned().unwrap_or(Value::Null),
        reasoning: object
            .get("reasoning")
            .and_then(Value::as_str)
            .map(str::to_string),
    })
}

fn numeric_or_zero(value: &Value) -> f64 {
    match value {
        Value::Number(n) => n.as_f64().unwrap_or(0.0),
        Value::String(s) => s.trim().parse().unwrap_or(0.0),
        _ => 0.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const VALID_BATCH: &str = r#"[
        {"id": "a", "title": "t", "impact": "Low", "detailedChanges": []}
    ]"#;

    #[test]
    fn test_strict_parse_of_clean_array() {
        let strategies = parse_strategies(VALID_BATCH).unwrap();
        assert_eq!(strategies.len(), 1);
        assert_eq!(strategies[0].id, "a");
        assert_eq!(strategies[0].impact, Impact::Low);
    }

    #[test]
    fn test_fenced_block_recovery() {
        let text = format!("Here you go:\n```json\n{VALID_BATCH}\n```");
        let strategies = parse_strategies(&text).unwrap();
        assert_eq!(strategies.len(), 1);
        assert_eq!(strategies[0].id, "a");
    }

    #[test]
    fn test_bracket_scan_recovery_from_prose() {
        let text = format!("The strategies are {VALID_BATCH} — let me know if you need more.");
        let strategies = parse_strategies(&text).unwrap();
        assert_eq!(strategies.len(), 1);
    }

    #[test]
    fn test_bracket_scan_respects_brackets_inside_strings() {
        let text = r#"Sure: [{"id": "x", "title": "a ] tricky [ title", "detailedChanges": []}] there."#;
        let strategies = parse_strategies(text).unwrap();
        assert_eq!(strategies.len(), 1);
        assert_eq!(strategies[0].title, "a ] tricky [ title");
    }

    #[test]
    fn test_bracket_scan_takes_first_substring_only() {
        // The first balanced bracket run wins even when it is not valid JSON;
        // later runs are not tried. Documented first-substring behavior.
        let text = r#"Note [sic]: [{"id": "x", "title": "t", "detailedChanges": []}]"#;
        assert!(parse_strategies(text).is_err());
    }

    #[test]
    fn test_parse_failure_is_nonfatal_and_retains_text() {
        let err = parse_strategies("no strategies today").unwrap_err();
        assert_eq!(err.raw, "no strategies today");
    }

    #[test]
    fn test_top_level_object_is_a_failure() {
        // Success requires an array; a bare object does not count.
        assert!(parse_strategies(r#"{"id": "a"}"#).is_err());
    }

    #[test]
    fn test_partially_malformed_batch_keeps_valid_elements() {
        let elements = vec![
            json!({"id": "keep", "title": "ok", "detailedChanges": []}),
            json!({"title": "missing id", "detailedChanges": []}),
            json!({"id": "no-title", "detailedChanges": []}),
            json!({"id": "no-changes-key", "title": "dropped"}),
            json!("not even an object"),
        ];
        let strategies = validate_strategies(elements);
        assert_eq!(strategies.len(), 1);
        assert_eq!(strategies[0].id, "keep");
    }

    #[test]
    fn test_non_array_detailed_changes_coerced_to_empty() {
        let elements = vec![json!({
            "id": "a", "title": "t", "detailedChanges": "oops"
        })];
        let strategies = validate_strategies(elements);
        assert_eq!(strategies.len(), 1);
        assert!(strategies[0].detailed_changes.is_empty());
    }

    #[test]
    fn test_missing_impact_defaults_to_medium() {
        let elements = vec![json!({"id": "a", "title": "t", "detailedChanges": []})];
        assert_eq!(validate_strategies(elements)[0].impact, Impact::Medium);
    }

    #[test]
    fn test_unknown_change_field_is_ignored_not_fatal() {
        let elements = vec![json!({
            "id": "a", "title": "t",
            "detailedChanges": [
                {"productId": "P", "field": "margin", "newValue": 1},
                {"productId": "P", "field": "shipping", "newValue": 2.5}
            ]
        })];
        let strategies = validate_strategies(elements);
        assert_eq!(strategies[0].detailed_changes.len(), 1);
        assert_eq!(strategies[0].detailed_changes[0].field, ChangeField::Shipping);
    }

    #[test]
    fn test_estimated_savings_accepts_numeric_string() {
        let elements = vec![json!({
            "id": "a", "title": "t", "detailedChanges": [],
            "estimatedSavings": "12300"
        })];
        assert_eq!(validate_strategies(elements)[0].estimated_savings, 12300.0);
    }

    #[test]
    fn test_fenced_block_with_trailing_prose_after_fence() {
        let text = format!("```json\n{VALID_BATCH}\n```\nAnything else?");
        assert_eq!(parse_strategies(&text).unwrap().len(), 1);
    }

    #[test]
    fn test_nested_arrays_balance_in_bracket_scan() {
        let text = r#"Result: [{"id": "a", "title": "t", "detailedChanges": [{"productId": "P", "field": "storage", "newValue": [1]}]}] done"#;
        let strategies = parse_strategies(text).unwrap();
        assert_eq!(strategies.len(), 1);
        // Array newValue survives parsing; the engine's coercion rejects it later.
        assert_eq!(strategies[0].detailed_changes.len(), 1);
    }
}
