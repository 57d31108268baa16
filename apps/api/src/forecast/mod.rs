//! Demand forecasting — per-product forecast records fetched from the model
//! and recovered with the same response-parsing chain as strategies.

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn};

use crate::errors::AppError;
use crate::llm_client::{ChatMessage, LlmError};
use crate::state::AppState;
use crate::strategies::parser::{extract_json_array, ParseFailure};

/// Demand direction over the forecast horizon.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Trend {
    Increasing,
    Decreasing,
    #[default]
    Stable,
}

/// One product's demand forecast.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DemandForecast {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub current_month: f64,
    #[serde(default)]
    pub next_month: f64,
    #[serde(default, rename = "next3Months")]
    pub next_3_months: f64,
    #[serde(default)]
    pub trend: Trend,
    /// Confidence percentage, 0–100, as reported by the model.
    #[serde(default)]
    pub confidence: f64,
    #[serde(default)]
    pub key_factors: Vec<String>,
}

pub const FORECAST_SYSTEM: &str = "You are a demand-planning analyst. \
    Given an inventory snapshot, forecast unit demand per product. \
    You MUST respond with a valid JSON array only. \
    Do NOT include any text outside the JSON array. \
    Do NOT use markdown code fences.";

/// Forecast prompt template. Replace `{inventory_json}` before sending.
pub const FORECAST_PROMPT_TEMPLATE: &str = r#"Forecast monthly unit demand for every product in the inventory below.

Return a JSON array with this EXACT element schema (no extra fields):
[
  {
    "id": "WDG-001",
    "name": "Wireless Bluetooth Headphones",
    "currentMonth": 74,
    "nextMonth": 81,
    "next3Months": 240,
    "trend": "Increasing",
    "confidence": 82,
    "keyFactors": ["Seasonality", "Market trend"]
  }
]

Rules:
- "trend" must be exactly one of: "Increasing", "Decreasing", "Stable".
- "confidence" is a percentage between 0 and 100.
- Include one element per product, using the product's id.

INVENTORY:
{inventory_json}"#;

/// Recovers typed forecasts from free-form model output. Elements that fail
/// deserialization or lack an id are dropped with a log line; the rest of
/// the batch still surfaces.
pub fn parse_forecasts(text: &str) -> Result<Vec<DemandForecast>, ParseFailure> {
    let elements = extract_json_array(text)?;
    Ok(validate_forecasts(elements))
}

fn validate_forecasts(elements: Vec<Value>) -> Vec<DemandForecast> {
    let total = elements.len();
    let forecasts: Vec<DemandForecast> = elements
        .into_iter()
        .filter_map(|element| match serde_json::from_value::<DemandForecast>(element.clone()) {
            Ok(forecast) if !forecast.id.is_empty() => Some(forecast),
            _ => {
                warn!("Dropping malformed forecast element: {element}");
                None
            }
        })
        .collect();
    if forecasts.len() < total {
        warn!("Forecast validation kept {} of {} elements", forecasts.len(), total);
    }
    forecasts
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ForecastResponse {
    pub forecast: Vec<DemandForecast>,
    pub cached: bool,
    pub parse_failed: bool,
}

/// POST /api/v1/forecast
///
/// Fetches a demand forecast for the current snapshot; an unchanged
/// inventory hash is served from the cache.
pub async fn handle_generate(
    State(state): State<AppState>,
) -> Result<Json<ForecastResponse>, AppError> {
    let snapshot = state.store.snapshot().ok_or_else(|| {
        AppError::Validation("No inventory loaded. Upload inventory first.".to_string())
    })?;

    if let Some(forecast) = state.store.cached_forecast(&snapshot.hash) {
        return Ok(Json(ForecastResponse {
            forecast,
            cached: true,
            parse_failed: false,
        }));
    }

    let inventory_json = serde_json::to_string_pretty(&snapshot.products)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to serialize inventory: {e}")))?;
    let prompt = FORECAST_PROMPT_TEMPLATE.replace("{inventory_json}", &inventory_json);
    let messages = [
        ChatMessage::system(FORECAST_SYSTEM),
        ChatMessage::user(prompt),
    ];

    let completion = match state.completions.complete(&messages).await {
        Ok(completion) => completion,
        Err(LlmError::EmptyContent) => {
            warn!("Forecast completion carried no content");
            return Ok(Json(ForecastResponse {
                forecast: Vec::new(),
                cached: false,
                parse_failed: true,
            }));
        }
        Err(e) => return Err(AppError::from_fetch_failure(e)),
    };

    match parse_forecasts(&completion.content) {
        Ok(forecast) => {
            info!(
                "Parsed {} forecast rows for snapshot {}",
                forecast.len(),
                &snapshot.hash[..12]
            );
            state.store.put_forecast(&snapshot.hash, forecast.clone());
            Ok(Json(ForecastResponse {
                forecast,
                cached: false,
                parse_failed: false,
            }))
        }
        Err(failure) => {
            warn!("Forecast response unusable: {failure}");
            Ok(Json(ForecastResponse {
                forecast: Vec::new(),
                cached: false,
                parse_failed: true,
            }))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_forecast_wire_names() {
        let forecast: DemandForecast = serde_json::from_value(json!({
            "id": "WDG-001",
            "name": "Headphones",
            "currentMonth": 74,
            "nextMonth": 81,
            "next3Months": 240,
            "trend": "Increasing",
            "confidence": 82,
            "keyFactors": ["Seasonality"]
        }))
        .unwrap();
        assert_eq!(forecast.next_3_months, 240.0);
        assert_eq!(forecast.trend, Trend::Increasing);
        assert_eq!(forecast.key_factors, vec!["Seasonality".to_string()]);
    }

    #[test]
    fn test_forecast_defaults() {
        let forecast: DemandForecast = serde_json::from_value(json!({"id": "X"})).unwrap();
        assert_eq!(forecast.trend, Trend::Stable);
        assert_eq!(forecast.current_month, 0.0);
        assert!(forecast.key_factors.is_empty());
    }

    #[test]
    fn test_parse_forecasts_from_fenced_block() {
        let text = "Sure!\n```json\n[{\"id\": \"A\", \"trend\": \"Decreasing\"}]\n```";
        let forecasts = parse_forecasts(text).unwrap();
        assert_eq!(forecasts.len(), 1);
        assert_eq!(forecasts[0].trend, Trend::Decreasing);
    }

    #[test]
    fn test_malformed_elements_dropped_not_fatal() {
        let elements = vec![
            json!({"id": "keep"}),
            json!({"name": "missing id"}),
            json!({"id": "bad-trend", "trend": "Sideways"}),
            json!(42),
        ];
        let forecasts = validate_forecasts(elements);
        assert_eq!(forecasts.len(), 1);
        assert_eq!(forecasts[0].id, "keep");
    }

    #[test]
    fn test_prose_only_is_parse_failure() {
        assert!(parse_forecasts("demand looks flat this quarter").is_err());
    }
}
