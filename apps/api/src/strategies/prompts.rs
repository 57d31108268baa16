// LLM prompt constants for strategy generation.

/// System prompt — enforces JSON-array-only output and the analyst persona.
pub const STRATEGY_SYSTEM: &str = "You are a supply-chain cost-optimization analyst. \
    Given an inventory snapshot, propose concrete cost-optimization strategies \
    with product-level change instructions. \
    You MUST respond with a valid JSON array only. \
    Do NOT include any text outside the JSON array. \
    Do NOT use markdown code fences. \
    Do NOT include explanations or apologies.";

/// Strategy generation prompt template. Replace `{inventory_json}` before sending.
pub const STRATEGY_PROMPT_TEMPLATE: &str = r#"Analyze the following inventory and propose 3 to 6 cost-optimization strategies.

Return a JSON array with this EXACT element schema (no extra fields):
[
  {
    "id": "eoq-optimization",
    "title": "EOQ Optimization",
    "description": "Optimize order quantities to reduce carrying costs",
    "estimatedSavings": 12300,
    "impact": "High",
    "detailedChanges": [
      {
        "productId": "WDG-001",
        "field": "carryingCost",
        "newValue": 12.75,
        "reasoning": "Smaller, more frequent orders cut average stock held"
      }
    ],
    "webFindings": "Optional short note on market context, or omit"
  }
]

Rules:
- "impact" must be exactly one of: "Low", "Medium", "High", "Very High".
- "field" must be exactly one of: "unitCost", "shipping", "storage", "carryingCost", "daysInInventory".
- "productId" must reference an id from the inventory below.
- "estimatedSavings" is the aggregate currency savings if the strategy is applied.
- Keep titles short; keep descriptions to one sentence.

INVENTORY:
{inventory_json}"#;
