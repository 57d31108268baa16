//! Chat assistant — a session conversation with the model about the current
//! inventory. History lives in the session store and resets with it.

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::errors::AppError;
use crate::llm_client::ChatMessage;
use crate::state::AppState;
use crate::store::ChatTurn;

const CHAT_SYSTEM: &str = "You are SupplySense, an inventory and supply-chain \
    assistant. Answer questions about the user's inventory data: costs, \
    margins, turnover, and optimization. Be concise and concrete. \
    When the inventory snapshot is provided below, ground every figure in it.";

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub reply: String,
    pub citations: Vec<String>,
}

/// POST /api/v1/chat
///
/// Sends the session conversation plus the new message to the model and
/// appends both turns to the history. Works without an inventory loaded;
/// the snapshot is injected into the system prompt when present.
pub async fn handle_chat(
    State(state): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, AppError> {
    if request.message.trim().is_empty() {
        return Err(AppError::Validation("message cannot be empty".to_string()));
    }

    let inventory_json = match state.store.snapshot() {
        Some(snapshot) => Some(
            serde_json::to_string(&snapshot.products).map_err(|e| {
                AppError::Internal(anyhow::anyhow!("Failed to serialize inventory: {e}"))
            })?,
        ),
        None => None,
    };

    let history = state.store.chat_history();
    let messages = build_messages(inventory_json.as_deref(), &history, &request.message);

    // Any completion failure, including empty content, surfaces as an error
    // here: unlike strategy parsing there is no "legitimately nothing" case
    // for a direct reply.
    let completion = state
        .completions
        .complete(&messages)
        .await
        .map_err(AppError::from_fetch_failure)?;

    state.store.push_chat_turn("user", &request.message);
    state.store.push_chat_turn("assistant", &completion.content);
    info!("Chat turn complete ({} citations)", completion.citations.len());

    Ok(Json(ChatResponse {
        reply: completion.content,
        citations: completion.citations,
    }))
}

fn build_messages(
    inventory_json: Option<&str>,
    history: &[ChatTurn],
    message: &str,
) -> Vec<ChatMessage> {
    let system = match inventory_json {
        Some(json) => format!("{CHAT_SYSTEM}\n\nCURRENT INVENTORY SNAPSHOT:\n{json}"),
        None => CHAT_SYSTEM.to_string(),
    };

    let mut messages = Vec::with_capacity(history.len() + 2);
    messages.push(ChatMessage::system(system));
    for turn in history {
        messages.push(ChatMessage {
            role: turn.role.clone(),
            content: turn.content.clone(),
        });
    }
    messages.push(ChatMessage::user(message));
    messages
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn turn(role: &str, content: &str) -> ChatTurn {
        ChatTurn {
            role: role.to_string(),
            content: content.to_string(),
            at: Utc::now(),
        }
    }

    #[test]
    fn test_build_messages_without_inventory() {
        let messages = build_messages(None, &[], "what should I restock?");
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, "system");
        assert!(!messages[0].content.contains("SNAPSHOT"));
        assert_eq!(messages[1].role, "user");
    }

    #[test]
    fn test_build_messages_injects_inventory() {
        let messages = build_messages(Some(r#"[{"id":"A"}]"#), &[], "hi");
        assert!(messages[0].content.contains("CURRENT INVENTORY SNAPSHOT"));
        assert!(messages[0].content.contains(r#"[{"id":"A"}]"#));
    }

    #[test]
    fn test_build_messages_preserves_history_order() {
        let history = vec![turn("user", "q1"), turn("assistant", "a1")];
        let messages = build_messages(None, &history, "q2");
        assert_eq!(messages.len(), 4);
        assert_eq!(messages[1].content, "q1");
        assert_eq!(messages[2].role, "assistant");
        assert_eq!(messages[3].content, "q2");
    }
}
