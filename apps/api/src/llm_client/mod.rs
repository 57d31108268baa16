//! LLM client — the single point of entry for all completion-endpoint calls
//! in SupplySense.
//!
//! ARCHITECTURAL RULE: no other module may call the completion API directly.
//! Handlers talk to the `CompletionBackend` trait so tests can stub the
//! network out entirely.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// Default chat-completions endpoint (Perplexity-compatible wire format).
pub const DEFAULT_API_URL: &str = "https://api.perplexity.ai/chat/completions";
/// Default model for all completion calls.
pub const DEFAULT_MODEL: &str = "sonar-pro";

#[derive(Debug, Error)]
pub enum LlmError {
    /// Transport-level failure: the request never produced a usable response.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The endpoint answered with a non-success status.
    #[error("completion endpoint error (status {status}): {message}")]
    Api { status: u16, message: String },

    /// The call succeeded but carried no message content.
    #[error("completion endpoint returned empty content")]
    EmptyContent,
}

impl LlmError {
    /// Whether this is a fetch-level failure (error-banner material) as
    /// opposed to an unusable-payload condition handled by parsers.
    pub fn is_fetch_failure(&self) -> bool {
        matches!(self, LlmError::Http(_) | LlmError::Api { .. })
    }
}

/// One message in a chat-completion conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: "assistant".to_string(),
            content: content.into(),
        }
    }
}

/// The only response fields the core relies on.
#[derive(Debug, Clone)]
pub struct Completion {
    pub content: String,
    pub citations: Vec<String>,
}

/// Seam between handlers and the hosted model, mirrored by test stubs.
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    async fn complete(&self, messages: &[ChatMessage]) -> Result<Completion, LlmError>;
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
    #[serde(default)]
    citations: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: String,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    error: ApiErrorBody,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    message: String,
}

/// HTTP implementation of [`CompletionBackend`] against a hosted
/// chat-completions endpoint with bearer-token auth.
#[derive(Clone)]
pub struct LlmClient {
    client: Client,
    api_url: String,
    api_key: String,
    model: String,
}

impl LlmClient {
    pub fn new(api_url: String, api_key: String, model: String) -> Self {
        Self {
            client: Client::builder()
                .timeout(std::time::Duration::from_secs(120))
                .build()
                .expect("Failed to build HTTP client"),
            api_url,
            api_key,
            model,
        }
    }
}

#[async_trait]
impl CompletionBackend for LlmClient {
    async fn complete(&self, messages: &[ChatMessage]) -> Result<Completion, LlmError> {
        let request_body = ChatCompletionRequest {
            model: &self.model,
            messages,
        };

        let response = self
            .client
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .header("content-type", "application/json")
            .json(&request_body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ApiError>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);
            return Err(LlmError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let parsed: ChatCompletionResponse = response.json().await?;
        let content = parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .filter(|c| !c.trim().is_empty())
            .ok_or(LlmError::EmptyContent)?;

        debug!(
            "Completion call succeeded: {} bytes, {} citations",
            content.len(),
            parsed.citations.len()
        );

        Ok(Completion {
            content,
            citations: parsed.citations,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chat_message_roles() {
        assert_eq!(ChatMessage::system("s").role, "system");
        assert_eq!(ChatMessage::user("u").role, "user");
        assert_eq!(ChatMessage::assistant("a").role, "assistant");
    }

    #[test]
    fn test_request_wire_shape() {
        let messages = vec![ChatMessage::system("sys"), ChatMessage::user("hello")];
        let request = ChatCompletionRequest {
            model: DEFAULT_MODEL,
            messages: &messages,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["model"], DEFAULT_MODEL);
        assert_eq!(json["messages"][0]["role"], "system");
        assert_eq!(json["messages"][1]["content"], "hello");
    }

    #[test]
    fn test_response_parses_choices_and_citations() {
        let body = r#"{
            "choices": [{"message": {"role": "assistant", "content": "hi"}}],
            "citations": ["https://example.com"]
        }"#;
        let parsed: ChatCompletionResponse = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.choices[0].message.content, "hi");
        assert_eq!(parsed.citations.len(), 1);
    }

    #[test]
    fn test_response_tolerates_missing_citations() {
        let body = r#"{"choices": [{"message": {"content": "hi"}}]}"#;
        let parsed: ChatCompletionResponse = serde_json::from_str(body).unwrap();
        assert!(parsed.citations.is_empty());
    }

    #[test]
    fn test_fetch_failure_classification() {
        let api = LlmError::Api {
            status: 503,
            message: "overloaded".to_string(),
        };
        assert!(api.is_fetch_failure());
        assert!(!LlmError::EmptyContent.is_fetch_failure());
    }

    #[test]
    fn test_api_error_body_extraction() {
        let body = r#"{"error": {"message": "invalid model"}}"#;
        let parsed: ApiError = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.error.message, "invalid model");
    }
}
