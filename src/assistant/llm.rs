//! Chat-completion model seam and the Mistral client.
//!
//! Requests are non-streaming: the workflow needs the whole reply before it
//! can look for an email directive.

use crate::config::LlmConfig;
use crate::error::{AssistantError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// Author of a chat message sent to the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

/// One message of a model request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
        }
    }
}

/// A language model that turns a message list into one reply.
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// # Errors
    ///
    /// Returns [`AssistantError::Llm`] on transport, HTTP or decoding failure.
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String>;
}

/// Build the JSON body of a chat-completions request.
#[must_use]
pub fn build_chat_request(
    model: &str,
    messages: &[ChatMessage],
    temperature: Option<f32>,
    max_tokens: Option<u32>,
) -> serde_json::Value {
    let mut body = serde_json::json!({
        "model": model,
        "messages": messages,
        "stream": false,
    });

    if let Some(obj) = body.as_object_mut() {
        if let Some(temp) = temperature {
            obj.insert("temperature".into(), serde_json::json!(temp));
        }
        if let Some(max) = max_tokens {
            obj.insert("max_tokens".into(), serde_json::json!(max));
        }
    }
    body
}

/// Extract the first choice's text from a chat-completions response.
///
/// `content` may be a plain string or a list of `{"type":"text","text":..}` chunks.
///
/// # Errors
///
/// Returns [`AssistantError::Llm`] when no text can be found.
pub fn parse_chat_response(value: &serde_json::Value) -> Result<String> {
    let content = value
        .get("choices")
        .and_then(|c| c.get(0))
        .and_then(|c| c.get("message"))
        .and_then(|m| m.get("content"))
        .ok_or_else(|| AssistantError::Llm("response has no choices[0].message.content".into()))?;

    match content {
        serde_json::Value::String(s) => Ok(s.clone()),
        serde_json::Value::Array(chunks) => Ok(chunks
            .iter()
            .filter_map(|chunk| chunk.get("text").and_then(|t| t.as_str()))
            .collect::<String>()),
        other => Err(AssistantError::Llm(format!(
            "unexpected content type in response: {other}"
        ))),
    }
}

/// Extract an error message from an API error body.
fn extract_error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| {
            v.get("message")
                .or_else(|| v.get("error").and_then(|e| e.get("message")))
                .and_then(|m| m.as_str())
                .map(String::from)
        })
        .unwrap_or_else(|| body.to_string())
}

/// Mistral chat-completions client.
#[derive(Clone)]
pub struct MistralClient {
    api_key: String,
    base_url: String,
    model: String,
    temperature: Option<f32>,
    max_tokens: Option<u32>,
    client: reqwest::Client,
}

impl std::fmt::Debug for MistralClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MistralClient")
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl MistralClient {
    /// # Errors
    ///
    /// Returns [`AssistantError::Config`] if the HTTP client cannot be built.
    pub fn new(config: &LlmConfig, api_key: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AssistantError::Config(format!("cannot build LLM client: {e}")))?;
        Ok(Self {
            api_key: api_key.into(),
            base_url: config.base_url.trim_end_matches('/').to_owned(),
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            client,
        })
    }
}

#[async_trait]
impl ChatModel for MistralClient {
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String> {
        let url = format!("{}/v1/chat/completions", self.base_url);
        let body = build_chat_request(&self.model, messages, self.temperature, self.max_tokens);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| AssistantError::Llm(format!("request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let message = extract_error_message(&text);
            return Err(match status.as_u16() {
                401 => AssistantError::Llm(format!("authentication failed: {message}")),
                429 => AssistantError::Llm(format!("rate limited: {message}")),
                code => AssistantError::Llm(format!("HTTP {code}: {message}")),
            });
        }

        let value: serde_json::Value = response
            .json()
            .await
            .map_err(|e| AssistantError::Llm(format!("invalid response body: {e}")))?;
        let reply = parse_chat_response(&value)?;
        debug!("model {} replied with {} chars", self.model, reply.len());
        Ok(reply)
    }
}
