//! Ollama chat API client.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::LlmError;

pub const DEFAULT_CHAT_URL: &str = "http://localhost:11434/api/chat";
pub const DEFAULT_MODEL: &str = "llama3:8b";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Sampling options forwarded to the model.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ChatOptions {
    pub temperature: f64,
    pub num_predict: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
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
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    stream: bool,
    options: ChatOptions,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    message: Option<ResponseMessage>,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

/// A single-turn chat completion: system prompt plus one user message in,
/// assistant text out.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    async fn chat(&self, system: &str, user: &str, options: ChatOptions)
        -> Result<String, LlmError>;
}

/// HTTP client for an Ollama server.
#[derive(Debug, Clone)]
pub struct OllamaClient {
    client: Client,
    url: String,
    model: String,
}

impl OllamaClient {
    pub fn new(url: impl Into<String>, model: impl Into<String>) -> Result<Self, LlmError> {
        Self::with_timeout(url, model, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(
        url: impl Into<String>,
        model: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, LlmError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            url: url.into(),
            model: model.into(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl ChatBackend for OllamaClient {
    async fn chat(
        &self,
        system: &str,
        user: &str,
        options: ChatOptions,
    ) -> Result<String, LlmError> {
        let request = ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage::system(system), ChatMessage::user(user)],
            stream: false,
            options,
        };

        tracing::debug!(model = %self.model, url = %self.url, "Sending chat request");
        let response = self.client.post(&self.url).json(&request).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let body: ChatResponse = response.json().await?;
        body.message
            .and_then(|message| message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or(LlmError::MissingContent)
    }
}

/// Backend that never reaches a model; every parse falls through to the
/// rule-based parser.
#[derive(Debug, Clone, Copy, Default)]
pub struct OfflineBackend;

#[async_trait]
impl ChatBackend for OfflineBackend {
    async fn chat(&self, _: &str, _: &str, _: ChatOptions) -> Result<String, LlmError> {
        Err(LlmError::Offline)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_shape() {
        let request = ChatRequest {
            model: DEFAULT_MODEL,
            messages: vec![ChatMessage::system("sys"), ChatMessage::user("hi")],
            stream: false,
            options: ChatOptions {
                temperature: 0.1,
                num_predict: 500,
            },
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["model"], "llama3:8b");
        assert_eq!(json["stream"], false);
        assert_eq!(json["messages"][0]["role"], "system");
        assert_eq!(json["messages"][1]["content"], "hi");
        assert_eq!(json["options"]["num_predict"], 500);
    }

    #[test]
    fn test_response_without_message_is_missing_content() {
        let body: ChatResponse = serde_json::from_str(r#"{"done": true}"#).unwrap();
        assert!(body.message.is_none());
    }

    #[tokio::test]
    async fn test_offline_backend_always_fails() {
        let result = OfflineBackend
            .chat("sys", "user", ChatOptions { temperature: 0.0, num_predict: 1 })
            .await;
        assert!(matches!(result, Err(LlmError::Offline)));
    }
}
