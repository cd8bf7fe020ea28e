//! Chat-completion client for OpenAI-compatible APIs.

use std::time::Duration;

use async_trait::async_trait;
use beacon_core::prompts::GenerationParams;
use serde::{Deserialize, Serialize};

use crate::{error_body, http_client};

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_MODEL: &str = "gpt-3.5-turbo";

#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Chat completion API error ({status}): {body}")]
    Api { status: u16, body: String },

    #[error("Chat completion returned no content")]
    EmptyReply,
}

/// A model that answers a single-turn prompt with text.
#[async_trait]
pub trait ChatModel: Send + Sync {
    async fn complete(&self, prompt: &str, params: GenerationParams) -> Result<String, LlmError>;
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 1],
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ReplyMessage,
}

#[derive(Debug, Deserialize)]
struct ReplyMessage {
    content: Option<String>,
}

/// `POST {base_url}/chat/completions` with a bearer API key.
pub struct OpenAiClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl OpenAiClient {
    pub fn new(
        base_url: &str,
        api_key: String,
        model: String,
        timeout: Duration,
    ) -> Result<Self, LlmError> {
        Ok(Self {
            client: http_client(timeout, false)?,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            model,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl ChatModel for OpenAiClient {
    async fn complete(&self, prompt: &str, params: GenerationParams) -> Result<String, LlmError> {
        let request = ChatRequest {
            model: &self.model,
            messages: [ChatMessage {
                role: "user",
                content: prompt,
            }],
            temperature: params.temperature,
            max_tokens: params.max_tokens,
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(LlmError::Api {
                status: status.as_u16(),
                body: error_body(response).await,
            });
        }

        let reply: ChatResponse = response.json().await?;
        reply
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .map(|content| content.trim().to_string())
            .filter(|content| !content.is_empty())
            .ok_or(LlmError::EmptyReply)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_server;
    use assert_matches::assert_matches;
    use axum::routing::post;
    use axum::{Json, Router};
    use serde_json::{json, Value};

    const PARAMS: GenerationParams = GenerationParams {
        temperature: 0.2,
        max_tokens: Some(800),
    };

    #[tokio::test]
    async fn sends_prompt_and_returns_first_choice() {
        let app = Router::new().route(
            "/chat/completions",
            post(|Json(body): Json<Value>| async move {
                // Echo the request so the test can inspect it.
                Json(json!({
                    "choices": [{ "message": { "content": format!("  {body}  ") } }]
                }))
            }),
        );
        let base = test_server::spawn(app).await;
        let client = OpenAiClient::new(&base, "key".into(), "gpt-test".into(), Duration::from_secs(5)).unwrap();

        let reply = client.complete("hello", PARAMS).await.unwrap();
        let echoed: Value = serde_json::from_str(&reply).unwrap();

        assert_eq!(echoed["model"], "gpt-test");
        assert_eq!(echoed["messages"][0], json!({"role": "user", "content": "hello"}));
        assert_eq!(echoed["max_tokens"], 800);
    }

    #[tokio::test]
    async fn empty_choices_is_an_error() {
        let app = Router::new().route("/chat/completions", post(|| async { Json(json!({"choices": []})) }));
        let base = test_server::spawn(app).await;
        let client = OpenAiClient::new(&base, "key".into(), "m".into(), Duration::from_secs(5)).unwrap();

        assert_matches!(client.complete("hi", PARAMS).await, Err(LlmError::EmptyReply));
    }
}
