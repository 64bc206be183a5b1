//! OpenAI-compatible chat-completions client.
//!
//! Only the subset needed for multimodal JSON-mode requests is modelled:
//! a single user message made of text and `image_url` parts.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::config::LlmConfig;
use crate::error::{AnnotatorError, AnnotatorResult};

const SERVICE: &str = "language model";

// ---------------------------------------------------------------------------
// Request / response model
// ---------------------------------------------------------------------------

/// One part of a multimodal user message.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    Text { text: String },
    ImageUrl { image_url: ImageUrl },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImageUrl {
    pub url: String,
}

impl ContentPart {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    pub fn image(url: impl Into<String>) -> Self {
        Self::ImageUrl {
            image_url: ImageUrl { url: url.into() },
        }
    }
}

#[derive(Debug, Clone)]
pub struct ChatRequest {
    pub parts: Vec<ContentPart>,
    pub max_tokens: u32,
}

/// The first choice of a completion.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChatCompletion {
    pub content: Option<String>,
    pub finish_reason: Option<String>,
}

impl ChatCompletion {
    pub fn truncated(&self) -> bool {
        self.finish_reason.as_deref() == Some("length")
    }
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    #[serde(default)]
    finish_reason: Option<String>,
    message: Message,
}

#[derive(Debug, Deserialize)]
struct Message {
    #[serde(default)]
    content: Option<String>,
}

// ---------------------------------------------------------------------------
// ChatModel
// ---------------------------------------------------------------------------

#[async_trait]
pub trait ChatModel: Send + Sync {
    async fn complete(&self, request: &ChatRequest) -> AnnotatorResult<ChatCompletion>;
}

pub struct OpenAiClient {
    client: reqwest::Client,
    config: LlmConfig,
}

impl OpenAiClient {
    pub fn new(config: LlmConfig) -> AnnotatorResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self { client, config })
    }

    /// JSON body for `POST /chat/completions`.
    fn body(&self, request: &ChatRequest) -> Value {
        let mut body = json!({
            "model": self.config.model,
            "messages": [{"role": "user", "content": request.parts}],
            "response_format": {"type": "json_object"},
        });
        let token_key = if self.config.uses_completion_tokens() {
            "max_completion_tokens"
        } else {
            "max_tokens"
        };
        body[token_key] = json!(request.max_tokens);
        if self.config.uses_completion_tokens() {
            if let Some(tier) = &self.config.service_tier {
                body["service_tier"] = json!(tier);
            }
        }
        body
    }

    async fn ensure_success(response: reqwest::Response) -> AnnotatorResult<reqwest::Response> {
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<failed to read body>".to_string());
            return Err(AnnotatorError::Api {
                service: SERVICE,
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }
}

#[async_trait]
impl ChatModel for OpenAiClient {
    async fn complete(&self, request: &ChatRequest) -> AnnotatorResult<ChatCompletion> {
        let api_key = self
            .config
            .api_key
            .as_deref()
            .ok_or(AnnotatorError::NotConfigured("OPENAI_API_KEY"))?;

        let response = self
            .client
            .post(format!("{}/chat/completions", self.config.base_url))
            .bearer_auth(api_key)
            .json(&self.body(request))
            .send()
            .await?;
        let parsed: CompletionResponse = Self::ensure_success(response).await?.json().await?;

        let choice = parsed
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| AnnotatorError::Malformed("completion has no choices".into()))?;
        Ok(ChatCompletion {
            content: choice.message.content,
            finish_reason: choice.finish_reason,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(model: &str, tier: Option<&str>) -> OpenAiClient {
        OpenAiClient::new(LlmConfig {
            api_key: Some("k".into()),
            base_url: "http://localhost".into(),
            model: model.into(),
            max_completion_tokens: 4096,
            timeout_secs: 5,
            service_tier: tier.map(str::to_string),
        })
        .unwrap()
    }

    fn request() -> ChatRequest {
        ChatRequest {
            parts: vec![
                ContentPart::text("hello"),
                ContentPart::image("data:image/png;base64,AAAA"),
            ],
            max_tokens: 1000,
        }
    }

    #[test]
    fn reasoning_models_use_completion_tokens_and_tier() {
        let body = client("gpt-5-mini", Some("flex")).body(&request());
        assert_eq!(body["max_completion_tokens"], 1000);
        assert!(body.get("max_tokens").is_none());
        assert_eq!(body["service_tier"], "flex");
        assert_eq!(body["response_format"]["type"], "json_object");
    }

    #[test]
    fn older_models_use_max_tokens_without_tier() {
        let body = client("gpt-4o", Some("flex")).body(&request());
        assert_eq!(body["max_tokens"], 1000);
        assert!(body.get("service_tier").is_none());
    }

    #[test]
    fn content_parts_wire_shape() {
        let body = client("gpt-4o", None).body(&request());
        let content = &body["messages"][0]["content"];
        assert_eq!(content[0], json!({"type": "text", "text": "hello"}));
        assert_eq!(
            content[1],
            json!({"type": "image_url", "image_url": {"url": "data:image/png;base64,AAAA"}})
        );
    }

    #[test]
    fn parses_first_choice() {
        let raw = json!({"choices": [{"finish_reason": "length", "message": {"content": null}}]});
        let parsed: CompletionResponse = serde_json::from_value(raw).unwrap();
        assert!(parsed.choices[0].message.content.is_none());
        assert_eq!(parsed.choices[0].finish_reason.as_deref(), Some("length"));
    }
}
