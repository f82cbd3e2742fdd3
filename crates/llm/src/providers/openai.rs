//! OpenAI-compatible chat provider.
//!
//! Works against any endpoint exposing `POST {base}/chat/completions` with
//! bearer authentication; Qianfan v2 is the default deployment.

use crate::client::{LlmClient, LlmRequest, LlmResponse, LlmUsage};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tripweave_core::config::DEFAULT_OPENAI_ENDPOINT;
use tripweave_core::{AppError, AppResult};

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

/// Response bodies seen in the wild, tried in order.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum CompletionBody {
    Chat {
        choices: Vec<ChatChoice>,
        #[serde(default)]
        model: Option<String>,
        #[serde(default)]
        usage: Option<UsageBody>,
    },
    Text {
        choices: Vec<TextChoice>,
        #[serde(default)]
        model: Option<String>,
        #[serde(default)]
        usage: Option<UsageBody>,
    },
    Flat {
        result: String,
    },
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: String,
}

#[derive(Debug, Deserialize)]
struct TextChoice {
    text: String,
}

#[derive(Debug, Deserialize)]
struct UsageBody {
    #[serde(default)]
    prompt_tokens: u32,
    #[serde(default)]
    completion_tokens: u32,
}

/// Pull the generated text out of a response body.
///
/// Falls back to the raw body when no known shape matches.
fn extract_content(body: &str) -> (String, Option<String>, LlmUsage) {
    let usage_of = |usage: Option<UsageBody>| {
        usage
            .map(|u| LlmUsage::new(u.prompt_tokens, u.completion_tokens))
            .unwrap_or_default()
    };

    match serde_json::from_str::<CompletionBody>(body) {
        Ok(CompletionBody::Chat {
            mut choices,
            model,
            usage,
        }) if !choices.is_empty() => (choices.remove(0).message.content, model, usage_of(usage)),
        Ok(CompletionBody::Text {
            mut choices,
            model,
            usage,
        }) if !choices.is_empty() => (choices.remove(0).text, model, usage_of(usage)),
        Ok(CompletionBody::Flat { result }) => (result, None, LlmUsage::default()),
        _ => {
            tracing::warn!("Unrecognized completion response shape, returning raw body");
            (body.to_string(), None, LlmUsage::default())
        }
    }
}

/// Client for OpenAI-compatible chat endpoints.
pub struct OpenAiCompatClient {
    base_url: String,
    api_key: String,
    client: reqwest::Client,
}

impl OpenAiCompatClient {
    /// Create a client for the default endpoint.
    pub fn new(api_key: impl Into<String>) -> AppResult<Self> {
        Self::with_base_url(DEFAULT_OPENAI_ENDPOINT, api_key, Duration::from_secs(60))
    }

    /// Create a client for a custom endpoint and request timeout.
    pub fn with_base_url(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> AppResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Llm(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            client,
        })
    }

    fn to_chat_request<'a>(&self, request: &'a LlmRequest) -> ChatRequest<'a> {
        let mut messages = Vec::with_capacity(2);
        if let Some(system) = request.system.as_deref() {
            messages.push(ChatMessage {
                role: "system",
                content: system,
            });
        }
        messages.push(ChatMessage {
            role: "user",
            content: &request.prompt,
        });

        ChatRequest {
            model: &request.model,
            messages,
            temperature: request.temperature,
            max_tokens: request.max_tokens,
        }
    }
}

#[async_trait::async_trait]
impl LlmClient for OpenAiCompatClient {
    fn provider_name(&self) -> &str {
        "openai"
    }

    async fn complete(&self, request: &LlmRequest) -> AppResult<LlmResponse> {
        tracing::debug!(
            "Sending chat completion to {} (model: {})",
            self.base_url,
            request.model
        );

        let url = format!("{}/chat/completions", self.base_url);
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&self.to_chat_request(request))
            .send()
            .await
            .map_err(|e| AppError::Llm(format!("Failed to send chat request: {}", e)))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| AppError::Llm(format!("Failed to read chat response: {}", e)))?;

        if !status.is_success() {
            return Err(AppError::Llm(format!(
                "Chat API error ({}): {}",
                status, body
            )));
        }

        let (content, model, usage) = extract_content(&body);
        tracing::debug!("Received {} chars of completion", content.chars().count());

        Ok(LlmResponse {
            content,
            model: model.unwrap_or_else(|| request.model.clone()),
            usage,
        })
    }
}
