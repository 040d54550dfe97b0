//! OpenAI-compatible chat completions provider
//!
//! Serves OpenAI itself and any backend speaking the same wire format
//! (Groq, local gateways) through a custom base URL.

use crate::{
    error::ProviderError,
    r#trait::{FinishReason, Provider, ProviderResponse, TokenUsage},
    retry::{with_retry, RetryConfig},
    ContentPart, Message,
};
use async_trait::async_trait;
use commitforge_foundation::ResolvedProvider;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// OpenAI (and compatible) provider
pub struct OpenAiProvider {
    client: Client,
    id: String,
    api_key: String,
    endpoint: String,
    model: String,
    max_tokens: u32,
    retry_config: RetryConfig,
}

impl OpenAiProvider {
    /// Create a new OpenAI provider
    pub fn new(api_key: impl Into<String>, model: impl Into<String>, max_tokens: u32) -> Self {
        Self {
            client: Client::new(),
            id: "openai".to_string(),
            api_key: api_key.into(),
            endpoint: endpoint_for("https://api.openai.com"),
            model: model.into(),
            max_tokens,
            retry_config: RetryConfig::default(),
        }
    }

    /// Create with custom base URL (for OpenAI-compatible APIs)
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.endpoint = endpoint_for(base_url);
        self
    }

    /// Build from resolved credentials
    pub fn from_resolved(
        resolved: &ResolvedProvider,
        model: impl Into<String>,
        retry_config: RetryConfig,
    ) -> Result<Self, ProviderError> {
        let api_key = resolved.api_key.clone().ok_or_else(|| {
            ProviderError::Authentication(format!(
                "no API key configured for provider '{}'",
                resolved.name
            ))
        })?;

        let client = Client::builder()
            .timeout(Duration::from_secs(resolved.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            id: resolved.name.clone(),
            api_key,
            endpoint: endpoint_for(&resolved.base_url),
            model: model.into(),
            max_tokens: resolved.max_tokens,
            retry_config,
        })
    }

    fn build_request(&self, messages: &[Message], system_prompt: Option<&str>) -> OpenAiRequest {
        let mut api_messages = Vec::with_capacity(messages.len() + 1);

        if let Some(system) = system_prompt {
            api_messages.push(OpenAiMessage {
                role: "system".to_string(),
                content: system.to_string(),
            });
        }

        api_messages.extend(messages.iter().map(|m| OpenAiMessage {
            role: m.role.as_str().to_string(),
            content: m.content.clone(),
        }));

        OpenAiRequest {
            model: self.model.clone(),
            messages: api_messages,
            max_tokens: Some(self.max_tokens),
        }
    }

    async fn make_request(&self, request: &OpenAiRequest) -> Result<OpenAiResponse, ProviderError> {
        let response = self
            .client
            .post(&self.endpoint)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(parse_error_response(status, &body));
        }

        Ok(response.json().await?)
    }
}

fn endpoint_for(base_url: &str) -> String {
    format!("{}/v1/chat/completions", base_url.trim_end_matches('/'))
}

/// Prefer the structured error message when the body carries one
fn parse_error_response(status: u16, body: &str) -> ProviderError {
    let message = serde_json::from_str::<OpenAiErrorResponse>(body)
        .map(|e| match e.error.code {
            Some(code) => format!("{} ({})", e.error.message, code),
            None => e.error.message,
        })
        .unwrap_or_else(|_| body.to_string());

    ProviderError::from_http_status(status, &message)
}

#[async_trait]
impl Provider for OpenAiProvider {
    fn id(&self) -> &str {
        &self.id
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn complete(
        &self,
        messages: Vec<Message>,
        system_prompt: Option<String>,
    ) -> Result<ProviderResponse, ProviderError> {
        let request = self.build_request(&messages, system_prompt.as_deref());

        let api_response = with_retry(&self.retry_config, "openai_complete", || {
            self.make_request(&request)
        })
        .await?;

        let response = into_provider_response(api_response, &self.model)?;
        debug!(provider = %self.id, parts = response.parts.len(), "completion received");
        Ok(response)
    }
}

fn into_provider_response(
    api_response: OpenAiResponse,
    requested_model: &str,
) -> Result<ProviderResponse, ProviderError> {
    let choice = api_response
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| ProviderError::InvalidResponse("No choices in response".to_string()))?;

    let mut parts = Vec::new();
    if let Some(reasoning) = choice.message.reasoning_content.filter(|r| !r.is_empty()) {
        parts.push(ContentPart::Reasoning(reasoning));
    }
    if let Some(content) = choice.message.content {
        parts.push(ContentPart::Text(content));
    }

    let usage = api_response
        .usage
        .map(|u| TokenUsage {
            input_tokens: u.prompt_tokens,
            output_tokens: u.completion_tokens,
        })
        .unwrap_or_default();

    Ok(ProviderResponse {
        parts,
        usage,
        finish_reason: FinishReason::from_backend(choice.finish_reason.as_deref()),
        model: api_response
            .model
            .unwrap_or_else(|| requested_model.to_string()),
    })
}

// ============================================================================
// OpenAI API Types
// ============================================================================

#[derive(Debug, Serialize)]
struct OpenAiRequest {
    model: String,
    messages: Vec<OpenAiMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Debug, Serialize)]
struct OpenAiMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct OpenAiResponse {
    choices: Vec<OpenAiChoice>,
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    usage: Option<OpenAiUsage>,
}

#[derive(Debug, Deserialize)]
struct OpenAiChoice {
    message: OpenAiReply,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAiReply {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    reasoning_content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAiUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct OpenAiErrorResponse {
    error: OpenAiError,
}

#[derive(Debug, Deserialize)]
struct OpenAiError {
    message: String,
    code: Option<String>,
}
