//! Anthropic (Claude) provider implementation

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

const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Anthropic Claude provider
pub struct AnthropicProvider {
    client: Client,
    api_key: String,
    endpoint: String,
    model: String,
    max_tokens: u32,
    retry_config: RetryConfig,
}

impl AnthropicProvider {
    /// Create a new Anthropic provider
    pub fn new(api_key: impl Into<String>, model: impl Into<String>, max_tokens: u32) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            endpoint: endpoint_for("https://api.anthropic.com"),
            model: model.into(),
            max_tokens,
            retry_config: RetryConfig::default(),
        }
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
            api_key,
            endpoint: endpoint_for(&resolved.base_url),
            model: model.into(),
            max_tokens: resolved.max_tokens,
            retry_config,
        })
    }

    /// Build request for Anthropic API
    fn build_request(&self, messages: &[Message], system_prompt: Option<&str>) -> AnthropicRequest {
        AnthropicRequest {
            model: self.model.clone(),
            max_tokens: self.max_tokens,
            system: system_prompt.map(|s| s.to_string()),
            messages: messages
                .iter()
                .map(|m| AnthropicMessage {
                    role: m.role.as_str().to_string(),
                    content: m.content.clone(),
                })
                .collect(),
        }
    }

    /// Make HTTP request to Anthropic API
    async fn make_request(
        &self,
        request: &AnthropicRequest,
    ) -> Result<AnthropicResponse, ProviderError> {
        let response = self
            .client
            .post(&self.endpoint)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("content-type", "application/json")
            .json(request)
            .send()
            .await?;

        let status = response.status().as_u16();

        if status != 200 {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::from_http_status(status, &body));
        }

        Ok(response.json().await?)
    }
}

fn endpoint_for(base_url: &str) -> String {
    format!("{}/v1/messages", base_url.trim_end_matches('/'))
}

#[async_trait]
impl Provider for AnthropicProvider {
    fn id(&self) -> &str {
        "anthropic"
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

        let api_response = with_retry(&self.retry_config, "anthropic_complete", || {
            self.make_request(&request)
        })
        .await?;

        debug!(
            model = %api_response.model,
            blocks = api_response.content.len(),
            "anthropic response received"
        );

        Ok(into_provider_response(api_response))
    }
}

fn into_provider_response(api_response: AnthropicResponse) -> ProviderResponse {
    let parts = api_response
        .content
        .into_iter()
        .map(|block| match block {
            ContentBlock::Text { text } => ContentPart::Text(text),
            ContentBlock::Thinking { thinking } => ContentPart::Reasoning(thinking),
            ContentBlock::Other => ContentPart::Other("unsupported block".to_string()),
        })
        .collect();

    ProviderResponse {
        parts,
        usage: TokenUsage {
            input_tokens: api_response.usage.input_tokens,
            output_tokens: api_response.usage.output_tokens,
        },
        finish_reason: FinishReason::from_backend(api_response.stop_reason.as_deref()),
        model: api_response.model,
    }
}

// ============================================================================
// Anthropic API Types
// ============================================================================

#[derive(Debug, Serialize)]
struct AnthropicRequest {
    model: String,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    messages: Vec<AnthropicMessage>,
}

#[derive(Debug, Serialize)]
struct AnthropicMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
enum ContentBlock {
    #[serde(rename = "text")]
    Text { text: String },
    #[serde(rename = "thinking")]
    Thinking { thinking: String },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    content: Vec<ContentBlock>,
    model: String,
    stop_reason: Option<String>,
    usage: AnthropicUsage,
}

#[derive(Debug, Deserialize)]
struct AnthropicUsage {
    input_tokens: u32,
    output_tokens: u32,
}
