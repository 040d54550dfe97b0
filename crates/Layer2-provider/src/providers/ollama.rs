//! Ollama local LLM provider
//!
//! 로컬 Ollama 서버(`/api/chat`)와 통신합니다. API 키가 필요 없습니다.

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

/// Ollama provider
pub struct OllamaProvider {
    client: Client,
    base_url: String,
    model: String,
    retry_config: RetryConfig,
}

impl OllamaProvider {
    /// Create a new Ollama provider
    pub fn new(base_url: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
            retry_config: RetryConfig::default(),
        }
    }

    /// Build from resolved settings
    pub fn from_resolved(
        resolved: &ResolvedProvider,
        model: impl Into<String>,
        retry_config: RetryConfig,
    ) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(resolved.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            base_url: resolved.base_url.trim_end_matches('/').to_string(),
            model: model.into(),
            retry_config,
        })
    }

    fn chat_url(&self) -> String {
        format!("{}/api/chat", self.base_url)
    }

    fn build_request(&self, messages: &[Message], system_prompt: Option<&str>) -> OllamaRequest {
        let mut api_messages = Vec::with_capacity(messages.len() + 1);

        if let Some(system) = system_prompt {
            api_messages.push(OllamaMessage {
                role: "system".to_string(),
                content: system.to_string(),
            });
        }

        api_messages.extend(messages.iter().map(|m| OllamaMessage {
            role: m.role.as_str().to_string(),
            content: m.content.clone(),
        }));

        OllamaRequest {
            model: self.model.clone(),
            messages: api_messages,
            stream: false,
        }
    }

    async fn make_request(&self, request: &OllamaRequest) -> Result<OllamaResponse, ProviderError> {
        let response = self
            .client
            .post(self.chat_url())
            .header("Content-Type", "application/json")
            .json(request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(match status {
                404 => ProviderError::ModelNotAvailable(format!(
                    "Model '{}' not found. Run 'ollama pull {}' first.",
                    self.model, self.model
                )),
                _ => ProviderError::from_http_status(status, &format!("Ollama error: {}", body)),
            });
        }

        Ok(response.json().await?)
    }
}

#[async_trait]
impl Provider for OllamaProvider {
    fn id(&self) -> &str {
        "ollama"
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

        let api_response = with_retry(&self.retry_config, "ollama_complete", || {
            self.make_request(&request)
        })
        .await?;

        debug!(model = %self.model, done = api_response.done, "ollama response received");
        Ok(into_provider_response(api_response, &self.model))
    }
}

fn into_provider_response(api_response: OllamaResponse, model: &str) -> ProviderResponse {
    let mut parts = Vec::new();
    if let Some(thinking) = api_response.message.thinking.filter(|t| !t.is_empty()) {
        parts.push(ContentPart::Reasoning(thinking));
    }
    parts.push(ContentPart::Text(api_response.message.content));

    let finish_reason = if api_response.done {
        FinishReason::from_backend(api_response.done_reason.as_deref().or(Some("stop")))
    } else {
        FinishReason::Other
    };

    ProviderResponse {
        parts,
        usage: TokenUsage {
            input_tokens: api_response.prompt_eval_count.unwrap_or(0),
            output_tokens: api_response.eval_count.unwrap_or(0),
        },
        finish_reason,
        model: model.to_string(),
    }
}

// ============================================================================
// Ollama API Types
// ============================================================================

#[derive(Debug, Serialize)]
struct OllamaRequest {
    model: String,
    messages: Vec<OllamaMessage>,
    stream: bool,
}

#[derive(Debug, Serialize)]
struct OllamaMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct OllamaReply {
    #[serde(default)]
    content: String,
    #[serde(default)]
    thinking: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OllamaResponse {
    message: OllamaReply,
    done: bool,
    #[serde(default)]
    done_reason: Option<String>,
    prompt_eval_count: Option<u32>,
    eval_count: Option<u32>,
}
