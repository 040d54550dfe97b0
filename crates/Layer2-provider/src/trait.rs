//! Provider trait and common types

use crate::error::ProviderError;
use crate::{ContentPart, Message};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Token usage reported by the backend
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

impl TokenUsage {
    pub fn total(&self) -> u32 {
        self.input_tokens + self.output_tokens
    }
}

/// LLM Provider trait
///
/// Implement this trait to add support for a new LLM backend. A provider
/// is bound to a single model at construction time.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Provider id (e.g., "anthropic")
    fn id(&self) -> &str;

    /// Model this provider instance talks to
    fn model(&self) -> &str;

    /// Send messages and get a complete response (non-streaming)
    async fn complete(
        &self,
        messages: Vec<Message>,
        system_prompt: Option<String>,
    ) -> Result<ProviderResponse, ProviderError>;
}

/// Complete response from provider
#[derive(Debug, Clone, Default)]
pub struct ProviderResponse {
    /// Reply content in the order the backend produced it
    pub parts: Vec<ContentPart>,

    /// Token usage
    pub usage: TokenUsage,

    /// Finish reason
    pub finish_reason: FinishReason,

    /// Model used (may differ from requested if the backend aliased it)
    pub model: String,
}

impl ProviderResponse {
    /// Concatenated answer text, reasoning parts excluded
    pub fn text(&self) -> String {
        self.parts
            .iter()
            .filter_map(ContentPart::as_text)
            .collect::<Vec<_>>()
            .join("")
    }

    /// Concatenated reasoning trace, if any
    pub fn reasoning(&self) -> Option<String> {
        let reasoning: Vec<&str> = self
            .parts
            .iter()
            .filter_map(|p| match p {
                ContentPart::Reasoning(r) => Some(r.as_str()),
                _ => None,
            })
            .collect();

        if reasoning.is_empty() {
            None
        } else {
            Some(reasoning.join("\n"))
        }
    }
}

/// Reason for completion finishing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FinishReason {
    /// Completed naturally
    Stop,

    /// Hit max tokens limit
    MaxTokens,

    /// Content filtered
    ContentFilter,

    /// Unknown/other
    #[default]
    Other,
}

impl FinishReason {
    /// Map the various backend stop reason strings
    pub fn from_backend(reason: Option<&str>) -> Self {
        match reason {
            Some("end_turn") | Some("stop") | Some("stop_sequence") => FinishReason::Stop,
            Some("max_tokens") | Some("length") => FinishReason::MaxTokens,
            Some("content_filter") => FinishReason::ContentFilter,
            _ => FinishReason::Other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_skips_reasoning() {
        let response = ProviderResponse {
            parts: vec![
                ContentPart::Reasoning("let me think".into()),
                ContentPart::Text("feat: add".into()),
                ContentPart::Other("tool_use".into()),
                ContentPart::Text(" parser".into()),
            ],
            ..Default::default()
        };

        assert_eq!(response.text(), "feat: add parser");
        assert_eq!(response.reasoning().as_deref(), Some("let me think"));
    }

    #[test]
    fn test_finish_reason_mapping() {
        assert_eq!(FinishReason::from_backend(Some("end_turn")), FinishReason::Stop);
        assert_eq!(FinishReason::from_backend(Some("length")), FinishReason::MaxTokens);
        assert_eq!(FinishReason::from_backend(None), FinishReason::Other);
    }
}
