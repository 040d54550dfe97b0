//! # commitforge-provider
//!
//! LLM provider abstraction layer for CommitForge.
//! Supports multiple providers with a unified interface.
//!
//! ## Features
//! - One short-lived session per request (never reused)
//! - Automatic retry with exponential backoff for transient failures
//! - Multiple provider support (Anthropic, OpenAI-compatible, Ollama)
//! - Replies exposed as typed content parts (text / reasoning / other)

pub mod error;
pub mod gateway;
pub mod message;
pub mod providers;
pub mod retry;
pub mod session;
pub mod r#trait;

// Core traits and types
pub use gateway::{ConfiguredProviderFactory, Gateway};
pub use message::{ContentPart, Message, MessageRole};
pub use r#trait::{FinishReason, Provider, ProviderResponse, TokenUsage};
pub use session::{GenerationSession, ProviderFactory};

// Error and retry
pub use error::ProviderError;
pub use retry::RetryConfig;

// Provider implementations
pub use providers::anthropic::AnthropicProvider;
pub use providers::ollama::OllamaProvider;
pub use providers::openai::OpenAiProvider;
