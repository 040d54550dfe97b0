//! LLM Gateway - routes requests to appropriate providers
//!
//! The Gateway turns a `ModelSelector` into a concrete provider and runs
//! each request inside its own `GenerationSession`.

use crate::{
    providers::{anthropic::AnthropicProvider, ollama::OllamaProvider, openai::OpenAiProvider},
    retry::RetryConfig,
    session::{GenerationSession, ProviderFactory},
    Provider, ProviderError, ProviderResponse,
};
use commitforge_foundation::{ModelSelector, ProviderConfig, ProviderType, ResolvedConfig};
use std::sync::Arc;
use tracing::debug;

/// Builds real HTTP providers from configured credentials
pub struct ConfiguredProviderFactory {
    providers: ProviderConfig,
    retry_config: RetryConfig,
}

impl ConfiguredProviderFactory {
    pub fn new(providers: ProviderConfig, retry_config: RetryConfig) -> Self {
        Self {
            providers,
            retry_config,
        }
    }
}

impl ProviderFactory for ConfiguredProviderFactory {
    fn create(&self, selector: &ModelSelector) -> Result<Arc<dyn Provider>, ProviderError> {
        let resolved = self.providers.resolve(&selector.provider)?;
        let retry = self.retry_config.clone();

        debug!(
            provider = %resolved.name,
            kind = %resolved.provider_type,
            base_url = %resolved.base_url,
            "building provider"
        );

        let provider: Arc<dyn Provider> = match resolved.provider_type {
            ProviderType::Anthropic => Arc::new(AnthropicProvider::from_resolved(
                &resolved,
                &selector.model,
                retry,
            )?),
            ProviderType::Openai | ProviderType::Groq => Arc::new(OpenAiProvider::from_resolved(
                &resolved,
                &selector.model,
                retry,
            )?),
            ProviderType::Ollama => Arc::new(OllamaProvider::from_resolved(
                &resolved,
                &selector.model,
                retry,
            )?),
        };

        Ok(provider)
    }
}

/// Gateway that opens one session per request
#[derive(Clone)]
pub struct Gateway {
    factory: Arc<dyn ProviderFactory>,
}

impl Gateway {
    /// Create a gateway over any provider factory
    pub fn new(factory: Arc<dyn ProviderFactory>) -> Self {
        Self { factory }
    }

    /// Create a gateway from resolved configuration layers
    pub fn from_config(config: &ResolvedConfig) -> Self {
        let factory = ConfiguredProviderFactory::new(
            config.providers().clone(),
            RetryConfig::from(config.retry()),
        );
        Self::new(Arc::new(factory))
    }

    /// Send one request in a fresh session, tearing it down afterwards
    pub async fn request(
        &self,
        selector: &ModelSelector,
        system: &str,
        payload: impl Into<String>,
    ) -> Result<ProviderResponse, ProviderError> {
        let session = GenerationSession::open(self.factory.as_ref(), selector)?;
        let result = session.send(system, payload).await;
        session.close();

        if let Ok(response) = &result {
            debug!(
                model = %response.model,
                input_tokens = response.usage.input_tokens,
                output_tokens = response.usage.output_tokens,
                "request completed"
            );
        }
        result
    }
}

impl std::fmt::Debug for Gateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Gateway").finish_non_exhaustive()
    }
}
