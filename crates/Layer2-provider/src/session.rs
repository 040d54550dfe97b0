//! Per-request generation session
//!
//! A session is opened for exactly one request and torn down as soon as the
//! response has been extracted. Sessions are never shared or reused, so no
//! context leaks between requests. Teardown runs on `close()` and also on
//! drop (early return, error, or a cancelled future).

use crate::{Message, Provider, ProviderError, ProviderResponse};
use commitforge_foundation::ModelSelector;
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;
use uuid::Uuid;

/// Builds a provider bound to a model selector
pub trait ProviderFactory: Send + Sync {
    fn create(&self, selector: &ModelSelector) -> Result<Arc<dyn Provider>, ProviderError>;
}

/// One live request against the generation collaborator
pub struct GenerationSession {
    id: Uuid,
    selector: ModelSelector,
    provider: Arc<dyn Provider>,
    opened_at: Instant,
    closed: bool,
}

impl GenerationSession {
    /// Open a fresh session for `selector`
    pub fn open(
        factory: &dyn ProviderFactory,
        selector: &ModelSelector,
    ) -> Result<Self, ProviderError> {
        let provider = factory.create(selector)?;
        let session = Self {
            id: Uuid::new_v4(),
            selector: selector.clone(),
            provider,
            opened_at: Instant::now(),
            closed: false,
        };
        debug!(session = %session.id, model = %session.selector, "generation session opened");
        Ok(session)
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn selector(&self) -> &ModelSelector {
        &self.selector
    }

    /// Send system instructions plus a structured payload
    pub async fn send(
        &self,
        system: &str,
        payload: impl Into<String>,
    ) -> Result<ProviderResponse, ProviderError> {
        self.provider
            .complete(vec![Message::user(payload)], Some(system.to_string()))
            .await
    }

    /// Explicit teardown
    pub fn close(mut self) {
        self.teardown();
    }

    fn teardown(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        debug!(
            session = %self.id,
            elapsed_ms = self.opened_at.elapsed().as_millis() as u64,
            "generation session closed"
        );
    }
}

impl Drop for GenerationSession {
    fn drop(&mut self) {
        self.teardown();
    }
}

impl std::fmt::Debug for GenerationSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GenerationSession")
            .field("id", &self.id)
            .field("selector", &self.selector)
            .field("closed", &self.closed)
            .finish()
    }
}
