//! LLM 프로바이더 등록 정보

mod provider;
mod provider_type;

pub use provider::{ProviderConfig, ProviderSettings, ResolvedProvider};
pub use provider_type::ProviderType;
