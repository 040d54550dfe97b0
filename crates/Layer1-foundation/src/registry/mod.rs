//! Registry - 프로바이더 등록/관리
//!
//! - `provider/` - LLM Provider 종류, 자격 증명, 기본값

pub mod provider;

pub use provider::{ProviderConfig, ProviderSettings, ProviderType, ResolvedProvider};
