//! # commitforge-foundation
//!
//! Foundation layer for CommitForge:
//! - Error: 공통 에러 타입
//! - Config: 작업별 모델 선택 (override > repository > global > default)
//! - Registry: LLM Provider 종류 및 자격 증명
//! - Storage: JsonStore (settings.json 읽기/쓰기)

pub mod config;
pub mod error;
pub mod registry;
pub mod storage;

// ============================================================================
// Error
// ============================================================================
pub use error::{Error, Result};

// ============================================================================
// Config (설정)
// ============================================================================
pub use config::{
    ComposeSettings, ConfigLoader, ConfigSource, ModelOverride, ModelSelector, ResolvedConfig,
    ResolvedModel, RetrySettings, Settings, TaskKind, SETTINGS_FILE,
};

// ============================================================================
// Registry (레지스트리)
// ============================================================================
pub use registry::{ProviderConfig, ProviderSettings, ProviderType, ResolvedProvider};

// ============================================================================
// Storage (저장소)
// ============================================================================
pub use storage::{JsonStore, GLOBAL_DIR_NAME, PROJECT_DIR_NAME};
