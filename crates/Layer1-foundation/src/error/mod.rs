//! Error types for CommitForge
//!
//! 설정/저장소 관련 에러를 중앙에서 관리. 컴포넌트별 세부 에러
//! (GitError, ProviderError 등)는 각 크레이트에 정의됩니다.

use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// CommitForge 공통 에러 타입
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // 설정 관련
    // ========================================================================
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Unknown task kind: {0} (expected message, grouping or cleanup)")]
    UnknownTask(String),

    // ========================================================================
    // Provider 관련
    // ========================================================================
    #[error("Provider not found: {0}")]
    ProviderNotFound(String),

    #[error("Provider not configured: {0}")]
    ProviderNotConfigured(String),

    // ========================================================================
    // 일반
    // ========================================================================
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    // ========================================================================
    // 외부 에러 변환
    // ========================================================================
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// 사용자 설정 수정으로 해결 가능한 에러인지 확인
    pub fn is_config_problem(&self) -> bool {
        matches!(
            self,
            Error::Config(_)
                | Error::UnknownTask(_)
                | Error::ProviderNotFound(_)
                | Error::ProviderNotConfigured(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_problem_classification() {
        assert!(Error::ProviderNotConfigured("anthropic".into()).is_config_problem());
        assert!(Error::UnknownTask("deploy".into()).is_config_problem());
        assert!(!Error::InvalidInput("x".into()).is_config_problem());
    }

    #[test]
    fn test_unknown_task_message() {
        let err = Error::UnknownTask("deploy".into());
        assert!(err.to_string().contains("message, grouping or cleanup"));
    }
}
