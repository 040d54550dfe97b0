//! Provider-specific error types
//!
//! ProviderError는 생성(LLM) 협력자 관련 세부 에러를 관리합니다.
//! 인증 실패는 일반 실패와 구분되어 호출자가 안내 메시지를 줄 수 있습니다.

use crate::retry::{RetryClassification, RetryableError};
use commitforge_foundation::Error as FoundationError;
use thiserror::Error;

/// Errors that can occur during provider operations
#[derive(Error, Debug, Clone)]
pub enum ProviderError {
    /// API key is missing, invalid or lacks permission
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// Rate limit exceeded
    #[error("Rate limit exceeded{}", .retry_after_ms.map(|ms| format!(", retry after {}ms", ms)).unwrap_or_default())]
    RateLimited { retry_after_ms: Option<u64> },

    /// Context length exceeded
    #[error("Context length exceeded: {0}")]
    ContextLengthExceeded(String),

    /// Server error (5xx)
    #[error("Server error: {0}")]
    ServerError(String),

    /// Network error (connection failed, DNS, timeout, etc.)
    #[error("Network error: {0}")]
    Network(String),

    /// Invalid request (bad parameters)
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Invalid response from API
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Model not found or not available
    #[error("Model not available: {0}")]
    ModelNotAvailable(String),

    /// Provider not configured
    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    /// Unknown error
    #[error("Unknown error: {0}")]
    Unknown(String),
}

impl ProviderError {
    /// Create from HTTP status code and body
    pub fn from_http_status(status: u16, body: &str) -> Self {
        match status {
            401 | 403 => ProviderError::Authentication(body.to_string()),
            429 => ProviderError::RateLimited {
                retry_after_ms: extract_retry_after(body),
            },
            400 => {
                if body.contains("context") || body.contains("too long") {
                    ProviderError::ContextLengthExceeded(body.to_string())
                } else {
                    ProviderError::InvalidRequest(body.to_string())
                }
            }
            404 => ProviderError::ModelNotAvailable(body.to_string()),
            500..=599 => ProviderError::ServerError(body.to_string()),
            _ => ProviderError::Unknown(format!("HTTP {}: {}", status, body)),
        }
    }

    /// Authentication/authorization failure (as opposed to a generic failure)
    pub fn is_auth(&self) -> bool {
        matches!(self, ProviderError::Authentication(_))
    }
}

impl From<reqwest::Error> for ProviderError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ProviderError::InvalidResponse(err.to_string())
        } else {
            ProviderError::Network(err.to_string())
        }
    }
}

impl From<FoundationError> for ProviderError {
    fn from(err: FoundationError) -> Self {
        match err {
            FoundationError::ProviderNotFound(name) => {
                ProviderError::NotConfigured(format!("unknown provider '{}'", name))
            }
            other => ProviderError::NotConfigured(other.to_string()),
        }
    }
}

impl RetryableError for ProviderError {
    fn classify(&self) -> RetryClassification {
        match self {
            ProviderError::RateLimited { retry_after_ms } => RetryClassification::RateLimited {
                retry_after_ms: *retry_after_ms,
            },
            ProviderError::ServerError(_) | ProviderError::Network(_) => {
                RetryClassification::Retry
            }
            _ => RetryClassification::NoRetry,
        }
    }
}

/// Try to extract retry-after value from error body (in milliseconds)
fn extract_retry_after(body: &str) -> Option<u64> {
    let json = serde_json::from_str::<serde_json::Value>(body).ok()?;
    json.get("error")
        .and_then(|e| e.get("retry_after"))
        .and_then(|v| v.as_f64())
        .map(|secs| (secs * 1000.0) as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_statuses() {
        assert!(ProviderError::from_http_status(401, "bad key").is_auth());
        assert!(ProviderError::from_http_status(403, "forbidden").is_auth());
        assert!(!ProviderError::from_http_status(500, "oops").is_auth());
    }

    #[test]
    fn test_rate_limit_retry_after() {
        let err = ProviderError::from_http_status(429, r#"{"error":{"retry_after":1.5}}"#);
        match err {
            ProviderError::RateLimited { retry_after_ms } => {
                assert_eq!(retry_after_ms, Some(1500))
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_auth_is_not_retried() {
        assert_eq!(
            ProviderError::Authentication("x".into()).classify(),
            RetryClassification::NoRetry
        );
        assert_eq!(
            ProviderError::ServerError("x".into()).classify(),
            RetryClassification::Retry
        );
    }
}
