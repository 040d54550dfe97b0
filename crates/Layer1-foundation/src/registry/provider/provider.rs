use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::provider_type::ProviderType;

/// 개별 프로바이더 설정 (settings.json의 `providers.<name>`)
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct ProviderSettings {
    /// 프로바이더 타입 (생략 시 이름에서 추론)
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub provider_type: Option<ProviderType>,

    /// 활성화 여부
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// API 키
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Base URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,

    /// 최대 출력 토큰
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,

    /// 타임아웃 (초)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
}

fn default_true() -> bool {
    true
}

impl ProviderSettings {
    pub fn new(provider_type: ProviderType) -> Self {
        Self {
            provider_type: Some(provider_type),
            enabled: true,
            ..Default::default()
        }
    }

    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// later(self)가 earlier를 오버라이드
    fn merged_over(self, earlier: ProviderSettings) -> ProviderSettings {
        ProviderSettings {
            provider_type: self.provider_type.or(earlier.provider_type),
            enabled: self.enabled,
            api_key: self.api_key.or(earlier.api_key),
            base_url: self.base_url.or(earlier.base_url),
            max_tokens: self.max_tokens.or(earlier.max_tokens),
            timeout_secs: self.timeout_secs.or(earlier.timeout_secs),
        }
    }
}

/// 실제 연결에 사용할 확정된 프로바이더 정보
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedProvider {
    pub name: String,
    pub provider_type: ProviderType,
    pub api_key: Option<String>,
    pub base_url: String,
    pub max_tokens: u32,
    pub timeout_secs: u64,
}

/// 이름 → 프로바이더 설정 모음
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(transparent)]
pub struct ProviderConfig {
    pub providers: HashMap<String, ProviderSettings>,
}

impl ProviderConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// 프로바이더 추가
    pub fn add(&mut self, name: impl Into<String>, settings: ProviderSettings) {
        self.providers.insert(name.into(), settings);
    }

    /// 프로바이더 조회
    pub fn get(&self, name: &str) -> Option<&ProviderSettings> {
        self.providers.get(name)
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    /// 다른 설정을 위에 병합 (later 우선, 필드 단위)
    pub fn merge(&mut self, later: ProviderConfig) {
        for (name, settings) in later.providers {
            let merged = match self.providers.remove(&name) {
                Some(earlier) => settings.merged_over(earlier),
                None => settings,
            };
            self.providers.insert(name, merged);
        }
    }

    /// 프로세스 환경변수를 사용해 확정
    pub fn resolve(&self, name: &str) -> Result<ResolvedProvider> {
        self.resolve_with(name, |key| std::env::var(key).ok())
    }

    /// 환경변수 조회 함수를 주입해 확정 (설정 파일 > 환경변수 > 기본값)
    pub fn resolve_with(
        &self,
        name: &str,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<ResolvedProvider> {
        let settings = self.providers.get(name).cloned().unwrap_or_default();

        if self.providers.contains_key(name) && !settings.enabled {
            return Err(Error::ProviderNotConfigured(format!(
                "{} is disabled in settings",
                name
            )));
        }

        let provider_type = match settings.provider_type {
            Some(t) => t,
            None => name.parse::<ProviderType>()?,
        };

        let api_key = settings
            .api_key
            .or_else(|| provider_type.api_key_env().and_then(&env))
            .filter(|k| !k.trim().is_empty());

        if provider_type.requires_api_key() && api_key.is_none() {
            let hint = provider_type
                .api_key_env()
                .map(|var| format!(" (set {} or providers.{}.api_key)", var, name))
                .unwrap_or_default();
            return Err(Error::ProviderNotConfigured(format!(
                "{} requires an API key{}",
                name, hint
            )));
        }

        let base_url = settings
            .base_url
            .or_else(|| provider_type.base_url_env().and_then(&env))
            .unwrap_or_else(|| provider_type.default_base_url().to_string());

        Ok(ResolvedProvider {
            name: name.to_string(),
            provider_type,
            api_key,
            base_url,
            max_tokens: settings
                .max_tokens
                .unwrap_or_else(|| provider_type.default_max_tokens()),
            timeout_secs: settings
                .timeout_secs
                .unwrap_or_else(|| provider_type.default_timeout()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn test_resolve_uses_env_key() {
        let config = ProviderConfig::new();
        let resolved = config
            .resolve_with("anthropic", |k| {
                (k == "ANTHROPIC_API_KEY").then(|| "sk-test".to_string())
            })
            .unwrap();

        assert_eq!(resolved.provider_type, ProviderType::Anthropic);
        assert_eq!(resolved.api_key.as_deref(), Some("sk-test"));
        assert_eq!(resolved.base_url, "https://api.anthropic.com");
    }

    #[test]
    fn test_resolve_missing_key_is_config_error() {
        let err = ProviderConfig::new()
            .resolve_with("openai", no_env)
            .unwrap_err();
        assert!(err.is_config_problem());
        assert!(err.to_string().contains("OPENAI_API_KEY"));
    }

    #[test]
    fn test_resolve_custom_name_with_type() {
        let mut config = ProviderConfig::new();
        config.add(
            "local",
            ProviderSettings::new(ProviderType::Ollama).base_url("http://gpu-box:11434"),
        );

        let resolved = config.resolve_with("local", no_env).unwrap();
        assert_eq!(resolved.provider_type, ProviderType::Ollama);
        assert_eq!(resolved.base_url, "http://gpu-box:11434");
        assert_eq!(resolved.timeout_secs, 600);
    }

    #[test]
    fn test_merge_is_field_wise() {
        let mut global = ProviderConfig::new();
        global.add(
            "anthropic",
            ProviderSettings::new(ProviderType::Anthropic).api_key("global-key"),
        );

        let mut project = ProviderConfig::new();
        project.add(
            "anthropic",
            ProviderSettings {
                max_tokens: Some(1024),
                enabled: true,
                ..Default::default()
            },
        );

        global.merge(project);
        let merged = global.get("anthropic").unwrap();
        assert_eq!(merged.api_key.as_deref(), Some("global-key"));
        assert_eq!(merged.max_tokens, Some(1024));
    }

    #[test]
    fn test_disabled_provider_rejected() {
        let mut config = ProviderConfig::new();
        let mut settings = ProviderSettings::new(ProviderType::Ollama);
        settings.enabled = false;
        config.add("ollama", settings);

        assert!(config.resolve_with("ollama", no_env).is_err());
    }
}
