use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// 프로바이더 종류
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ProviderType {
    #[default]
    Anthropic,
    Openai,
    Groq,
    Ollama,
}

impl ProviderType {
    /// 전체 목록
    pub const ALL: [ProviderType; 4] = [
        ProviderType::Anthropic,
        ProviderType::Openai,
        ProviderType::Groq,
        ProviderType::Ollama,
    ];

    /// 식별자 (설정 파일에서 사용)
    pub fn id(&self) -> &'static str {
        match self {
            Self::Anthropic => "anthropic",
            Self::Openai => "openai",
            Self::Groq => "groq",
            Self::Ollama => "ollama",
        }
    }

    /// 표시 이름
    pub fn name(&self) -> &'static str {
        match self {
            Self::Anthropic => "Anthropic",
            Self::Openai => "OpenAI",
            Self::Groq => "Groq",
            Self::Ollama => "Ollama",
        }
    }

    /// API Key 필요 여부
    pub fn requires_api_key(&self) -> bool {
        !matches!(self, Self::Ollama)
    }

    /// API Key 환경변수
    pub fn api_key_env(&self) -> Option<&'static str> {
        match self {
            Self::Anthropic => Some("ANTHROPIC_API_KEY"),
            Self::Openai => Some("OPENAI_API_KEY"),
            Self::Groq => Some("GROQ_API_KEY"),
            Self::Ollama => None,
        }
    }

    /// Base URL 환경변수
    pub fn base_url_env(&self) -> Option<&'static str> {
        match self {
            Self::Ollama => Some("OLLAMA_HOST"),
            _ => None,
        }
    }

    /// 기본 Base URL
    pub fn default_base_url(&self) -> &'static str {
        match self {
            Self::Anthropic => "https://api.anthropic.com",
            Self::Openai => "https://api.openai.com",
            Self::Groq => "https://api.groq.com/openai",
            Self::Ollama => "http://localhost:11434",
        }
    }

    /// 기본 모델
    pub fn default_model(&self) -> &'static str {
        match self {
            Self::Anthropic => "claude-sonnet-4-20250514",
            Self::Openai => "gpt-4o",
            Self::Groq => "llama-3.3-70b-versatile",
            Self::Ollama => "llama3",
        }
    }

    /// 기본 max_tokens
    pub fn default_max_tokens(&self) -> u32 {
        match self {
            Self::Openai => 4096,
            _ => 8192,
        }
    }

    /// 기본 타임아웃 (초)
    pub fn default_timeout(&self) -> u64 {
        match self {
            Self::Ollama => 600,
            Self::Groq => 60,
            _ => 300,
        }
    }
}

impl std::fmt::Display for ProviderType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.id())
    }
}

impl FromStr for ProviderType {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.id().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| crate::Error::ProviderNotFound(s.to_string()))
    }
}
