//! 설정 타입 정의 (settings.json)

use crate::registry::{ProviderConfig, ProviderType};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// 설정 파일명
pub const SETTINGS_FILE: &str = "settings.json";

// ============================================================================
// TaskKind / ModelSelector
// ============================================================================

/// 생성 작업 종류 - 작업마다 다른 모델을 지정할 수 있음
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskKind {
    /// 단일 커밋 메시지 생성
    Message,
    /// 변경사항을 여러 커밋으로 묶는 분석
    Grouping,
    /// 정리(cleanup) 패치 생성
    Cleanup,
}

impl TaskKind {
    pub const ALL: [TaskKind; 3] = [TaskKind::Message, TaskKind::Grouping, TaskKind::Cleanup];

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskKind::Message => "message",
            TaskKind::Grouping => "grouping",
            TaskKind::Cleanup => "cleanup",
        }
    }
}

impl std::fmt::Display for TaskKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        TaskKind::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| Error::UnknownTask(s.to_string()))
    }
}

/// 작업별 모델 선택 `{provider, model}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelSelector {
    pub provider: String,
    pub model: String,
}

impl ModelSelector {
    pub fn new(provider: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            model: model.into(),
        }
    }

    /// 내장 기본값
    pub fn builtin_default() -> Self {
        let provider = ProviderType::default();
        Self::new(provider.id(), provider.default_model())
    }
}

impl std::fmt::Display for ModelSelector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.provider, self.model)
    }
}

// ============================================================================
// Sections
// ============================================================================

/// 작업별 모델 섹션
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelsSection {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<ModelSelector>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grouping: Option<ModelSelector>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cleanup: Option<ModelSelector>,
}

impl ModelsSection {
    pub fn get(&self, task: TaskKind) -> Option<&ModelSelector> {
        match task {
            TaskKind::Message => self.message.as_ref(),
            TaskKind::Grouping => self.grouping.as_ref(),
            TaskKind::Cleanup => self.cleanup.as_ref(),
        }
    }

    pub fn set(&mut self, task: TaskKind, selector: ModelSelector) {
        let slot = match task {
            TaskKind::Message => &mut self.message,
            TaskKind::Grouping => &mut self.grouping,
            TaskKind::Cleanup => &mut self.cleanup,
        };
        *slot = Some(selector);
    }
}

/// compose 동작 설정
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComposeSettings {
    /// 파일별 diff를 요청에 포함할 최대 문자 수
    #[serde(default = "default_max_diff_chars")]
    pub max_diff_chars: usize,

    /// 검토 없이 바로 적용
    #[serde(default)]
    pub auto_apply: bool,
}

fn default_max_diff_chars() -> usize {
    6000
}

impl Default for ComposeSettings {
    fn default() -> Self {
        Self {
            max_diff_chars: default_max_diff_chars(),
            auto_apply: false,
        }
    }
}

/// 재시도 설정
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrySettings {
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    #[serde(default = "default_initial_delay_ms")]
    pub initial_delay_ms: u64,
}

fn default_max_retries() -> u32 {
    2
}

fn default_initial_delay_ms() -> u64 {
    1000
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            initial_delay_ms: default_initial_delay_ms(),
        }
    }
}

// ============================================================================
// Settings (파일 하나의 내용)
// ============================================================================

/// settings.json 한 개의 내용. 모든 섹션은 선택적
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub models: ModelsSection,

    #[serde(default, skip_serializing_if = "ProviderConfig::is_empty")]
    pub providers: ProviderConfig,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compose: Option<ComposeSettings>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry: Option<RetrySettings>,
}
