//! Configuration Loader
//!
//! CommitForge 설정 로더 (`settings.json`)
//!
//! ## 검색 우선순위 (낮은 → 높은)
//!
//! 1. Built-in default
//! 2. User-level: `<config_dir>/commitforge/settings.json`
//! 3. Repository-level: `<repo>/.commitforge/settings.json`
//! 4. Explicit override (`--provider` / `--model`)

use super::types::{ComposeSettings, ModelSelector, RetrySettings, Settings, TaskKind, SETTINGS_FILE};
use crate::registry::{ProviderConfig, ProviderType};
use crate::storage::{strip_json_comments, GLOBAL_DIR_NAME, PROJECT_DIR_NAME};
use crate::{Error, Result};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

// ============================================================================
// ConfigSource
// ============================================================================

/// 설정 값의 출처
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ConfigSource {
    Default,
    Global,
    Repository,
    Override,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ConfigSource::Default => "built-in default",
            ConfigSource::Global => "user settings",
            ConfigSource::Repository => "repository settings",
            ConfigSource::Override => "command line",
        };
        f.write_str(name)
    }
}

/// 명령행에서 전달된 모델 오버라이드 (둘 다 선택적)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModelOverride {
    pub provider: Option<String>,
    pub model: Option<String>,
}

impl ModelOverride {
    pub fn is_empty(&self) -> bool {
        self.provider.is_none() && self.model.is_none()
    }
}

/// 확정된 모델 선택과 그 출처
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedModel {
    pub selector: ModelSelector,
    pub source: ConfigSource,
}

// ============================================================================
// ConfigLoader - 설정 로더
// ============================================================================

/// 설정 파일 경로 정보
#[derive(Debug, Clone)]
struct ConfigPath {
    path: PathBuf,
    source: ConfigSource,
}

/// 설정 로더
pub struct ConfigLoader {
    /// 검색 경로 (우선순위 오름차순)
    search_paths: Vec<ConfigPath>,
}

impl ConfigLoader {
    /// 새 로더 생성 (기본 검색 경로)
    pub fn new(repo_root: &Path) -> Self {
        let global = dirs::config_dir().map(|dir| dir.join(GLOBAL_DIR_NAME).join(SETTINGS_FILE));
        let repository = repo_root.join(PROJECT_DIR_NAME).join(SETTINGS_FILE);
        Self::with_paths(global, Some(repository))
    }

    /// 커스텀 경로로 생성
    pub fn with_paths(global: Option<PathBuf>, repository: Option<PathBuf>) -> Self {
        let mut search_paths = Vec::new();
        if let Some(path) = global {
            search_paths.push(ConfigPath {
                path,
                source: ConfigSource::Global,
            });
        }
        if let Some(path) = repository {
            search_paths.push(ConfigPath {
                path,
                source: ConfigSource::Repository,
            });
        }
        search_paths.sort_by_key(|p| p.source);
        Self { search_paths }
    }

    /// 특정 출처의 파일 경로
    pub fn path_for(&self, source: ConfigSource) -> Option<&Path> {
        self.search_paths
            .iter()
            .find(|p| p.source == source)
            .map(|p| p.path.as_path())
    }

    /// 모든 경로에서 설정 로드
    ///
    /// 읽을 수 없는 파일은 경고 후 건너뜁니다.
    pub fn load(&self) -> ResolvedConfig {
        let mut layers = Vec::new();

        for config_path in &self.search_paths {
            if !config_path.path.exists() {
                continue;
            }
            match load_settings_from_file(&config_path.path) {
                Ok(settings) => {
                    info!(
                        "Loaded {} from: {}",
                        config_path.source,
                        config_path.path.display()
                    );
                    layers.push((config_path.source, settings));
                }
                Err(e) => {
                    warn!(
                        "Failed to load settings from {}: {}",
                        config_path.path.display(),
                        e
                    );
                }
            }
        }

        ResolvedConfig::from_layers(layers)
    }
}

/// 파일에서 설정 로드
pub fn load_settings_from_file(path: &Path) -> Result<Settings> {
    let content = std::fs::read_to_string(path)?;
    let content = strip_json_comments(&content);

    let settings: Settings = serde_json::from_str(&content).map_err(|e| {
        Error::Config(format!("Invalid settings.json at {}: {}", path.display(), e))
    })?;

    debug!(
        "Loaded config from {}: {} providers",
        path.display(),
        settings.providers.providers.len()
    );

    Ok(settings)
}

// ============================================================================
// ResolvedConfig - 병합 결과
// ============================================================================

/// 레이어별 설정을 보존한 병합 결과
#[derive(Debug, Clone, Default)]
pub struct ResolvedConfig {
    /// (출처, 설정) - 우선순위 오름차순
    layers: Vec<(ConfigSource, Settings)>,
    providers: ProviderConfig,
    compose: ComposeSettings,
    retry: RetrySettings,
}

impl ResolvedConfig {
    pub fn from_layers(mut layers: Vec<(ConfigSource, Settings)>) -> Self {
        layers.sort_by_key(|(source, _)| *source);

        let mut providers = ProviderConfig::new();
        let mut compose = ComposeSettings::default();
        let mut retry = RetrySettings::default();

        for (_, settings) in &layers {
            providers.merge(settings.providers.clone());
            if let Some(c) = &settings.compose {
                compose = c.clone();
            }
            if let Some(r) = &settings.retry {
                retry = r.clone();
            }
        }

        Self {
            layers,
            providers,
            compose,
            retry,
        }
    }

    pub fn providers(&self) -> &ProviderConfig {
        &self.providers
    }

    pub fn compose(&self) -> &ComposeSettings {
        &self.compose
    }

    pub fn retry(&self) -> &RetrySettings {
        &self.retry
    }

    /// 파일 레이어만 고려한 작업별 모델 (override 제외)
    fn layered_model(&self, task: TaskKind) -> ResolvedModel {
        self.layers
            .iter()
            .rev()
            .find_map(|(source, settings)| {
                settings.models.get(task).map(|selector| ResolvedModel {
                    selector: selector.clone(),
                    source: *source,
                })
            })
            .unwrap_or_else(|| ResolvedModel {
                selector: ModelSelector::builtin_default(),
                source: ConfigSource::Default,
            })
    }

    /// 작업별 모델 확정: override > repository > global > default
    pub fn resolve_model(&self, task: TaskKind, overrides: &ModelOverride) -> ResolvedModel {
        let base = self.layered_model(task);
        if overrides.is_empty() {
            return base;
        }

        let selector = match (&overrides.provider, &overrides.model) {
            (Some(provider), Some(model)) => ModelSelector::new(provider, model),
            (None, Some(model)) => ModelSelector::new(&base.selector.provider, model),
            (Some(provider), None) if *provider == base.selector.provider => {
                base.selector.clone()
            }
            (Some(provider), None) => {
                ModelSelector::new(provider, self.default_model_for(provider))
            }
            (None, None) => base.selector.clone(),
        };

        ResolvedModel {
            selector,
            source: ConfigSource::Override,
        }
    }

    /// 프로바이더 이름에 대한 기본 모델
    fn default_model_for(&self, provider: &str) -> &'static str {
        self.providers
            .get(provider)
            .and_then(|s| s.provider_type)
            .or_else(|| provider.parse::<ProviderType>().ok())
            .unwrap_or_default()
            .default_model()
    }
}
