//! # Configuration System
//!
//! 작업(task)별 모델 선택과 프로바이더 자격 증명을 관리합니다.
//!
//! ## 설정 우선순위 (낮은 → 높은)
//!
//! 1. Built-in default
//! 2. User-level: `<config_dir>/commitforge/settings.json`
//! 3. Repository-level: `.commitforge/settings.json`
//! 4. Command line override
//!
//! ## 사용 예시
//!
//! ```ignore
//! use commitforge_foundation::config::{ConfigLoader, ModelOverride, TaskKind};
//!
//! let config = ConfigLoader::new(repo_root).load();
//! let grouping = config.resolve_model(TaskKind::Grouping, &ModelOverride::default());
//! println!("grouping uses {} ({})", grouping.selector, grouping.source);
//! ```

mod loader;
mod types;

pub use loader::{
    load_settings_from_file, ConfigLoader, ConfigSource, ModelOverride, ResolvedConfig,
    ResolvedModel,
};
pub use types::{
    ComposeSettings, ModelSelector, ModelsSection, RetrySettings, Settings, TaskKind,
    SETTINGS_FILE,
};
