//! Per-invocation context: repository, resolved settings and gateway

use crate::Args;
use commitforge_core::{GitOps, Vcs};
use commitforge_foundation::{ConfigLoader, ModelOverride, ModelSelector, ResolvedConfig, TaskKind};
use commitforge_provider::Gateway;
use std::path::PathBuf;
use tracing::debug;

pub fn overrides(args: &Args) -> ModelOverride {
    ModelOverride {
        provider: args.provider.clone(),
        model: args.model.clone(),
    }
}

/// Repository root when inside one, else the current directory
pub fn settings_root() -> PathBuf {
    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    match GitOps::new(&cwd) {
        Ok(git) => git.root().to_path_buf(),
        Err(_) => cwd,
    }
}

pub struct AppContext {
    pub git: GitOps,
    pub config: ResolvedConfig,
    pub gateway: Gateway,
    overrides: ModelOverride,
}

impl AppContext {
    pub fn open(overrides: ModelOverride) -> anyhow::Result<Self> {
        let cwd = std::env::current_dir()?;
        let git = GitOps::new(&cwd)?;
        let config = ConfigLoader::new(git.root()).load();
        let gateway = Gateway::from_config(&config);

        Ok(Self {
            git,
            config,
            gateway,
            overrides,
        })
    }

    pub fn selector(&self, task: TaskKind) -> ModelSelector {
        let resolved = self.config.resolve_model(task, &self.overrides);
        debug!(task = %task, selector = %resolved.selector, source = %resolved.source, "model resolved");
        resolved.selector
    }

    pub fn max_diff_chars(&self) -> usize {
        self.config.compose().max_diff_chars
    }

    /// Recent subjects as a style hint; an empty or unborn history is fine
    pub fn recent_subjects(&self, count: usize) -> Vec<String> {
        self.git
            .log(None, Some(count))
            .map(|entries| entries.into_iter().map(|e| e.subject).collect())
            .unwrap_or_default()
    }
}
