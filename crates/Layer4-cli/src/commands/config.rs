//! `commitforge config`

use super::Outcome;
use crate::app::settings_root;
use commitforge_foundation::{
    ConfigLoader, ConfigSource, JsonStore, ModelOverride, ModelSelector, Settings, TaskKind,
    SETTINGS_FILE,
};

pub fn show(overrides: &ModelOverride) -> anyhow::Result<Outcome> {
    let root = settings_root();
    let loader = ConfigLoader::new(&root);
    let config = loader.load();

    for task in TaskKind::ALL {
        let resolved = config.resolve_model(task, overrides);
        println!("{:<10} {:<40} ({})", task, resolved.selector.to_string(), resolved.source);
    }

    println!();
    for source in [ConfigSource::Repository, ConfigSource::Global] {
        if let Some(path) = loader.path_for(source) {
            let state = if path.exists() { "" } else { " (not present)" };
            println!("{:<22} {}{}", format!("{source}:"), path.display(), state);
        }
    }
    Ok(Outcome::Done)
}

pub fn set_model(task: &str, provider: &str, model: &str, global: bool) -> anyhow::Result<Outcome> {
    let task: TaskKind = task.parse()?;
    let store = if global {
        JsonStore::global()?
    } else {
        JsonStore::project(settings_root())
    };

    write_model(&store, task, ModelSelector::new(provider, model))?;
    println!(
        "{} now uses {}/{} ({})",
        task,
        provider,
        model,
        store.file_path(SETTINGS_FILE).display()
    );
    Ok(Outcome::Done)
}

/// Update one selector, leaving the rest of the file as it was
fn write_model(store: &JsonStore, task: TaskKind, selector: ModelSelector) -> anyhow::Result<()> {
    let mut settings: Settings = store.load_or_default(SETTINGS_FILE)?;
    settings.models.set(task, selector);
    store.save(SETTINGS_FILE, &settings)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_write_model_keeps_other_tasks() {
        let dir = tempdir().unwrap();
        let store = JsonStore::new(dir.path());

        write_model(&store, TaskKind::Message, ModelSelector::new("ollama", "llama3.2")).unwrap();
        write_model(&store, TaskKind::Grouping, ModelSelector::new("openai", "gpt-4o")).unwrap();

        let settings: Settings = store.load(SETTINGS_FILE).unwrap();
        assert_eq!(
            settings.models.get(TaskKind::Message),
            Some(&ModelSelector::new("ollama", "llama3.2"))
        );
        assert_eq!(
            settings.models.get(TaskKind::Grouping).map(|s| s.to_string()),
            Some("openai/gpt-4o".to_string())
        );
        assert!(settings.models.get(TaskKind::Cleanup).is_none());
    }
}
