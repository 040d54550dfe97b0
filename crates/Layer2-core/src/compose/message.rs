//! Commit message generation
//!
//! A single conventional-commit message for the staged diff, plus the
//! heuristic fallback used when the collaborator returns nothing usable
//! (also used to label repaired drafts).

use super::synthesizer::{truncate_diff, SynthesisError};
use commitforge_foundation::ModelSelector;
use commitforge_provider::Gateway;
use std::path::Path;
use tracing::{debug, warn};

// ============================================================================
// Heuristics
// ============================================================================

/// Build `type: summary` from a unified diff without any collaborator
pub fn heuristic_message(diff: &str) -> String {
    format!("{}: {}", analyze_diff_type(diff), summarize_changes(diff))
}

fn changed_files(diff: &str) -> Vec<&str> {
    diff.lines()
        .filter(|line| line.starts_with("diff --git"))
        .filter_map(|line| line.rsplit(" b/").next())
        .collect()
}

fn all_match(files: &[&str], pred: impl Fn(&str) -> bool) -> bool {
    !files.is_empty() && files.iter().all(|&f| pred(f))
}

/// Analyze diff to determine commit type (feat, fix, refactor, etc.)
fn analyze_diff_type(diff: &str) -> &'static str {
    let files = changed_files(diff);

    if all_match(&files, |f| f.contains("test") || f.contains("spec")) {
        return "test";
    }

    if all_match(&files, |f| {
        f.ends_with(".md") || f.contains("README") || f.starts_with("docs/")
    }) {
        return "docs";
    }

    if all_match(&files, |f| {
        f.ends_with(".toml")
            || f.ends_with(".json")
            || f.ends_with(".yaml")
            || f.ends_with(".yml")
            || f.ends_with(".lock")
            || f.starts_with('.')
    }) {
        return "chore";
    }

    let added: String = diff
        .lines()
        .filter(|l| l.starts_with('+') && !l.starts_with("+++"))
        .collect::<Vec<_>>()
        .join("\n")
        .to_lowercase();
    let removed_lines = diff
        .lines()
        .filter(|l| l.starts_with('-') && !l.starts_with("---"))
        .count();

    if added.contains("fix") || added.contains("bug") || added.contains("error") {
        return "fix";
    }

    if added.contains("refactor") || added.contains("rename") {
        return "refactor";
    }

    if added.contains("perf") || added.contains("optim") {
        return "perf";
    }

    if !added.is_empty() && removed_lines == 0 {
        return "feat";
    }

    "chore"
}

/// Summarize changes from diff
fn summarize_changes(diff: &str) -> String {
    let files = changed_files(diff);
    let mut additions = 0;
    let mut deletions = 0;

    for line in diff.lines() {
        if line.starts_with('+') && !line.starts_with("+++") {
            additions += 1;
        } else if line.starts_with('-') && !line.starts_with("---") {
            deletions += 1;
        }
    }

    let file_name = |file: &str| {
        Path::new(file)
            .file_name()
            .map(|f| f.to_string_lossy().to_string())
            .unwrap_or_else(|| file.to_string())
    };

    match files.len() {
        0 => "update files".to_string(),
        1 => {
            let name = file_name(files[0]);
            if diff.contains("new file mode") || (additions > 0 && deletions == 0) {
                format!("add {}", name)
            } else if diff.contains("deleted file mode") {
                format!("remove {}", name)
            } else {
                format!("update {}", name)
            }
        }
        2 | 3 => {
            let names: Vec<String> = files.iter().map(|&f| file_name(f)).collect();
            format!("update {}", names.join(", "))
        }
        n => format!("update {} files", n),
    }
}

// ============================================================================
// MessageGenerator
// ============================================================================

const MESSAGE_PROMPT: &str = r#"You write git commit messages.

Rules:
1. Use conventional commit format: type(scope): description
2. Types: feat, fix, docs, style, refactor, perf, test, chore
3. Keep the first line under 72 characters
4. Use imperative mood ("add" not "added")
5. Add a short body only when the change needs explanation

Respond with only the commit message, nothing else."#;

/// Generates one commit message for a staged diff
pub struct MessageGenerator {
    gateway: Gateway,
    selector: ModelSelector,
    max_diff_chars: usize,
}

impl MessageGenerator {
    pub fn new(gateway: Gateway, selector: ModelSelector, max_diff_chars: usize) -> Self {
        Self {
            gateway,
            selector,
            max_diff_chars,
        }
    }

    pub async fn generate(
        &self,
        staged_diff: &str,
        recent_subjects: &[String],
    ) -> Result<String, SynthesisError> {
        let (diff, truncated) = truncate_diff(staged_diff, self.max_diff_chars);
        if truncated {
            debug!(bytes = staged_diff.len(), "staged diff truncated for message request");
        }

        let mut payload = String::new();
        if !recent_subjects.is_empty() {
            payload.push_str("Recent commit subjects (match their style):\n");
            for subject in recent_subjects {
                payload.push_str("- ");
                payload.push_str(subject);
                payload.push('\n');
            }
            payload.push('\n');
        }
        payload.push_str("Diff:\n```diff\n");
        payload.push_str(&diff);
        payload.push_str("\n```\n");

        let response = self
            .gateway
            .request(&self.selector, MESSAGE_PROMPT, payload)
            .await?;

        match clean_message(&response.text()) {
            Some(message) => {
                debug!(subject = %message.lines().next().unwrap_or_default(), "message generated");
                Ok(message)
            }
            None => {
                warn!("empty message from collaborator, using heuristic summary");
                Ok(heuristic_message(staged_diff))
            }
        }
    }
}

/// Strip fences and quotes the model sometimes wraps around the message
fn clean_message(reply: &str) -> Option<String> {
    let mut text = reply.trim();

    if text.starts_with("```") {
        text = text.trim_start_matches('`');
        text = text
            .split_once('\n')
            .map(|(_, rest)| rest)
            .unwrap_or_default();
        text = text.trim_end().trim_end_matches('`').trim();
    }

    let text = text.trim_matches('"').trim();
    if text.is_empty() {
        None
    } else {
        Some(text.to_string())
    }
}
