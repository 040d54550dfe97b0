//! Reversible Patch Workflow
//!
//! Requests a cleanup patch for the staged changes, applies it to the index
//! and reverses it on demand. `git apply --index` stages whatever it touches;
//! paths outside the original staged set are unstaged again so the staging
//! boundary does not move. Staged entries that were already there are never
//! re-added, so unstaged edits stay unstaged.

use crate::compose::{truncate_diff, SynthesisError};
use crate::git::{GitError, LogEntry, Vcs};
use crate::reply::fenced_blocks;
use commitforge_foundation::ModelSelector;
use commitforge_provider::{Gateway, ProviderError};
use std::collections::BTreeSet;
use thiserror::Error;
use tracing::{debug, info, warn};

// ============================================================================
// Types
// ============================================================================

/// A proposed patch and the collaborator's description of it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatchSession {
    pub patch: String,
    pub summary: String,
}

/// Proof that a patch was applied; consumed by `revert`
#[derive(Debug)]
pub struct AppliedPatch {
    session: PatchSession,
    restaged: Vec<String>,
    /// Staged by the patch, then unstaged to keep the boundary
    released: Vec<String>,
}

impl AppliedPatch {
    pub fn session(&self) -> &PatchSession {
        &self.session
    }

    /// Paths that stay staged after applying
    pub fn restaged(&self) -> &[String] {
        &self.restaged
    }

    /// Paths the patch touched outside the staged set; left unstaged
    pub fn released(&self) -> &[String] {
        &self.released
    }

    /// Keep the patch; the token is dropped
    pub fn accept(self) -> PatchSession {
        self.session
    }
}

/// Everything sent to the collaborator
#[derive(Debug, Clone, Default)]
pub struct PatchInputs {
    pub base_ref: String,
    pub staged_diff: String,
    pub base_diff: String,
    pub recent_log: Vec<LogEntry>,
}

#[derive(Debug, Error)]
pub enum PatchError {
    #[error("the patch is malformed: {0}")]
    Malformed(String),

    #[error("the patch does not apply: {0}")]
    ApplyFailed(String),

    #[error("reverting the patch failed: {0}")]
    ReverseFailed(String),

    #[error("the patch is not applied to the index; nothing to revert")]
    NotApplied,

    #[error(transparent)]
    Git(#[from] GitError),

    #[error("restoring the staged set failed; the working tree was left as is")]
    Restage(#[source] GitError),

    #[error("authentication with the generation provider failed: {0}")]
    Authentication(String),

    #[error("cleanup request failed: {0}")]
    Provider(ProviderError),
}

impl From<ProviderError> for PatchError {
    fn from(err: ProviderError) -> Self {
        match SynthesisError::from(err) {
            SynthesisError::Authentication(msg) => PatchError::Authentication(msg),
            SynthesisError::Provider(err) => PatchError::Provider(err),
            other => PatchError::Provider(ProviderError::Unknown(other.to_string())),
        }
    }
}

// ============================================================================
// Patch text
// ============================================================================

const CLEANUP_PROMPT: &str = r#"You review staged changes and remove AI-generated slop before they are committed.

Look for: comments that restate the code, needless defensive checks, debug output,
dead code, inconsistent naming relative to the surrounding code, and stylistic
noise the base branch does not use.

Keep edits minimal and never change behaviour. If nothing needs cleaning, say so
and do not produce a diff.

Otherwise reply with one short paragraph summarizing the cleanup, followed by a
single unified diff (git format, paths relative to the repository root) in a
```diff fenced block that applies on top of the staged changes."#;

const DEFAULT_SUMMARY: &str = "Cleanup patch";

/// Minimal structural check for unified diff text
pub fn looks_like_patch(text: &str) -> bool {
    let mut minus = false;
    let mut plus = false;
    let mut hunk = false;
    for line in text.lines() {
        if line.starts_with("diff --git ") {
            return true;
        }
        minus |= line.starts_with("--- ");
        plus |= line.starts_with("+++ ");
        hunk |= line.starts_with("@@");
    }
    minus && plus && hunk
}

fn with_trailing_newline(mut patch: String) -> String {
    if !patch.ends_with('\n') {
        patch.push('\n');
    }
    patch
}

fn summary_or_default(text: &str) -> String {
    let summary = text.trim();
    if summary.is_empty() {
        DEFAULT_SUMMARY.to_string()
    } else {
        summary.to_string()
    }
}

/// Split a reply into patch and summary; `None` when it holds no patch
pub fn extract_patch(reply: &str) -> Option<PatchSession> {
    let fenced = fenced_blocks(reply)
        .into_iter()
        .find(|b| looks_like_patch(b.body));

    if let Some(block) = fenced {
        let (start, end) = block.span;
        let outside = format!("{}{}", &reply[..start], &reply[end..]);
        return Some(PatchSession {
            patch: with_trailing_newline(block.body.to_string()),
            summary: summary_or_default(&outside),
        });
    }

    let start = if reply.starts_with("diff --git ") {
        Some(0)
    } else {
        reply.find("\ndiff --git ").map(|i| i + 1)
    };
    if let Some(start) = start {
        let patch = &reply[start..];
        if looks_like_patch(patch) {
            return Some(PatchSession {
                patch: with_trailing_newline(patch.trim_end().to_string()),
                summary: summary_or_default(&reply[..start]),
            });
        }
    }

    None
}

fn classify_check_failure(err: GitError) -> PatchError {
    match err {
        GitError::CommandFailed { stderr, .. }
            if stderr.contains("corrupt patch") || stderr.contains("No valid patches") =>
        {
            PatchError::Malformed(stderr)
        }
        GitError::CommandFailed { stderr, .. } => PatchError::ApplyFailed(stderr),
        other => PatchError::Git(other),
    }
}

// ============================================================================
// Workflow
// ============================================================================

pub struct PatchWorkflow<'a> {
    vcs: &'a dyn Vcs,
    gateway: Gateway,
    selector: ModelSelector,
    max_diff_chars: usize,
}

impl<'a> PatchWorkflow<'a> {
    pub fn new(vcs: &'a dyn Vcs, gateway: Gateway, selector: ModelSelector, max_diff_chars: usize) -> Self {
        Self {
            vcs,
            gateway,
            selector,
            max_diff_chars,
        }
    }

    /// explicit > most recent tag > HEAD
    pub fn resolve_base_ref(&self, explicit: Option<&str>) -> String {
        resolve_base_ref(self.vcs, explicit)
    }

    pub fn collect_inputs(&self, base_ref: &str) -> Result<PatchInputs, PatchError> {
        collect_inputs(self.vcs, base_ref)
    }

    fn build_payload(&self, inputs: &PatchInputs, extra_prompt: Option<&str>) -> String {
        // base diff is context only and gets the smaller share
        let (staged, _) = truncate_diff(&inputs.staged_diff, self.max_diff_chars);
        let (base, _) = truncate_diff(&inputs.base_diff, self.max_diff_chars / 2);

        let mut payload = String::new();
        if let Some(extra) = extra_prompt.map(str::trim).filter(|e| !e.is_empty()) {
            payload.push_str("Additional instructions:\n");
            payload.push_str(extra);
            payload.push_str("\n\n");
        }
        payload.push_str(&format!("Base ref: {}\n", inputs.base_ref));
        if !inputs.recent_log.is_empty() {
            payload.push_str("\nCommits since base:\n");
            for entry in &inputs.recent_log {
                payload.push_str(&format!("{} {}\n", entry.short_hash, entry.subject));
            }
        }
        payload.push_str("\nStaged changes (clean these):\n```diff\n");
        payload.push_str(&staged);
        payload.push_str("\n```\n");
        if !base.trim().is_empty() {
            payload.push_str("\nChanges since base (style reference):\n```diff\n");
            payload.push_str(&base);
            payload.push_str("\n```\n");
        }
        payload
    }

    /// Ask for a cleanup patch; `None` means no change is needed
    pub async fn generate(
        &self,
        inputs: &PatchInputs,
        extra_prompt: Option<&str>,
    ) -> Result<Option<PatchSession>, PatchError> {
        if inputs.staged_diff.trim().is_empty() {
            debug!("nothing staged, no cleanup requested");
            return Ok(None);
        }

        let payload = self.build_payload(inputs, extra_prompt);
        let response = self
            .gateway
            .request(&self.selector, CLEANUP_PROMPT, payload)
            .await?;

        let text = response.text();
        match extract_patch(&text) {
            Some(session) => {
                debug!(bytes = session.patch.len(), "cleanup patch received");
                Ok(Some(session))
            }
            None => {
                info!("collaborator proposed no cleanup");
                Ok(None)
            }
        }
    }

    /// Apply to index and worktree, then restore the staged path set
    pub fn apply(&self, session: &PatchSession) -> Result<AppliedPatch, PatchError> {
        let original: Vec<String> = self.vcs.status()?.staged.into_iter().collect();

        self.vcs
            .check_patch(&session.patch, false, true)
            .map_err(classify_check_failure)?;

        if let Err(e) = self.vcs.apply_patch(&session.patch, false, true) {
            warn!(error = %e, "patch apply failed after check; working tree left as is");
            return Err(classify_check_failure(e));
        }

        let released = self.release(&original).map_err(|e| {
            warn!(error = %e, "restaging after apply failed; working tree left as is");
            PatchError::Restage(e)
        })?;
        info!(
            files = original.len(),
            released = released.len(),
            "cleanup patch applied"
        );
        Ok(AppliedPatch {
            session: session.clone(),
            restaged: original,
            released,
        })
    }

    /// Reverse an applied patch, then restore the staged path set
    pub fn revert(&self, applied: AppliedPatch) -> Result<PatchSession, PatchError> {
        let patch = &applied.session.patch;
        let released: Vec<&str> = applied.released.iter().map(String::as_str).collect();

        // `--reverse --index` needs the index to hold the patched content again
        if !released.is_empty() {
            if let Err(e) = self.vcs.add(&released) {
                debug!(error = %e, "released paths are gone");
                return Err(PatchError::NotApplied);
            }
        }

        if self.vcs.check_patch(patch, true, true).is_err() {
            if !released.is_empty() {
                if let Err(e) = self.vcs.reset(&released) {
                    warn!(error = %e, "could not unstage released paths");
                }
            }
            return Err(PatchError::NotApplied);
        }

        if let Err(e) = self.vcs.apply_patch(patch, true, true) {
            warn!(error = %e, "reverse apply failed; working tree left as is");
            return Err(PatchError::ReverseFailed(e.to_string()));
        }

        self.release(&applied.restaged).map_err(|e| {
            warn!(error = %e, "restaging after revert failed; working tree left as is");
            PatchError::Restage(e)
        })?;
        info!("cleanup patch reverted");
        Ok(applied.session)
    }

    /// Unstage whatever is staged now but was not in `original`
    fn release(&self, original: &[String]) -> Result<Vec<String>, GitError> {
        let original: BTreeSet<&str> = original.iter().map(String::as_str).collect();
        let extra: Vec<String> = self
            .vcs
            .status()?
            .staged
            .into_iter()
            .filter(|p| !original.contains(p.as_str()))
            .collect();

        if !extra.is_empty() {
            let refs: Vec<&str> = extra.iter().map(String::as_str).collect();
            self.vcs.reset(&refs)?;
            debug!(paths = ?extra, "unstaged paths outside the original staged set");
        }
        Ok(extra)
    }
}

/// explicit > most recent tag > HEAD; an empty tag list is not an error
pub fn resolve_base_ref(vcs: &dyn Vcs, explicit: Option<&str>) -> String {
    if let Some(base) = explicit.map(str::trim).filter(|b| !b.is_empty()) {
        return base.to_string();
    }
    match vcs.tags() {
        Ok(tags) => tags.into_iter().next().unwrap_or_else(|| "HEAD".to_string()),
        Err(e) => {
            debug!(error = %e, "tag listing failed, using HEAD");
            "HEAD".to_string()
        }
    }
}

/// Staged diff, base..HEAD diff and a bounded log
pub fn collect_inputs(vcs: &dyn Vcs, base_ref: &str) -> Result<PatchInputs, PatchError> {
    let staged_diff = vcs.diff(true, &[])?;
    let base_diff = vcs.diff_range(base_ref, "HEAD")?;
    let recent_log = vcs
        .log(Some(&format!("{base_ref}..HEAD")), Some(20))
        .unwrap_or_default();

    Ok(PatchInputs {
        base_ref: base_ref.to_string(),
        staged_diff,
        base_diff,
        recent_log,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{selector, RecordingVcs, Script};

    const PATCH: &str = "diff --git a/src/lib.rs b/src/lib.rs\n--- a/src/lib.rs\n+++ b/src/lib.rs\n@@ -1,2 +1 @@\n-// increment x by one\n x += 1;\n";

    fn workflow<'a>(vcs: &'a RecordingVcs, script: &Script) -> PatchWorkflow<'a> {
        PatchWorkflow::new(vcs, script.gateway(), selector(), 4000)
    }

    #[test]
    fn test_looks_like_patch() {
        assert!(looks_like_patch(PATCH));
        assert!(looks_like_patch("--- a/x\n+++ b/x\n@@ -1 +1 @@\n-a\n+b\n"));
        assert!(!looks_like_patch("No changes needed."));
        assert!(!looks_like_patch("--- a/x\n+++ b/x\n"));
    }

    #[test]
    fn test_extract_fenced_patch() {
        let reply = format!("Removed a redundant comment.\n\n```diff\n{PATCH}```\n");
        let session = extract_patch(&reply).unwrap();

        assert_eq!(session.patch, PATCH);
        assert_eq!(session.summary, "Removed a redundant comment.");
    }

    #[test]
    fn test_extract_bare_patch() {
        let reply = format!("Cleanup:\n{}", PATCH.trim_end());
        let session = extract_patch(&reply).unwrap();

        assert!(session.patch.starts_with("diff --git"));
        assert!(session.patch.ends_with('\n'));
        assert_eq!(session.summary, "Cleanup:");

        let bare = extract_patch(PATCH).unwrap();
        assert_eq!(bare.summary, DEFAULT_SUMMARY);
    }

    #[test]
    fn test_extract_no_patch() {
        assert!(extract_patch("Everything looks clean, no changes needed.").is_none());
        assert!(extract_patch("```rust\nfn main() {}\n```").is_none());
    }

    #[test]
    fn test_resolve_base_ref() {
        let tagged = RecordingVcs::new().with_tags(&["v1.2.0", "v1.1.0"]);
        assert_eq!(resolve_base_ref(&tagged, None), "v1.2.0");
        assert_eq!(resolve_base_ref(&tagged, Some("main")), "main");

        let untagged = RecordingVcs::new();
        assert_eq!(resolve_base_ref(&untagged, None), "HEAD");

        let broken = RecordingVcs::new().failing("tags");
        assert_eq!(resolve_base_ref(&broken, Some("  ")), "HEAD");
    }

    #[test]
    fn test_collect_inputs() {
        let vcs = RecordingVcs::new()
            .with_diff("diff staged", PATCH)
            .with_diff("diff_range v1 HEAD", "diff --git a/old b/old\n")
            .with_log_subjects(&["feat: one", "fix: two"])
            .failing("log");

        let inputs = collect_inputs(&vcs, "v1").unwrap();

        assert_eq!(inputs.staged_diff, PATCH);
        assert_eq!(inputs.base_diff, "diff --git a/old b/old\n");
        assert!(inputs.recent_log.is_empty());
        assert!(vcs.calls().contains(&"log v1..HEAD 20".to_string()));
    }

    #[tokio::test]
    async fn test_generate_no_change_needed() {
        let vcs = RecordingVcs::new();
        let script = Script::new().reply_text("The staged changes are already clean.");
        let inputs = PatchInputs {
            base_ref: "HEAD".into(),
            staged_diff: PATCH.into(),
            ..Default::default()
        };

        let result = workflow(&vcs, &script).generate(&inputs, Some("focus on comments")).await;

        assert!(result.unwrap().is_none());
        let (system, payload) = &script.requests()[0];
        assert!(system.contains("slop"));
        assert!(payload.starts_with("Additional instructions:\nfocus on comments"));
    }

    #[tokio::test]
    async fn test_generate_nothing_staged_skips_request() {
        let vcs = RecordingVcs::new();
        let script = Script::new();

        let result = workflow(&vcs, &script)
            .generate(&PatchInputs::default(), None)
            .await
            .unwrap();

        assert!(result.is_none());
        assert_eq!(script.sessions_opened(), 0);
    }

    #[tokio::test]
    async fn test_generate_auth_error() {
        let vcs = RecordingVcs::new();
        let script = Script::new().reply_error(ProviderError::Authentication("no key".into()));
        let inputs = PatchInputs {
            staged_diff: PATCH.into(),
            ..Default::default()
        };

        let err = workflow(&vcs, &script).generate(&inputs, None).await.unwrap_err();
        assert!(matches!(err, PatchError::Authentication(_)));
    }

    #[test]
    fn test_apply_keeps_staged_set_without_re_adding() {
        let vcs = RecordingVcs::new().with_status("M  src/lib.rs\n");
        let script = Script::new();
        let session = extract_patch(PATCH).unwrap();

        let applied = workflow(&vcs, &script).apply(&session).unwrap();

        assert_eq!(applied.restaged().to_vec(), vec!["src/lib.rs".to_string()]);
        assert!(applied.released().is_empty());
        let calls = vcs.calls();
        let check = calls.iter().position(|c| c == "check_patch forward index").unwrap();
        let apply = calls.iter().position(|c| c == "apply_patch forward index").unwrap();
        assert!(check < apply);
        assert!(!calls.iter().any(|c| c.starts_with("add") || c.starts_with("reset")));
    }

    #[test]
    fn test_apply_unstages_paths_outside_staged_set() {
        let vcs = RecordingVcs::new()
            .with_status("M  src/lib.rs\n")
            .with_patch_paths(&["src/lib.rs", "src/util.rs"]);
        let script = Script::new();

        let applied = workflow(&vcs, &script).apply(&extract_patch(PATCH).unwrap()).unwrap();

        assert_eq!(applied.released().to_vec(), vec!["src/util.rs".to_string()]);
        assert!(!vcs.staged().contains("src/util.rs"));
        assert!(vcs.calls().contains(&"reset src/util.rs".to_string()));
        assert!(!vcs.calls().iter().any(|c| c.starts_with("add")));
    }

    #[test]
    fn test_apply_restage_failure_is_reported() {
        let vcs = RecordingVcs::new()
            .with_patch_paths(&["src/util.rs"])
            .failing("reset");
        let script = Script::new();

        let err = workflow(&vcs, &script)
            .apply(&extract_patch(PATCH).unwrap())
            .unwrap_err();

        assert!(matches!(err, PatchError::Restage(_)));
        assert!(err.to_string().contains("left as is"));
    }

    #[test]
    fn test_apply_failed_check_leaves_index_alone() {
        let vcs = RecordingVcs::new().failing("check_patch");
        let script = Script::new();
        let session = extract_patch(PATCH).unwrap();

        let err = workflow(&vcs, &script).apply(&session).unwrap_err();

        assert!(matches!(err, PatchError::ApplyFailed(_)));
        assert!(!vcs.calls().iter().any(|c| c.starts_with("apply_patch")));
    }

    #[test]
    fn test_revert_not_applied() {
        let vcs = RecordingVcs::new().failing("check_patch reverse");
        let script = Script::new();
        let flow = workflow(&vcs, &script);
        let applied = flow.apply(&extract_patch(PATCH).unwrap()).unwrap();

        let err = flow.revert(applied).unwrap_err();

        assert!(matches!(err, PatchError::NotApplied));
        assert!(!vcs.calls().iter().any(|c| c == "apply_patch reverse index"));
    }

    #[test]
    fn test_revert_reverses_without_re_adding() {
        let vcs = RecordingVcs::new().with_status("M  src/lib.rs\n");
        let script = Script::new();
        let flow = workflow(&vcs, &script);
        let applied = flow.apply(&extract_patch(PATCH).unwrap()).unwrap();

        let session = flow.revert(applied).unwrap();

        assert_eq!(session.patch, PATCH);
        let calls = vcs.calls();
        assert!(calls.contains(&"apply_patch reverse index".to_string()));
        assert!(!calls.iter().any(|c| c.starts_with("add") || c.starts_with("reset")));
    }

    #[test]
    fn test_revert_restages_released_paths_for_reverse_check() {
        let vcs = RecordingVcs::new()
            .with_status("M  src/lib.rs\n")
            .with_patch_paths(&["src/util.rs"]);
        let script = Script::new();
        let flow = workflow(&vcs, &script);
        let applied = flow.apply(&extract_patch(PATCH).unwrap()).unwrap();

        flow.revert(applied).unwrap();

        let calls = vcs.calls();
        let add = calls.iter().position(|c| c == "add src/util.rs").unwrap();
        let check = calls.iter().position(|c| c == "check_patch reverse index").unwrap();
        let last_reset = calls.iter().rposition(|c| c == "reset src/util.rs").unwrap();
        assert!(add < check && check < last_reset);
        assert!(!vcs.staged().contains("src/util.rs"));
    }

    #[test]
    fn test_classify_check_failure() {
        let corrupt = GitError::CommandFailed {
            command: "apply".into(),
            stderr: "error: corrupt patch at line 7".into(),
        };
        assert!(matches!(classify_check_failure(corrupt), PatchError::Malformed(_)));

        let conflict = GitError::CommandFailed {
            command: "apply".into(),
            stderr: "error: patch failed: src/lib.rs:1".into(),
        };
        assert!(matches!(classify_check_failure(conflict), PatchError::ApplyFailed(_)));
    }
}
