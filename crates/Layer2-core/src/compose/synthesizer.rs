//! Proposal Synthesizer
//!
//! Sends the change list to the generation collaborator and turns its
//! structured reply into a `DraftSet`. The reply is never trusted to cover
//! every file: unknown and duplicate paths are dropped and unreferenced paths
//! are appended to the last draft (or to a fallback draft).

use super::draft::{DraftCommit, DraftSet};
use super::message::heuristic_message;
use crate::git::{ChangeIndex, ChangeRecord};
use crate::reply::extract_json;
use commitforge_foundation::ModelSelector;
use commitforge_provider::{Gateway, ProviderError};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::collections::HashSet;
use thiserror::Error;
use tracing::{debug, info, warn};

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug, Error)]
pub enum SynthesisError {
    /// API key missing/invalid; the user must fix credentials
    #[error("authentication with the generation provider failed: {0}")]
    Authentication(String),

    #[error("generation request failed: {0}")]
    Provider(ProviderError),

    #[error("the generation provider returned an empty reply")]
    EmptyReply,

    #[error("could not parse the proposal: {0}")]
    MalformedReply(String),

    #[error("there are no changes to group")]
    NoChanges,
}

impl From<ProviderError> for SynthesisError {
    fn from(err: ProviderError) -> Self {
        if err.is_auth() {
            SynthesisError::Authentication(err.to_string())
        } else {
            SynthesisError::Provider(err)
        }
    }
}

// ============================================================================
// Request
// ============================================================================

const GROUPING_PROMPT: &str = r#"You split a set of uncommitted changes into logically coherent git commits.

Each commit must be independently meaningful. Every file path in the input must
appear in exactly one commit. Use only paths from the input. Order the commits so
that earlier commits do not depend on later ones.

Commit messages use the conventional commit format (type(scope): description),
first line under 72 characters, imperative mood.

Reply with a single JSON object and nothing else:
{
  "drafts": [
    {"id": "1", "message": "feat(parser): ...", "files": ["path/a", "path/b"], "reasoning": "why these belong together"}
  ],
  "rationale": "one sentence on the overall split"
}"#;

const TRUNCATION_MARKER: &str = "\n[... diff truncated ...]\n";

/// Cut a diff to at most `max_chars` bytes on a char boundary
pub fn truncate_diff(diff: &str, max_chars: usize) -> (Cow<'_, str>, bool) {
    if diff.len() <= max_chars {
        return (Cow::Borrowed(diff), false);
    }
    let mut cut = max_chars;
    while !diff.is_char_boundary(cut) {
        cut -= 1;
    }
    (Cow::Owned(format!("{}{}", &diff[..cut], TRUNCATION_MARKER)), true)
}

#[derive(Debug, Serialize)]
struct FilePayload<'a> {
    path: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    old_path: Option<&'a str>,
    status: &'static str,
    additions: u32,
    deletions: u32,
    diff: Cow<'a, str>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    truncated: bool,
}

#[derive(Debug, Serialize)]
struct ProposalRequest<'a> {
    files: Vec<FilePayload<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    instructions: Option<&'a str>,
    #[serde(skip_serializing_if = "no_subjects")]
    recent_commits: &'a [String],
}

fn no_subjects(subjects: &&[String]) -> bool {
    subjects.is_empty()
}

// ============================================================================
// Reply
// ============================================================================

#[derive(Debug, Deserialize)]
struct ProposalReply {
    #[serde(alias = "commits")]
    drafts: Vec<ReplyDraft>,
    #[serde(default)]
    rationale: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ReplyDraft {
    #[serde(default)]
    id: Option<serde_json::Value>,
    #[serde(default)]
    message: String,
    files: Vec<String>,
    #[serde(default)]
    reasoning: Option<String>,
}

fn parse_reply(text: &str) -> Result<ProposalReply, SynthesisError> {
    if text.trim().is_empty() {
        return Err(SynthesisError::EmptyReply);
    }
    let json = extract_json(text)
        .ok_or_else(|| SynthesisError::MalformedReply("no JSON object in reply".to_string()))?;
    serde_json::from_str(json).map_err(|e| SynthesisError::MalformedReply(e.to_string()))
}

fn normalize_path(path: &str) -> &str {
    let path = path.trim();
    path.strip_prefix("./").unwrap_or(path)
}

fn label_for(changes: &ChangeIndex, files: &[String]) -> String {
    let diff: String = files
        .iter()
        .filter_map(|f| changes.get(f))
        .map(|r: &ChangeRecord| {
            if r.diff.is_empty() {
                format!("diff --git a/{0} b/{0}\n", r.path)
            } else {
                r.diff.clone()
            }
        })
        .collect();
    heuristic_message(&diff)
}

/// Turn a parsed reply into a DraftSet that covers `changes` exactly once
fn repair_drafts(reply: ProposalReply, changes: &ChangeIndex) -> DraftSet {
    let mut seen: HashSet<String> = HashSet::new();
    let mut drafts: Vec<DraftCommit> = Vec::new();

    for raw in reply.drafts {
        let mut files = Vec::with_capacity(raw.files.len());
        for path in &raw.files {
            let path = normalize_path(path);
            if !changes.contains(path) {
                warn!(path = %path, "proposal references unknown path, dropped");
                continue;
            }
            if !seen.insert(path.to_string()) {
                warn!(path = %path, "proposal lists path twice, keeping first");
                continue;
            }
            files.push(path.to_string());
        }

        let id = match raw.id {
            Some(serde_json::Value::String(s)) => s.trim().to_string(),
            Some(serde_json::Value::Number(n)) => n.to_string(),
            _ => String::new(),
        };

        if files.is_empty() {
            warn!(id = %id, "proposal draft has no usable files, dropped");
            continue;
        }

        drafts.push(DraftCommit {
            id,
            message: raw.message.trim().to_string(),
            files,
            reasoning: raw.reasoning.filter(|r| !r.trim().is_empty()),
        });
    }

    let missing: Vec<String> = changes
        .paths()
        .filter(|p| !seen.contains(*p))
        .map(String::from)
        .collect();

    if !missing.is_empty() {
        match drafts.last_mut() {
            Some(last) => {
                warn!(count = missing.len(), draft = %last.id, "unreferenced paths appended to last draft");
                last.files.extend(missing);
            }
            None => {
                warn!(count = missing.len(), "no usable drafts in proposal, using fallback draft");
                let message = label_for(changes, &missing);
                drafts.push(DraftCommit::new("misc", message, missing));
            }
        }
    }

    for draft in &mut drafts {
        if draft.message.is_empty() {
            draft.message = label_for(changes, &draft.files);
        }
    }

    let mut ids: HashSet<String> = HashSet::new();
    for (i, draft) in drafts.iter_mut().enumerate() {
        let base = if draft.id.is_empty() {
            format!("draft-{}", i + 1)
        } else {
            draft.id.clone()
        };
        let mut id = base.clone();
        let mut n = 2;
        while !ids.insert(id.clone()) {
            id = format!("{}-{}", base, n);
            n += 1;
        }
        draft.id = id;
    }

    DraftSet {
        drafts,
        rationale: reply.rationale.filter(|r| !r.trim().is_empty()),
    }
}

// ============================================================================
// ProposalSynthesizer
// ============================================================================

/// Builds draft commits from a change set
pub struct ProposalSynthesizer {
    gateway: Gateway,
    selector: ModelSelector,
    max_diff_chars: usize,
    recent_subjects: Vec<String>,
}

impl ProposalSynthesizer {
    pub fn new(gateway: Gateway, selector: ModelSelector, max_diff_chars: usize) -> Self {
        Self {
            gateway,
            selector,
            max_diff_chars,
            recent_subjects: Vec::new(),
        }
    }

    /// Recent commit subjects passed along as a style hint
    pub fn with_style_hints(mut self, subjects: Vec<String>) -> Self {
        self.recent_subjects = subjects;
        self
    }

    fn build_payload(&self, changes: &ChangeIndex, instructions: Option<&str>) -> String {
        let files = changes
            .iter()
            .map(|r| {
                let (diff, truncated) = truncate_diff(&r.diff, self.max_diff_chars);
                FilePayload {
                    path: &r.path,
                    old_path: r.old_path.as_deref(),
                    status: r.status.as_str(),
                    additions: r.additions,
                    deletions: r.deletions,
                    diff,
                    truncated,
                }
            })
            .collect();

        let request = ProposalRequest {
            files,
            instructions: instructions.map(str::trim).filter(|i| !i.is_empty()),
            recent_commits: &self.recent_subjects,
        };

        // Only string/number fields; serialization cannot fail
        serde_json::to_string_pretty(&request).unwrap_or_default()
    }

    /// Ask the collaborator for a grouping and repair it to full coverage
    pub async fn synthesize(
        &self,
        changes: &ChangeIndex,
        instructions: Option<&str>,
    ) -> Result<DraftSet, SynthesisError> {
        if changes.is_empty() {
            return Err(SynthesisError::NoChanges);
        }

        let payload = self.build_payload(changes, instructions);
        debug!(files = changes.len(), bytes = payload.len(), "requesting proposal");

        let response = self
            .gateway
            .request(&self.selector, GROUPING_PROMPT, payload)
            .await?;

        if let Some(reasoning) = response.reasoning() {
            debug!(reasoning = %reasoning, "proposal reasoning");
        }

        let reply = parse_reply(&response.text())?;
        let drafts = repair_drafts(reply, changes);

        info!(drafts = drafts.len(), files = drafts.file_count(), "proposal ready");
        Ok(drafts)
    }
}
