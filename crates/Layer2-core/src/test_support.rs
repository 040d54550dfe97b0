//! In-memory fakes shared by the unit tests

use crate::git::{GitError, LogEntry, RepositoryStatus, Vcs};
use async_trait::async_trait;
use commitforge_foundation::ModelSelector;
use commitforge_provider::{
    ContentPart, Gateway, Message, Provider, ProviderError, ProviderFactory, ProviderResponse,
};
use std::collections::{BTreeSet, HashMap, VecDeque};
use std::path::Path;
use std::sync::{Arc, Mutex};

// ============================================================================
// RecordingVcs
// ============================================================================

/// Scripted `Vcs` that records every call and simulates the staging index
#[derive(Default)]
pub struct RecordingVcs {
    numstat: [String; 2],
    name_status: [String; 2],
    status: String,
    diffs: HashMap<String, String>,
    files: HashMap<String, String>,
    tags: Vec<String>,
    log: Vec<LogEntry>,
    failures: Vec<String>,
    fail_commit_at: Option<usize>,
    patch_paths: Vec<String>,
    calls: Mutex<Vec<String>>,
    index: Mutex<BTreeSet<String>>,
    commits: Mutex<Vec<(String, BTreeSet<String>)>>,
}

impl RecordingVcs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_numstat(mut self, staged: bool, output: &str) -> Self {
        self.numstat[staged as usize] = output.to_string();
        self
    }

    pub fn with_name_status(mut self, staged: bool, output: &str) -> Self {
        self.name_status[staged as usize] = output.to_string();
        self
    }

    pub fn with_status(mut self, porcelain: &str) -> Self {
        self.status = porcelain.to_string();
        self
    }

    pub fn with_diff(mut self, key: &str, diff: &str) -> Self {
        self.diffs.insert(key.to_string(), diff.to_string());
        self
    }

    pub fn with_file(mut self, path: &str, content: &str) -> Self {
        self.files.insert(path.to_string(), content.to_string());
        self
    }

    pub fn with_tags(mut self, tags: &[&str]) -> Self {
        self.tags = tags.iter().map(|t| t.to_string()).collect();
        self
    }

    pub fn with_log_subjects(mut self, subjects: &[&str]) -> Self {
        self.log = subjects
            .iter()
            .enumerate()
            .map(|(i, s)| LogEntry {
                hash: format!("{:040}", i),
                short_hash: format!("{:07}", i),
                subject: s.to_string(),
                author_name: "tester".to_string(),
                date: None,
            })
            .collect();
        self
    }

    /// Fail any call whose recorded form starts with `prefix`
    pub fn failing(mut self, prefix: &str) -> Self {
        self.failures.push(prefix.to_string());
        self
    }

    /// Fail the n-th commit (1-based)
    pub fn failing_commit(mut self, n: usize) -> Self {
        self.fail_commit_at = Some(n);
        self
    }

    /// Paths a forward `apply_patch --index` stages
    pub fn with_patch_paths(mut self, paths: &[&str]) -> Self {
        self.patch_paths = paths.iter().map(|p| p.to_string()).collect();
        self
    }

    pub fn stage(&self, paths: &[&str]) {
        let mut index = self.index.lock().unwrap();
        index.extend(paths.iter().map(|p| p.to_string()));
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn commits(&self) -> Vec<(String, BTreeSet<String>)> {
        self.commits.lock().unwrap().clone()
    }

    pub fn staged(&self) -> BTreeSet<String> {
        self.index.lock().unwrap().clone()
    }

    fn record(&self, call: String) -> Result<(), GitError> {
        let fail = self.failures.iter().any(|f| call.starts_with(f.as_str()));
        self.calls.lock().unwrap().push(call.clone());
        if fail {
            return Err(GitError::CommandFailed {
                command: call,
                stderr: "scripted failure".to_string(),
            });
        }
        Ok(())
    }
}

fn side(staged: bool) -> &'static str {
    if staged {
        "staged"
    } else {
        "unstaged"
    }
}

impl Vcs for RecordingVcs {
    fn status(&self) -> Result<RepositoryStatus, GitError> {
        self.record("status".to_string())?;
        let mut status = RepositoryStatus::parse_porcelain(&self.status);
        status.staged.extend(self.index.lock().unwrap().iter().cloned());
        Ok(status)
    }

    fn diff(&self, staged: bool, paths: &[&str]) -> Result<String, GitError> {
        let key = format!("diff {} {}", side(staged), paths.join(" "));
        self.record(key.trim_end().to_string())?;
        Ok(self
            .diffs
            .get(key.trim_end())
            .cloned()
            .unwrap_or_else(|| {
                paths
                    .iter()
                    .map(|p| format!("diff --git a/{p} b/{p}\n+change in {p}\n"))
                    .collect()
            }))
    }

    fn diff_range(&self, from: &str, to: &str) -> Result<String, GitError> {
        let key = format!("diff_range {from} {to}");
        self.record(key.clone())?;
        Ok(self.diffs.get(&key).cloned().unwrap_or_default())
    }

    fn numstat(&self, staged: bool) -> Result<String, GitError> {
        self.record(format!("numstat {}", side(staged)))?;
        Ok(self.numstat[staged as usize].clone())
    }

    fn name_status(&self, staged: bool) -> Result<String, GitError> {
        self.record(format!("name_status {}", side(staged)))?;
        Ok(self.name_status[staged as usize].clone())
    }

    fn add(&self, paths: &[&str]) -> Result<(), GitError> {
        self.record(format!("add {}", paths.join(" ")))?;
        self.stage(paths);
        Ok(())
    }

    fn add_all(&self) -> Result<(), GitError> {
        self.record("add_all".to_string())
    }

    fn reset(&self, paths: &[&str]) -> Result<(), GitError> {
        self.record(format!("reset {}", paths.join(" ")))?;
        let mut index = self.index.lock().unwrap();
        for p in paths {
            index.remove(*p);
        }
        Ok(())
    }

    fn reset_all(&self) -> Result<(), GitError> {
        self.record("reset_all".to_string())?;
        self.index.lock().unwrap().clear();
        Ok(())
    }

    fn commit(&self, message: &str) -> Result<String, GitError> {
        self.record(format!("commit {message}"))?;
        let mut commits = self.commits.lock().unwrap();
        if self.fail_commit_at == Some(commits.len() + 1) {
            return Err(GitError::CommandFailed {
                command: "commit".to_string(),
                stderr: "hook rejected commit".to_string(),
            });
        }
        let snapshot = std::mem::take(&mut *self.index.lock().unwrap());
        commits.push((message.to_string(), snapshot));
        Ok(format!("c{:06}", commits.len()))
    }

    fn log(&self, range: Option<&str>, count: Option<usize>) -> Result<Vec<LogEntry>, GitError> {
        self.record(format!(
            "log {} {}",
            range.unwrap_or("-"),
            count.map(|c| c.to_string()).unwrap_or_default()
        ))?;
        Ok(self
            .log
            .iter()
            .take(count.unwrap_or(usize::MAX))
            .cloned()
            .collect())
    }

    fn tags(&self) -> Result<Vec<String>, GitError> {
        self.record("tags".to_string())?;
        Ok(self.tags.clone())
    }

    fn show_file(&self, rev: &str, path: &str) -> Result<String, GitError> {
        self.record(format!("show {rev}:{path}"))?;
        Ok(self.files.get(path).cloned().unwrap_or_default())
    }

    fn apply_patch(&self, _patch: &str, reverse: bool, index: bool) -> Result<(), GitError> {
        self.record(format!(
            "apply_patch {} {}",
            if reverse { "reverse" } else { "forward" },
            if index { "index" } else { "worktree" }
        ))?;
        if index && !reverse {
            let paths: Vec<&str> = self.patch_paths.iter().map(String::as_str).collect();
            self.stage(&paths);
        }
        Ok(())
    }

    fn check_patch(&self, _patch: &str, reverse: bool, index: bool) -> Result<(), GitError> {
        self.record(format!(
            "check_patch {} {}",
            if reverse { "reverse" } else { "forward" },
            if index { "index" } else { "worktree" }
        ))
    }

    fn root(&self) -> &Path {
        Path::new("/fake/repo")
    }

    fn read_worktree_file(&self, path: &str) -> Result<Vec<u8>, GitError> {
        self.record(format!("read {path}"))?;
        self.files
            .get(path)
            .map(|c| c.clone().into_bytes())
            .ok_or_else(|| GitError::Io(std::io::Error::from(std::io::ErrorKind::NotFound)))
    }
}

// ============================================================================
// ScriptedProvider
// ============================================================================

/// Replays canned replies in order and records every request payload
#[derive(Clone, Default)]
pub struct Script {
    replies: Arc<Mutex<VecDeque<Result<Vec<ContentPart>, ProviderError>>>>,
    requests: Arc<Mutex<Vec<(String, String)>>>,
    sessions: Arc<Mutex<usize>>,
}

impl Script {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reply_text(self, text: &str) -> Self {
        self.reply_parts(vec![ContentPart::Text(text.to_string())])
    }

    pub fn reply_parts(self, parts: Vec<ContentPart>) -> Self {
        self.replies.lock().unwrap().push_back(Ok(parts));
        self
    }

    pub fn reply_error(self, error: ProviderError) -> Self {
        self.replies.lock().unwrap().push_back(Err(error));
        self
    }

    /// `(system, payload)` pairs in request order
    pub fn requests(&self) -> Vec<(String, String)> {
        self.requests.lock().unwrap().clone()
    }

    pub fn sessions_opened(&self) -> usize {
        *self.sessions.lock().unwrap()
    }

    pub fn gateway(&self) -> Gateway {
        Gateway::new(Arc::new(self.clone()))
    }
}

impl ProviderFactory for Script {
    fn create(&self, selector: &ModelSelector) -> Result<Arc<dyn Provider>, ProviderError> {
        *self.sessions.lock().unwrap() += 1;
        Ok(Arc::new(ScriptedProvider {
            script: self.clone(),
            model: selector.model.clone(),
        }))
    }
}

struct ScriptedProvider {
    script: Script,
    model: String,
}

#[async_trait]
impl Provider for ScriptedProvider {
    fn id(&self) -> &str {
        "scripted"
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn complete(
        &self,
        messages: Vec<Message>,
        system_prompt: Option<String>,
    ) -> Result<ProviderResponse, ProviderError> {
        let payload = messages
            .into_iter()
            .map(|m| m.content)
            .collect::<Vec<_>>()
            .join("\n");
        self.script
            .requests
            .lock()
            .unwrap()
            .push((system_prompt.unwrap_or_default(), payload));

        let next = self
            .script
            .replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(ProviderError::Unknown("script exhausted".to_string())));

        next.map(|parts| ProviderResponse {
            parts,
            model: self.model.clone(),
            ..Default::default()
        })
    }
}

pub fn selector() -> ModelSelector {
    ModelSelector::new("scripted", "test-model")
}
