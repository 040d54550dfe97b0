//! Git Operations
//!
//! Core Git operations using shell commands.

use super::traits::Vcs;
use chrono::{DateTime, FixedOffset};
use std::collections::BTreeSet;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use thiserror::Error;
use tracing::{debug, info};

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, Error)]
pub enum GitError {
    #[error("git executable not found on PATH")]
    GitNotFound,

    #[error("Not a git repository: {}", .0.display())]
    NotARepository(PathBuf),

    #[error("git {command} failed: {stderr}")]
    CommandFailed { command: String, stderr: String },

    #[error("No changes to commit")]
    NothingToCommit,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

// ============================================================================
// Repository Status
// ============================================================================

/// Staged / unstaged / untracked path sets from `status --porcelain=v1`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RepositoryStatus {
    pub staged: BTreeSet<String>,
    pub unstaged: BTreeSet<String>,
    pub untracked: BTreeSet<String>,
}

impl RepositoryStatus {
    /// Parse porcelain v1 output. Leading whitespace is significant.
    pub fn parse_porcelain(output: &str) -> Self {
        let mut status = Self::default();

        for line in output.lines() {
            if line.len() < 4 {
                continue;
            }

            let mut codes = line.chars();
            let index = codes.next().unwrap_or(' ');
            let worktree = codes.next().unwrap_or(' ');
            let raw_path = &line[3..];
            let path = match raw_path.split_once(" -> ") {
                Some((_, to)) => unquote_path(to),
                None => unquote_path(raw_path),
            };

            match (index, worktree) {
                ('?', '?') => {
                    status.untracked.insert(path);
                }
                ('!', '!') => {}
                _ => {
                    if index != ' ' {
                        status.staged.insert(path.clone());
                    }
                    if worktree != ' ' {
                        status.unstaged.insert(path);
                    }
                }
            }
        }

        status
    }

    /// Check if working tree is clean
    pub fn is_clean(&self) -> bool {
        self.staged.is_empty() && self.unstaged.is_empty() && self.untracked.is_empty()
    }

    pub fn has_staged(&self) -> bool {
        !self.staged.is_empty()
    }
}

/// Undo git's C-style quoting of paths with special characters
pub fn unquote_path(raw: &str) -> String {
    let trimmed = raw.trim_end_matches(['\r', '\n']);
    let Some(inner) = trimmed
        .strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
    else {
        return trimmed.to_string();
    };

    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}

// ============================================================================
// Log Entry
// ============================================================================

const LOG_FIELD_SEP: char = '\u{1f}';
const LOG_FORMAT: &str = "--format=%H%x1f%h%x1f%s%x1f%an%x1f%aI";

/// A git log entry
#[derive(Debug, Clone, PartialEq)]
pub struct LogEntry {
    pub hash: String,
    pub short_hash: String,
    pub subject: String,
    pub author_name: String,
    pub date: Option<DateTime<FixedOffset>>,
}

impl LogEntry {
    fn parse_line(line: &str) -> Option<Self> {
        let parts: Vec<&str> = line.splitn(5, LOG_FIELD_SEP).collect();
        if parts.len() != 5 {
            return None;
        }
        Some(Self {
            hash: parts[0].to_string(),
            short_hash: parts[1].to_string(),
            subject: parts[2].to_string(),
            author_name: parts[3].to_string(),
            date: DateTime::parse_from_rfc3339(parts[4]).ok(),
        })
    }
}

// ============================================================================
// Git Operations
// ============================================================================

/// Git operations handler
#[derive(Debug, Clone)]
pub struct GitOps {
    /// Repository root directory
    root: PathBuf,

    /// Resolved git binary
    git: PathBuf,
}

impl GitOps {
    /// Open the repository containing `path`
    pub fn new(path: impl AsRef<Path>) -> Result<Self, GitError> {
        let path = path.as_ref();
        let git = which::which("git").map_err(|_| GitError::GitNotFound)?;

        let output = Command::new(&git)
            .args(["rev-parse", "--show-toplevel"])
            .current_dir(path)
            .output()?;

        if !output.status.success() {
            return Err(GitError::NotARepository(path.to_path_buf()));
        }

        let root = PathBuf::from(String::from_utf8_lossy(&output.stdout).trim());
        debug!(root = %root.display(), "opened git repository");
        Ok(Self { root, git })
    }

    /// Check if directory is a git repository
    pub fn is_repo(path: impl AsRef<Path>) -> bool {
        Self::new(path).is_ok()
    }

    fn command(&self, args: &[&str]) -> Command {
        let mut cmd = Command::new(&self.git);
        cmd.arg("-c")
            .arg("core.quotePath=false")
            .args(args)
            .current_dir(&self.root);
        cmd
    }

    /// Run a git command, stdout returned byte-for-byte (lossy UTF-8)
    fn run_git_raw(&self, args: &[&str]) -> Result<String, GitError> {
        debug!(args = ?args, "git");
        let output = self.command(args).output()?;
        Self::check_output(args, output)
    }

    /// Run a git command with a scalar result
    fn run_git(&self, args: &[&str]) -> Result<String, GitError> {
        Ok(self.run_git_raw(args)?.trim().to_string())
    }

    /// Run a git command with `input` fed on stdin
    fn run_git_with_input(&self, args: &[&str], input: &str) -> Result<String, GitError> {
        debug!(args = ?args, input_len = input.len(), "git (stdin)");
        let mut child = self
            .command(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(input.as_bytes())?;
        }

        let output = child.wait_with_output()?;
        Self::check_output(args, output)
    }

    fn check_output(args: &[&str], output: std::process::Output) -> Result<String, GitError> {
        if output.status.success() {
            Ok(String::from_utf8_lossy(&output.stdout).into_owned())
        } else {
            Err(GitError::CommandFailed {
                command: args.first().copied().unwrap_or_default().to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            })
        }
    }

    fn diff_args<'a>(staged: bool, extra: &[&'a str]) -> Vec<&'a str> {
        let mut args = vec!["diff"];
        if staged {
            args.push("--cached");
        }
        args.extend_from_slice(extra);
        args
    }

    fn apply_args(reverse: bool, index: bool, check: bool) -> Vec<&'static str> {
        let mut args = vec!["apply", "--whitespace=nowarn"];
        if check {
            args.push("--check");
        }
        if reverse {
            args.push("--reverse");
        }
        if index {
            args.push("--index");
        }
        args.push("-");
        args
    }

    /// Get current commit hash
    pub fn head(&self) -> Result<String, GitError> {
        self.run_git(&["rev-parse", "HEAD"])
    }
}

impl Vcs for GitOps {
    fn status(&self) -> Result<RepositoryStatus, GitError> {
        let output = self.run_git_raw(&["status", "--porcelain=v1", "-uall"])?;
        Ok(RepositoryStatus::parse_porcelain(&output))
    }

    fn diff(&self, staged: bool, paths: &[&str]) -> Result<String, GitError> {
        let mut args = Self::diff_args(staged, &["-M"]);
        if !paths.is_empty() {
            args.push("--");
            args.extend_from_slice(paths);
        }
        self.run_git_raw(&args)
    }

    fn diff_range(&self, from: &str, to: &str) -> Result<String, GitError> {
        self.run_git_raw(&["diff", from, to])
    }

    fn numstat(&self, staged: bool) -> Result<String, GitError> {
        self.run_git_raw(&Self::diff_args(staged, &["--numstat", "-M"]))
    }

    fn name_status(&self, staged: bool) -> Result<String, GitError> {
        self.run_git_raw(&Self::diff_args(staged, &["--name-status", "-M"]))
    }

    fn add(&self, paths: &[&str]) -> Result<(), GitError> {
        // `add -A --` with no pathspec would stage the whole tree
        if paths.is_empty() {
            return Ok(());
        }
        let mut args = vec!["add", "-A", "--"];
        args.extend_from_slice(paths);
        self.run_git(&args)?;
        Ok(())
    }

    fn add_all(&self) -> Result<(), GitError> {
        self.run_git(&["add", "-A"])?;
        Ok(())
    }

    fn reset(&self, paths: &[&str]) -> Result<(), GitError> {
        if paths.is_empty() {
            return Ok(());
        }
        let mut args = vec!["reset", "-q", "--"];
        args.extend_from_slice(paths);
        self.run_git(&args)?;
        Ok(())
    }

    fn reset_all(&self) -> Result<(), GitError> {
        self.run_git(&["reset", "-q"])?;
        Ok(())
    }

    fn commit(&self, message: &str) -> Result<String, GitError> {
        if !self.status()?.has_staged() {
            return Err(GitError::NothingToCommit);
        }

        self.run_git_with_input(&["commit", "-q", "-F", "-"], message)?;
        let hash = self.run_git(&["rev-parse", "--short", "HEAD"])?;

        info!("Created commit: {}", hash);
        Ok(hash)
    }

    fn log(&self, range: Option<&str>, count: Option<usize>) -> Result<Vec<LogEntry>, GitError> {
        let count_arg = count.map(|n| format!("-n{}", n));
        let mut args = vec!["log", LOG_FORMAT];
        if let Some(count_arg) = count_arg.as_deref() {
            args.push(count_arg);
        }
        if let Some(range) = range {
            args.push(range);
        }

        let output = self.run_git_raw(&args)?;
        Ok(output.lines().filter_map(LogEntry::parse_line).collect())
    }

    fn tags(&self) -> Result<Vec<String>, GitError> {
        let output = self.run_git_raw(&["tag", "--list", "--sort=-creatordate"])?;
        Ok(output
            .lines()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(String::from)
            .collect())
    }

    fn show_file(&self, rev: &str, path: &str) -> Result<String, GitError> {
        self.run_git_raw(&["show", &format!("{}:{}", rev, path)])
    }

    fn apply_patch(&self, patch: &str, reverse: bool, index: bool) -> Result<(), GitError> {
        self.run_git_with_input(&Self::apply_args(reverse, index, false), patch)?;
        Ok(())
    }

    fn check_patch(&self, patch: &str, reverse: bool, index: bool) -> Result<(), GitError> {
        self.run_git_with_input(&Self::apply_args(reverse, index, true), patch)?;
        Ok(())
    }

    fn root(&self) -> &Path {
        &self.root
    }

    fn read_worktree_file(&self, path: &str) -> Result<Vec<u8>, GitError> {
        Ok(std::fs::read(self.root.join(path))?)
    }
}

// ============================================================================
// Tests
// ============================================================================
