//! Version-control collaborator interface
//!
//! All calls are synchronous and run one at a time; the staging index is a
//! shared mutable resource with no transactional isolation.

use super::ops::{GitError, LogEntry, RepositoryStatus};
use std::path::Path;

/// Operations the composer needs from a version-control system
pub trait Vcs: Send + Sync {
    /// Porcelain status, recomputed on every call
    fn status(&self) -> Result<RepositoryStatus, GitError>;

    /// Unified diff of staged (`--cached`) or unstaged changes, optionally limited to paths
    fn diff(&self, staged: bool, paths: &[&str]) -> Result<String, GitError>;

    /// Unified diff between two revisions
    fn diff_range(&self, from: &str, to: &str) -> Result<String, GitError>;

    /// Raw `--numstat` output
    fn numstat(&self, staged: bool) -> Result<String, GitError>;

    /// Raw `--name-status` output
    fn name_status(&self, staged: bool) -> Result<String, GitError>;

    /// Stage exactly these paths (deletions included)
    fn add(&self, paths: &[&str]) -> Result<(), GitError>;

    /// Stage everything
    fn add_all(&self) -> Result<(), GitError>;

    /// Unstage these paths
    fn reset(&self, paths: &[&str]) -> Result<(), GitError>;

    /// Clear the staging index entirely
    fn reset_all(&self) -> Result<(), GitError>;

    /// Commit the current index, returning the short hash
    fn commit(&self, message: &str) -> Result<String, GitError>;

    /// Log entries, newest first
    fn log(&self, range: Option<&str>, count: Option<usize>) -> Result<Vec<LogEntry>, GitError>;

    /// Tag names, most recently created first
    fn tags(&self) -> Result<Vec<String>, GitError>;

    /// Blob content at `rev:path`
    fn show_file(&self, rev: &str, path: &str) -> Result<String, GitError>;

    /// Apply a patch fed on stdin
    fn apply_patch(&self, patch: &str, reverse: bool, index: bool) -> Result<(), GitError>;

    /// Dry-run of `apply_patch`
    fn check_patch(&self, patch: &str, reverse: bool, index: bool) -> Result<(), GitError>;

    /// Repository root
    fn root(&self) -> &Path;

    /// Raw bytes of a working-tree file, relative to the root
    fn read_worktree_file(&self, path: &str) -> Result<Vec<u8>, GitError>;
}
