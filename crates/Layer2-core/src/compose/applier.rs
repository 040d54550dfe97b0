//! Sequential Applier
//!
//! Turns a `DraftSet` into commits one draft at a time. The index is cleared
//! before each draft so it only ever holds one draft's files. Earlier commits
//! are kept when a later draft fails.

use super::draft::{CoverageReport, DraftSet};
use crate::git::{ChangeIndex, GitError, Vcs};
use std::collections::HashSet;
use thiserror::Error;
use tracing::{debug, info, warn};

/// A draft that became a commit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommittedDraft {
    pub draft_id: String,
    pub hash: String,
    pub message: String,
}

#[derive(Debug, Error)]
pub enum ApplyError {
    #[error("there are no drafts to apply")]
    Empty,

    #[error("drafts do not cover the changes exactly once: {0}")]
    InvalidDrafts(CoverageReport),

    #[error("committed {committed} of {total} drafts; draft '{draft_id}' failed: {source}")]
    Partial {
        committed: usize,
        total: usize,
        draft_id: String,
        #[source]
        source: GitError,
    },
}

impl ApplyError {
    /// Number of drafts that already became commits
    pub fn committed(&self) -> usize {
        match self {
            ApplyError::Partial { committed, .. } => *committed,
            _ => 0,
        }
    }
}

/// Progress callback, called after each successful commit
pub trait ApplyObserver {
    fn on_draft_committed(&self, index: usize, total: usize, commit: &CommittedDraft);
}

impl<F> ApplyObserver for F
where
    F: Fn(usize, usize, &CommittedDraft),
{
    fn on_draft_committed(&self, index: usize, total: usize, commit: &CommittedDraft) {
        self(index, total, commit)
    }
}

pub struct SequentialApplier<'a> {
    vcs: &'a dyn Vcs,
    observer: Option<&'a dyn ApplyObserver>,
}

impl<'a> SequentialApplier<'a> {
    pub fn new(vcs: &'a dyn Vcs) -> Self {
        Self {
            vcs,
            observer: None,
        }
    }

    pub fn with_observer(mut self, observer: &'a dyn ApplyObserver) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Commit every draft in order; stops at the first failure
    pub fn apply(
        &self,
        drafts: &DraftSet,
        changes: &ChangeIndex,
    ) -> Result<Vec<CommittedDraft>, ApplyError> {
        if drafts.is_empty() {
            return Err(ApplyError::Empty);
        }
        let report = drafts.check_coverage(changes);
        if !report.is_complete() {
            return Err(ApplyError::InvalidDrafts(report));
        }

        let total = drafts.len();
        let mut committed = Vec::with_capacity(total);

        for (index, draft) in drafts.iter().enumerate() {
            let partial = |source: GitError| ApplyError::Partial {
                committed: index,
                total,
                draft_id: draft.id.clone(),
                source,
            };

            let mut seen = HashSet::new();
            let paths: Vec<&str> = draft
                .files
                .iter()
                .flat_map(|f| match changes.get(f) {
                    Some(record) => record.stage_paths(),
                    None => vec![f.as_str()],
                })
                .filter(|p| seen.insert(*p))
                .collect();

            self.vcs.reset_all().map_err(partial)?;
            self.vcs.add(&paths).map_err(partial)?;
            let hash = self.vcs.commit(&draft.message).map_err(|e| {
                warn!(draft = %draft.id, committed = index, total, "commit failed, earlier commits kept");
                partial(e)
            })?;

            let commit = CommittedDraft {
                draft_id: draft.id.clone(),
                hash,
                message: draft.message.clone(),
            };
            info!(
                draft = %commit.draft_id,
                hash = %commit.hash,
                files = paths.len(),
                "[{}/{}] {}",
                index + 1,
                total,
                draft.subject()
            );
            if let Some(observer) = self.observer {
                observer.on_draft_committed(index, total, &commit);
            }
            committed.push(commit);

            match self.vcs.status() {
                Ok(status) if !status.staged.is_empty() => {
                    debug!(leftover = ?status.staged, "index not empty after commit");
                }
                Ok(_) => {}
                Err(e) => debug!(error = %e, "status after commit failed"),
            }
        }

        Ok(committed)
    }
}
