//! Revision Loop
//!
//! State machine between proposal and application. The loop only edits the
//! in-memory `DraftSet`; the repository is not touched until the caller acts
//! on `ReviewOutcome::Apply`.

use super::draft::{DraftError, DraftSet};
use super::synthesizer::SynthesisError;
use crate::git::ChangeIndex;
use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, info, warn};

// ============================================================================
// States
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReviewState {
    Reviewing,
    Editing(usize),
    Viewing(usize),
    Regenerating,
    Applying,
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReviewAction {
    ApplyAll,
    EditMessage(usize),
    ViewDraft(usize),
    Regenerate,
    Cancel,
    /// Edit finished, view acknowledged or regeneration completed
    Done,
    /// Ctrl-C or closed input
    Interrupt,
}

impl ReviewState {
    /// Pure transition function; unknown pairs leave the state unchanged
    pub fn next(self, action: ReviewAction) -> ReviewState {
        use ReviewAction as A;
        use ReviewState as S;

        match (self, action) {
            (S::Applying, _) | (S::Cancelled, _) => self,
            (_, A::Interrupt) => S::Cancelled,
            (S::Reviewing, A::ApplyAll) => S::Applying,
            (S::Reviewing, A::EditMessage(i)) => S::Editing(i),
            (S::Reviewing, A::ViewDraft(i)) => S::Viewing(i),
            (S::Reviewing, A::Regenerate) => S::Regenerating,
            (S::Reviewing, A::Cancel) => S::Cancelled,
            (S::Editing(_), A::Done | A::Cancel) => S::Reviewing,
            (S::Viewing(_), A::Done | A::Cancel) => S::Reviewing,
            (S::Regenerating, A::Done | A::Cancel) => S::Reviewing,
            _ => self,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, ReviewState::Applying | ReviewState::Cancelled)
    }
}

// ============================================================================
// Collaborators
// ============================================================================

#[derive(Debug, Error)]
pub enum ReviewError {
    #[error("terminal I/O failed: {0}")]
    Io(#[from] std::io::Error),
}

/// Terminal side of the loop
pub trait ReviewPrompter {
    fn show_drafts(&mut self, drafts: &DraftSet, changes: &ChangeIndex);

    fn choose_action(&mut self, drafts: &DraftSet) -> Result<ReviewAction, ReviewError>;

    /// `None` when the user abandons the edit
    fn edit_message(&mut self, current: &str) -> Result<Option<String>, ReviewError>;

    fn show_draft(&mut self, index: usize, drafts: &DraftSet, changes: &ChangeIndex);

    fn show_error(&mut self, message: &str);
}

/// Re-runs the synthesizer with the inputs of the first proposal
#[async_trait]
pub trait Regenerate: Send + Sync {
    async fn regenerate(&self) -> Result<DraftSet, SynthesisError>;
}

#[derive(Debug)]
pub enum ReviewOutcome {
    Apply(DraftSet),
    Cancelled,
}

// ============================================================================
// Loop
// ============================================================================

pub struct RevisionLoop;

impl RevisionLoop {
    pub async fn run(
        mut drafts: DraftSet,
        changes: &ChangeIndex,
        prompter: &mut dyn ReviewPrompter,
        regenerator: &dyn Regenerate,
        interactive: bool,
    ) -> Result<ReviewOutcome, ReviewError> {
        if !interactive {
            debug!("non-interactive, applying proposal as is");
            return Ok(ReviewOutcome::Apply(drafts));
        }

        let mut state = ReviewState::Reviewing;
        prompter.show_drafts(&drafts, changes);

        loop {
            state = match state {
                ReviewState::Reviewing => {
                    let action = prompter.choose_action(&drafts)?;
                    let next = state.next(action);
                    if let ReviewState::Editing(i) | ReviewState::Viewing(i) = next {
                        if i >= drafts.len() {
                            prompter.show_error(&format!("There is no draft {}.", i + 1));
                            continue;
                        }
                    }
                    next
                }

                ReviewState::Editing(i) => {
                    let current = drafts.get(i).map(|d| d.message.clone()).unwrap_or_default();
                    let action = match prompter.edit_message(&current)? {
                        Some(message) => match drafts.set_message(i, message) {
                            Ok(()) => {
                                debug!(draft = i, "message edited");
                                prompter.show_drafts(&drafts, changes);
                                ReviewAction::Done
                            }
                            Err(DraftError::EmptyMessage) => ReviewAction::Cancel,
                            Err(e) => {
                                prompter.show_error(&e.to_string());
                                ReviewAction::Cancel
                            }
                        },
                        None => ReviewAction::Cancel,
                    };
                    state.next(action)
                }

                ReviewState::Viewing(i) => {
                    prompter.show_draft(i, &drafts, changes);
                    state.next(ReviewAction::Done)
                }

                ReviewState::Regenerating => {
                    match regenerator.regenerate().await {
                        Ok(fresh) => {
                            info!(drafts = fresh.len(), "proposal regenerated");
                            drafts = fresh;
                        }
                        Err(e) => {
                            warn!(error = %e, "regeneration failed, keeping previous proposal");
                            prompter.show_error(&format!("Regeneration failed: {e}"));
                        }
                    }
                    prompter.show_drafts(&drafts, changes);
                    state.next(ReviewAction::Done)
                }

                ReviewState::Applying => return Ok(ReviewOutcome::Apply(drafts)),
                ReviewState::Cancelled => return Ok(ReviewOutcome::Cancelled),
            };
        }
    }
}
