//! Compose pipeline
//!
//! changes → `ProposalSynthesizer` → `DraftSet` ⇄ `RevisionLoop` → `SequentialApplier`

pub mod applier;
pub mod draft;
pub mod message;
pub mod review;
pub mod synthesizer;

pub use applier::{ApplyError, ApplyObserver, CommittedDraft, SequentialApplier};
pub use draft::{CoverageReport, DraftCommit, DraftError, DraftSet, DraftSummary};
pub use message::{heuristic_message, MessageGenerator};
pub use review::{
    Regenerate, ReviewAction, ReviewError, ReviewOutcome, ReviewPrompter, ReviewState,
    RevisionLoop,
};
pub use synthesizer::{truncate_diff, ProposalSynthesizer, SynthesisError};
