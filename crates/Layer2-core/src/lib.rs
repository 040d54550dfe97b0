//! commitforge-core: Core Runtime for CommitForge
//!
//! Layer2 - 변경 분석 및 커밋 구성 레이어
//!
//! # 주요 모듈
//!
//! - `git`: 버전 관리 협력자 (`Vcs` trait, `GitOps`) 및 Change Extractor
//! - `compose`: Draft 모델, Proposal Synthesizer, Revision Loop, Sequential Applier
//! - `deslop`: 스테이징된 변경에 대한 되돌릴 수 있는 정리 패치
//! - `reply`: 생성 응답에서 JSON / fenced block 추출
//!
//! # 사용 예시
//!
//! ```ignore
//! use commitforge_core::{extract_changes, ChangeScope, GitOps, ProposalSynthesizer, SequentialApplier};
//!
//! let git = GitOps::new(".")?;
//! let changes = extract_changes(&git, ChangeScope::Staged)?;
//!
//! let drafts = ProposalSynthesizer::new(gateway, selector, 6000)
//!     .synthesize(&changes, None)
//!     .await?;
//!
//! let committed = SequentialApplier::new(&git).apply(&drafts, &changes)?;
//! ```

pub mod compose;
pub mod deslop;
pub mod git;
pub mod reply;

#[cfg(test)]
pub(crate) mod test_support;

// Re-exports: Git
pub use git::{
    extract_changes, merge_change_records, parse_name_status, parse_numstat,
    synthesize_untracked_record, ChangeIndex, ChangeRecord, ChangeScope, ChangeStatus, GitError,
    GitOps, LogEntry, RepositoryStatus, Vcs,
};

// Re-exports: Compose
pub use compose::{
    heuristic_message, ApplyError, ApplyObserver, CommittedDraft, CoverageReport, DraftCommit,
    DraftError, DraftSet, DraftSummary, MessageGenerator, ProposalSynthesizer, Regenerate,
    ReviewAction, ReviewError, ReviewOutcome, ReviewPrompter, ReviewState, RevisionLoop,
    SequentialApplier, SynthesisError,
};

// Re-exports: Deslop
pub use deslop::{
    collect_inputs, extract_patch, looks_like_patch, resolve_base_ref, AppliedPatch, PatchError,
    PatchInputs, PatchSession, PatchWorkflow,
};

// Layer1 re-exports
pub use commitforge_foundation::{Error, Result};

/// Layer2 버전
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
