//! Git Integration Module
//!
//! The version-control side of the composer:
//! - `Vcs`: the collaborator interface (status, diff, add/reset, commit, apply)
//! - `GitOps`: `Vcs` implemented by shelling out to `git`
//! - `changes`: the Change Extractor (numstat + name-status merge)

pub mod changes;
pub mod ops;
pub mod traits;

pub use changes::{
    extract_changes, merge_change_records, parse_name_status, parse_numstat,
    synthesize_untracked_record, ChangeIndex, ChangeRecord, ChangeScope, ChangeStatus,
    NameStatusEntry, NumstatEntry,
};
pub use ops::{GitError, GitOps, LogEntry, RepositoryStatus};
pub use traits::Vcs;
