//! Deslop: cleanup patches for staged changes

pub mod patch;

pub use patch::{
    collect_inputs, extract_patch, looks_like_patch, resolve_base_ref, AppliedPatch, PatchError,
    PatchInputs, PatchSession, PatchWorkflow,
};
