//! Draft Model
//!
//! A `DraftSet` is an ordered list of proposed commits. Drafts reference
//! changed files by path into the shared `ChangeIndex`; a valid set covers
//! every changed file exactly once.

use crate::git::ChangeIndex;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::fmt;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DraftError {
    #[error("draft {index} does not exist ({len} drafts)")]
    OutOfRange { index: usize, len: usize },

    #[error("commit message must not be empty")]
    EmptyMessage,
}

/// One proposed commit
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DraftCommit {
    pub id: String,
    pub message: String,
    pub files: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,
}

impl DraftCommit {
    pub fn new(id: impl Into<String>, message: impl Into<String>, files: Vec<String>) -> Self {
        Self {
            id: id.into(),
            message: message.into(),
            files,
            reasoning: None,
        }
    }

    /// First line of the message
    pub fn subject(&self) -> &str {
        self.message.lines().next().unwrap_or_default()
    }
}

/// Missing / duplicated / unknown paths relative to a `ChangeIndex`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CoverageReport {
    pub missing: Vec<String>,
    pub duplicated: Vec<String>,
    pub unknown: Vec<String>,
}

impl CoverageReport {
    pub fn is_complete(&self) -> bool {
        self.missing.is_empty() && self.duplicated.is_empty() && self.unknown.is_empty()
    }
}

impl fmt::Display for CoverageReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::new();
        if !self.missing.is_empty() {
            parts.push(format!("missing [{}]", self.missing.join(", ")));
        }
        if !self.duplicated.is_empty() {
            parts.push(format!("duplicated [{}]", self.duplicated.join(", ")));
        }
        if !self.unknown.is_empty() {
            parts.push(format!("unknown [{}]", self.unknown.join(", ")));
        }
        if parts.is_empty() {
            f.write_str("complete")
        } else {
            f.write_str(&parts.join("; "))
        }
    }
}

/// Per-draft line totals for display
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DraftSummary {
    pub files: usize,
    pub additions: u32,
    pub deletions: u32,
}

/// Ordered set of drafts plus an optional overall rationale
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DraftSet {
    pub drafts: Vec<DraftCommit>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rationale: Option<String>,
}

impl DraftSet {
    pub fn new(drafts: Vec<DraftCommit>) -> Self {
        Self {
            drafts,
            rationale: None,
        }
    }

    pub fn len(&self) -> usize {
        self.drafts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.drafts.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&DraftCommit> {
        self.drafts.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &DraftCommit> {
        self.drafts.iter()
    }

    /// Total file references across drafts
    pub fn file_count(&self) -> usize {
        self.drafts.iter().map(|d| d.files.len()).sum()
    }

    /// Replace a draft's message; file membership is not editable
    pub fn set_message(&mut self, index: usize, message: impl Into<String>) -> Result<(), DraftError> {
        let len = self.drafts.len();
        let draft = self
            .drafts
            .get_mut(index)
            .ok_or(DraftError::OutOfRange { index, len })?;

        let message = message.into();
        let message = message.trim_end();
        if message.trim().is_empty() {
            return Err(DraftError::EmptyMessage);
        }

        draft.message = message.to_string();
        Ok(())
    }

    pub fn check_coverage(&self, changes: &ChangeIndex) -> CoverageReport {
        let mut counts: HashMap<&str, usize> = HashMap::new();
        let mut report = CoverageReport::default();
        let mut reported_unknown = HashSet::new();

        for path in self.drafts.iter().flat_map(|d| d.files.iter()) {
            if !changes.contains(path) {
                if reported_unknown.insert(path.as_str()) {
                    report.unknown.push(path.clone());
                }
                continue;
            }
            let count = counts.entry(path.as_str()).or_default();
            *count += 1;
            if *count == 2 {
                report.duplicated.push(path.clone());
            }
        }

        report.missing = changes
            .paths()
            .filter(|p| !counts.contains_key(p))
            .map(String::from)
            .collect();

        report
    }

    pub fn is_valid(&self, changes: &ChangeIndex) -> bool {
        !self.drafts.is_empty() && self.check_coverage(changes).is_complete()
    }

    pub fn summary_lines(&self, changes: &ChangeIndex) -> Vec<DraftSummary> {
        self.drafts
            .iter()
            .map(|draft| {
                let records = draft.files.iter().filter_map(|f| changes.get(f));
                let (additions, deletions) = records
                    .fold((0, 0), |(a, d), r| (a + r.additions, d + r.deletions));
                DraftSummary {
                    files: draft.files.len(),
                    additions,
                    deletions,
                }
            })
            .collect()
    }
}
