//! Change Extractor
//!
//! Builds one `ChangeRecord` per changed file by merging the `--numstat`
//! line counts with the `--name-status` classification. The two streams are
//! produced independently and only loosely agree on paths (renames).

use super::ops::{unquote_path, GitError};
use super::traits::Vcs;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use tracing::debug;

// ============================================================================
// Types
// ============================================================================

/// Classification of a changed file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeStatus {
    Added,
    Modified,
    Deleted,
    Renamed,
}

impl ChangeStatus {
    /// Map a name-status code (`M`, `A`, `R100`, ...)
    pub fn from_code(code: &str) -> Self {
        match code.chars().next() {
            Some('A') | Some('C') => ChangeStatus::Added,
            Some('D') => ChangeStatus::Deleted,
            Some('R') => ChangeStatus::Renamed,
            _ => ChangeStatus::Modified,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeStatus::Added => "added",
            ChangeStatus::Modified => "modified",
            ChangeStatus::Deleted => "deleted",
            ChangeStatus::Renamed => "renamed",
        }
    }
}

impl fmt::Display for ChangeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One changed file, keyed by its final path
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChangeRecord {
    pub path: String,
    /// Pre-rename path, staged alongside `path` so the deletion side is committed too
    #[serde(skip_serializing_if = "Option::is_none")]
    pub old_path: Option<String>,
    pub additions: u32,
    pub deletions: u32,
    pub status: ChangeStatus,
    pub diff: String,
}

impl ChangeRecord {
    fn zero(path: impl Into<String>, status: ChangeStatus) -> Self {
        Self {
            path: path.into(),
            old_path: None,
            additions: 0,
            deletions: 0,
            status,
            diff: String::new(),
        }
    }

    /// Paths that must be staged to commit this change
    pub fn stage_paths(&self) -> Vec<&str> {
        let mut paths = Vec::with_capacity(2);
        if let Some(old) = self.old_path.as_deref() {
            paths.push(old);
        }
        paths.push(self.path.as_str());
        paths
    }
}

/// `(additions, deletions, path)` from `--numstat`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NumstatEntry {
    pub additions: u32,
    pub deletions: u32,
    pub path: String,
    pub old_path: Option<String>,
}

/// `(status, path[, old_path])` from `--name-status`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameStatusEntry {
    pub status: ChangeStatus,
    pub path: String,
    pub old_path: Option<String>,
}

/// Which side of the index to read
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeScope {
    /// Changes already in the index
    Staged,
    /// Unstaged tracked edits plus untracked files
    WorkingTree,
}

// ============================================================================
// ChangeIndex
// ============================================================================

/// Ordered path → ChangeRecord mapping shared by drafts
#[derive(Debug, Clone, Default)]
pub struct ChangeIndex {
    records: Vec<ChangeRecord>,
    by_path: HashMap<String, usize>,
}

impl ChangeIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace by path, keeping first-seen order
    pub fn insert(&mut self, record: ChangeRecord) {
        match self.by_path.get(&record.path) {
            Some(&i) => self.records[i] = record,
            None => {
                self.by_path.insert(record.path.clone(), self.records.len());
                self.records.push(record);
            }
        }
    }

    pub fn get(&self, path: &str) -> Option<&ChangeRecord> {
        self.by_path.get(path).map(|&i| &self.records[i])
    }

    fn get_mut(&mut self, path: &str) -> Option<&mut ChangeRecord> {
        self.by_path.get(path).map(|&i| &mut self.records[i])
    }

    pub fn contains(&self, path: &str) -> bool {
        self.by_path.contains_key(path)
    }

    /// Move an entry to a new key in place
    fn rekey(&mut self, from: &str, to: &str) {
        if let Some(i) = self.by_path.remove(from) {
            self.records[i].path = to.to_string();
            self.by_path.insert(to.to_string(), i);
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ChangeRecord> {
        self.records.iter()
    }

    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.records.iter().map(|r| r.path.as_str())
    }

    pub fn total_additions(&self) -> u32 {
        self.records.iter().map(|r| r.additions).sum()
    }

    pub fn total_deletions(&self) -> u32 {
        self.records.iter().map(|r| r.deletions).sum()
    }
}

impl FromIterator<ChangeRecord> for ChangeIndex {
    fn from_iter<I: IntoIterator<Item = ChangeRecord>>(iter: I) -> Self {
        let mut index = ChangeIndex::new();
        for record in iter {
            index.insert(record);
        }
        index
    }
}

// ============================================================================
// Parsing
// ============================================================================

/// `-` marks a binary file and counts as zero
fn parse_count(field: &str) -> u32 {
    field.trim().parse().unwrap_or(0)
}

/// Expand numstat rename notation: `old => new` or `dir/{old => new}/file`
fn split_rename(path: &str) -> (String, Option<String>) {
    if let (Some(open), Some(close)) = (path.find('{'), path.rfind('}')) {
        if open < close {
            let inner = &path[open + 1..close];
            if let Some((from, to)) = inner.split_once(" => ") {
                let prefix = &path[..open];
                let suffix = &path[close + 1..];
                let join = |middle: &str| {
                    format!("{}{}{}", prefix, middle, suffix).replace("//", "/")
                };
                return (join(to), Some(join(from)));
            }
        }
    }

    match path.split_once(" => ") {
        Some((from, to)) => (to.to_string(), Some(from.to_string())),
        None => (path.to_string(), None),
    }
}

/// Parse `--numstat` output
pub fn parse_numstat(output: &str) -> Vec<NumstatEntry> {
    output
        .lines()
        .filter_map(|line| {
            let mut fields = line.splitn(3, '\t');
            let additions = fields.next()?;
            let deletions = fields.next()?;
            let raw_path = unquote_path(fields.next()?);
            if raw_path.is_empty() {
                return None;
            }
            let (path, old_path) = split_rename(&raw_path);
            Some(NumstatEntry {
                additions: parse_count(additions),
                deletions: parse_count(deletions),
                path,
                old_path,
            })
        })
        .collect()
}

/// Parse `--name-status` output
pub fn parse_name_status(output: &str) -> Vec<NameStatusEntry> {
    output
        .lines()
        .filter_map(|line| {
            let fields: Vec<&str> = line.split('\t').collect();
            let code = fields.first()?.trim();
            if code.is_empty() {
                return None;
            }
            let status = ChangeStatus::from_code(code);

            // renames and copies carry `old<TAB>new`
            if fields.len() >= 3 {
                Some(NameStatusEntry {
                    status,
                    path: unquote_path(fields[2]),
                    old_path: (status == ChangeStatus::Renamed).then(|| unquote_path(fields[1])),
                })
            } else if fields.len() == 2 {
                Some(NameStatusEntry {
                    status,
                    path: unquote_path(fields[1]),
                    old_path: None,
                })
            } else {
                None
            }
        })
        .collect()
}

/// Merge the two query results into one record per final path
pub fn merge_change_records(
    numstat: &[NumstatEntry],
    name_status: &[NameStatusEntry],
) -> ChangeIndex {
    let mut index = ChangeIndex::new();

    for entry in numstat {
        let mut record = ChangeRecord::zero(&entry.path, ChangeStatus::Modified);
        record.additions = entry.additions;
        record.deletions = entry.deletions;
        record.old_path = entry.old_path.clone();
        index.insert(record);
    }

    for entry in name_status {
        if !index.contains(&entry.path) {
            match entry.old_path.as_deref() {
                Some(old) if index.contains(old) => index.rekey(old, &entry.path),
                _ => index.insert(ChangeRecord::zero(&entry.path, entry.status)),
            }
        }

        if let Some(record) = index.get_mut(&entry.path) {
            record.status = entry.status;
            if entry.old_path.is_some() {
                record.old_path = entry.old_path.clone();
            }
        }
    }

    index
}

/// Build a pseudo-diff for a file git does not track yet
pub fn synthesize_untracked_record(path: &str, content: Option<&[u8]>) -> ChangeRecord {
    let mut record = ChangeRecord::zero(path, ChangeStatus::Added);
    let header = format!("diff --git a/{path} b/{path}\nnew file mode 100644\n");

    let text = content
        .filter(|bytes| !bytes.contains(&0))
        .and_then(|bytes| std::str::from_utf8(bytes).ok());

    let Some(text) = text else {
        record.diff = format!("{header}Binary file {path} added\n");
        return record;
    };

    let lines: Vec<&str> = text.lines().collect();
    record.additions = lines.len() as u32;

    let mut diff = header;
    diff.push_str(&format!("--- /dev/null\n+++ b/{path}\n"));
    if !lines.is_empty() {
        diff.push_str(&format!("@@ -0,0 +1,{} @@\n", lines.len()));
        for line in &lines {
            diff.push('+');
            diff.push_str(line);
            diff.push('\n');
        }
    }
    record.diff = diff;
    record
}

// ============================================================================
// Extraction
// ============================================================================

/// Produce the change set for `scope`
pub fn extract_changes(vcs: &dyn Vcs, scope: ChangeScope) -> Result<ChangeIndex, GitError> {
    let staged = scope == ChangeScope::Staged;

    let numstat = parse_numstat(&vcs.numstat(staged)?);
    let name_status = parse_name_status(&vcs.name_status(staged)?);
    let mut index = ChangeIndex::new();
    for mut record in merge_change_records(&numstat, &name_status).records {
        record.diff = vcs.diff(staged, &record.stage_paths())?;
        index.insert(record);
    }

    if scope == ChangeScope::WorkingTree {
        let status = vcs.status()?;
        let untracked: Vec<String> = status
            .untracked
            .iter()
            .filter(|p| !index.contains(p))
            .cloned()
            .collect();
        for path in &untracked {
            let content = match vcs.read_worktree_file(path) {
                Ok(bytes) => Some(bytes),
                Err(e) => {
                    debug!(path = %path, error = %e, "untracked file unreadable");
                    None
                }
            };
            index.insert(synthesize_untracked_record(path, content.as_deref()));
        }
    }

    debug!(
        files = index.len(),
        additions = index.total_additions(),
        deletions = index.total_deletions(),
        ?scope,
        "changes extracted"
    );
    Ok(index)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::RecordingVcs;

    #[test]
    fn test_rename_merges_into_one_record() {
        let numstat = vec![NumstatEntry {
            additions: 3,
            deletions: 1,
            path: "a.ts".into(),
            old_path: None,
        }];
        let name_status = parse_name_status("R100\told.ts\ta.ts\n");
        let index = merge_change_records(&numstat, &name_status);

        assert_eq!(index.len(), 1);
        let record = index.get("a.ts").unwrap();
        assert_eq!((record.additions, record.deletions), (3, 1));
        assert_eq!(record.status, ChangeStatus::Renamed);
        assert_eq!(record.old_path.as_deref(), Some("old.ts"));
    }

    #[test]
    fn test_rename_found_by_old_path() {
        let numstat = parse_numstat("2\t2\told.ts\n");
        let name_status = parse_name_status("R090\told.ts\tnew.ts\n");
        let index = merge_change_records(&numstat, &name_status);

        assert_eq!(index.len(), 1);
        assert!(index.get("old.ts").is_none());
        let record = index.get("new.ts").unwrap();
        assert_eq!(record.additions, 2);
        assert_eq!(record.stage_paths(), vec!["old.ts", "new.ts"]);
    }

    #[test]
    fn test_binary_dash_is_zero() {
        let entries = parse_numstat("-\t-\timage.png\n");
        assert_eq!(entries[0].additions, 0);
        assert_eq!(entries[0].deletions, 0);
        assert_eq!(entries[0].path, "image.png");
    }

    #[test]
    fn test_numstat_brace_rename() {
        let entries = parse_numstat("1\t0\tsrc/{old => new}/mod.rs\n4\t4\tlib.rs => core.rs\n");
        assert_eq!(entries[0].path, "src/new/mod.rs");
        assert_eq!(entries[0].old_path.as_deref(), Some("src/old/mod.rs"));
        assert_eq!(entries[1].path, "core.rs");

        let moved_out = parse_numstat("0\t0\tsrc/{ => util}/x.rs\n");
        assert_eq!(moved_out[0].path, "src/util/x.rs");
        assert_eq!(moved_out[0].old_path.as_deref(), Some("src/x.rs"));
    }

    #[test]
    fn test_name_status_without_numstat_creates_zero_record() {
        let index = merge_change_records(&[], &parse_name_status("D\tgone.rs\n"));
        let record = index.get("gone.rs").unwrap();
        assert_eq!(record.status, ChangeStatus::Deleted);
        assert_eq!(record.additions, 0);
    }

    #[test]
    fn test_numstat_only_defaults_to_modified() {
        let index = merge_change_records(&parse_numstat("5\t0\tsrc/lib.rs\n"), &[]);
        assert_eq!(index.get("src/lib.rs").unwrap().status, ChangeStatus::Modified);
    }

    #[test]
    fn test_untracked_text_record() {
        let record = synthesize_untracked_record("notes.txt", Some(b"one\ntwo\n"));

        assert_eq!(record.status, ChangeStatus::Added);
        assert_eq!((record.additions, record.deletions), (2, 0));
        assert!(record.diff.starts_with("diff --git a/notes.txt b/notes.txt\n"));
        assert!(record.diff.contains("@@ -0,0 +1,2 @@\n+one\n+two\n"));
    }

    #[test]
    fn test_untracked_binary_record() {
        let record = synthesize_untracked_record("logo.png", Some(&[0x89, 0x50, 0x00, 0x01]));
        assert_eq!(record.additions, 0);
        assert!(record.diff.contains("Binary file logo.png"));

        let unreadable = synthesize_untracked_record("locked", None);
        assert!(unreadable.diff.contains("Binary file locked"));
    }

    #[test]
    fn test_extract_working_tree_includes_untracked() {
        let vcs = RecordingVcs::new()
            .with_numstat(false, "1\t1\tsrc/main.rs\n")
            .with_name_status(false, "M\tsrc/main.rs\n")
            .with_status("?? TODO.md\n M src/main.rs\n")
            .with_file("TODO.md", "- ship it\n");

        let index = extract_changes(&vcs, ChangeScope::WorkingTree).unwrap();

        assert_eq!(index.paths().collect::<Vec<_>>(), vec!["src/main.rs", "TODO.md"]);
        assert_eq!(index.get("TODO.md").unwrap().additions, 1);
        assert!(vcs.calls().contains(&"diff unstaged src/main.rs".to_string()));
    }

    #[test]
    fn test_extract_staged_skips_untracked() {
        let vcs = RecordingVcs::new()
            .with_numstat(true, "3\t0\tnew.rs\n")
            .with_name_status(true, "A\tnew.rs\n")
            .with_status("A  new.rs\n?? scratch.txt\n");

        let index = extract_changes(&vcs, ChangeScope::Staged).unwrap();

        assert_eq!(index.len(), 1);
        assert_eq!(index.get("new.rs").unwrap().status, ChangeStatus::Added);
        assert!(!vcs.calls().iter().any(|c| c == "status"));
    }
}
