//! 실제 git 저장소를 대상으로 한 통합 테스트
//!
//! `cargo test -p commitforge-core --test git_roundtrip`
//! git 이 PATH 에 없으면 각 테스트는 아무것도 하지 않고 통과한다.

use commitforge_core::{
    extract_changes, extract_patch, ChangeScope, ChangeStatus, DraftCommit, DraftSet, GitOps,
    PatchError, PatchWorkflow, SequentialApplier, Vcs,
};
use commitforge_foundation::ModelSelector;
use commitforge_provider::{Gateway, Provider, ProviderError, ProviderFactory};
use std::fs;
use std::path::Path;
use std::process::Command;
use std::sync::Arc;
use tempfile::TempDir;

fn git(dir: &Path, args: &[&str]) -> String {
    let output = Command::new("git")
        .args(args)
        .current_dir(dir)
        .output()
        .expect("git should run");
    assert!(
        output.status.success(),
        "git {:?} failed: {}",
        args,
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8_lossy(&output.stdout).into_owned()
}

/// Fresh repository with one commit, or `None` when git is unavailable
fn repo(files: &[(&str, &str)]) -> Option<(TempDir, GitOps)> {
    if which::which("git").is_err() {
        eprintln!("git not found, skipping");
        return None;
    }

    let dir = TempDir::new().expect("tempdir");
    let root = dir.path();
    git(root, &["init", "-q"]);
    git(root, &["config", "user.name", "Test User"]);
    git(root, &["config", "user.email", "test@example.com"]);
    git(root, &["config", "commit.gpgsign", "false"]);

    for (path, content) in files {
        write(root, path, content);
    }
    git(root, &["add", "-A"]);
    git(root, &["commit", "-q", "-m", "init"]);

    let ops = GitOps::new(root).expect("open repo");
    Some((dir, ops))
}

fn write(root: &Path, path: &str, content: &str) {
    let full = root.join(path);
    if let Some(parent) = full.parent() {
        fs::create_dir_all(parent).expect("mkdir");
    }
    fs::write(full, content).expect("write");
}

/// The patch workflow never reaches the collaborator in these tests
struct NoProvider;

impl ProviderFactory for NoProvider {
    fn create(&self, _: &ModelSelector) -> Result<Arc<dyn Provider>, ProviderError> {
        Err(ProviderError::NotConfigured("offline".to_string()))
    }
}

fn workflow(ops: &GitOps) -> PatchWorkflow<'_> {
    PatchWorkflow::new(
        ops,
        Gateway::new(Arc::new(NoProvider)),
        ModelSelector::new("none", "none"),
        4000,
    )
}

const CLEANUP: &str = "\
diff --git a/src/lib.rs b/src/lib.rs
--- a/src/lib.rs
+++ b/src/lib.rs
@@ -1,3 +1,2 @@
-// increment x by one
 x += 1;
 y += 2;
";

#[test]
fn test_patch_round_trip_restores_staged_diff() {
    let Some((dir, ops)) = repo(&[("src/lib.rs", "// increment x by one\nx += 1;\n")]) else {
        return;
    };
    write(dir.path(), "src/lib.rs", "// increment x by one\nx += 1;\ny += 2;\n");
    ops.add(&["src/lib.rs"]).unwrap();

    let before = ops.diff(true, &[]).unwrap();
    let flow = workflow(&ops);
    let session = extract_patch(&format!("Drop the narrating comment.\n```diff\n{CLEANUP}```")).unwrap();

    let applied = flow.apply(&session).unwrap();
    let during = ops.diff(true, &[]).unwrap();
    assert_ne!(before, during);
    assert_eq!(ops.show_file("", "src/lib.rs").unwrap(), "x += 1;\ny += 2;\n");
    assert_eq!(applied.restaged().to_vec(), vec!["src/lib.rs".to_string()]);
    assert!(ops.diff(false, &[]).unwrap().is_empty());

    flow.revert(applied).unwrap();
    let after = ops.diff(true, &[]).unwrap();
    assert_eq!(before, after);
}

#[test]
fn test_round_trip_leaves_partially_staged_file_alone() {
    let Some((dir, ops)) = repo(&[
        ("src/lib.rs", "// increment x by one\nx += 1;\n"),
        ("b.txt", "b\n"),
    ]) else {
        return;
    };
    write(dir.path(), "src/lib.rs", "// increment x by one\nx += 1;\ny += 2;\n");
    write(dir.path(), "b.txt", "b\nstaged\n");
    ops.add(&["src/lib.rs", "b.txt"]).unwrap();
    write(dir.path(), "b.txt", "b\nstaged\nUNSTAGED WIP\n");

    let staged_before = ops.diff(true, &[]).unwrap();
    let unstaged_before = ops.diff(false, &[]).unwrap();
    let flow = workflow(&ops);

    let applied = flow.apply(&extract_patch(CLEANUP).unwrap()).unwrap();
    assert!(!ops.diff(true, &["b.txt"]).unwrap().contains("UNSTAGED WIP"));
    assert!(ops.diff(false, &["b.txt"]).unwrap().contains("+UNSTAGED WIP"));

    flow.revert(applied).unwrap();
    assert_eq!(ops.diff(true, &[]).unwrap(), staged_before);
    assert_eq!(ops.diff(false, &[]).unwrap(), unstaged_before);
}

#[test]
fn test_round_trip_with_patch_outside_staged_set() {
    let Some((dir, ops)) = repo(&[
        ("src/lib.rs", "// increment x by one\nx += 1;\n"),
        ("c.txt", "keep\n// TODO remove\n"),
    ]) else {
        return;
    };
    write(dir.path(), "src/lib.rs", "// increment x by one\nx += 1;\ny += 2;\n");
    ops.add(&["src/lib.rs"]).unwrap();

    let patch = format!(
        "{CLEANUP}diff --git a/c.txt b/c.txt\n--- a/c.txt\n+++ b/c.txt\n@@ -1,2 +1 @@\n keep\n-// TODO remove\n"
    );
    let staged_before = ops.diff(true, &[]).unwrap();
    let unstaged_before = ops.diff(false, &[]).unwrap();
    let flow = workflow(&ops);

    let applied = flow.apply(&extract_patch(&patch).unwrap()).unwrap();
    assert_eq!(applied.released().to_vec(), vec!["c.txt".to_string()]);
    assert!(!ops.status().unwrap().staged.contains("c.txt"));
    assert_eq!(fs::read_to_string(dir.path().join("c.txt")).unwrap(), "keep\n");

    flow.revert(applied).unwrap();
    assert_eq!(ops.diff(true, &[]).unwrap(), staged_before);
    assert_eq!(ops.diff(false, &[]).unwrap(), unstaged_before);
    assert_eq!(
        fs::read_to_string(dir.path().join("c.txt")).unwrap(),
        "keep\n// TODO remove\n"
    );
}

#[test]
fn test_revert_without_apply_is_rejected() {
    let Some((dir, ops)) = repo(&[("src/lib.rs", "// increment x by one\nx += 1;\n")]) else {
        return;
    };
    write(dir.path(), "src/lib.rs", "// increment x by one\nx += 1;\ny += 2;\n");
    ops.add(&["src/lib.rs"]).unwrap();

    let flow = workflow(&ops);
    let applied = flow.apply(&extract_patch(CLEANUP).unwrap()).unwrap();

    // discard everything behind the workflow's back
    git(dir.path(), &["reset", "-q", "--hard"]);

    let err = flow.revert(applied).unwrap_err();
    assert!(matches!(err, PatchError::NotApplied));
}

#[test]
fn test_sequential_commits_keep_boundaries() {
    let Some((dir, ops)) = repo(&[("x.txt", "x\n"), ("y.txt", "y\n")]) else {
        return;
    };
    write(dir.path(), "x.txt", "x\nx2\n");
    write(dir.path(), "y.txt", "y\ny2\n");
    write(dir.path(), "z.txt", "new\n");

    let changes = extract_changes(&ops, ChangeScope::WorkingTree).unwrap();
    assert_eq!(changes.len(), 3);
    assert_eq!(changes.get("z.txt").unwrap().status, ChangeStatus::Added);

    // content staged before applying must not leak into the first commit
    ops.add(&["y.txt"]).unwrap();

    let drafts = DraftSet::new(vec![
        DraftCommit::new("1", "feat: x", vec!["x.txt".to_string()]),
        DraftCommit::new("2", "feat: y and z", vec!["y.txt".to_string(), "z.txt".to_string()]),
    ]);

    let committed = SequentialApplier::new(&ops).apply(&drafts, &changes).unwrap();
    assert_eq!(committed.len(), 2);

    let subjects = git(dir.path(), &["log", "--format=%s", "-n", "3"]);
    assert_eq!(subjects, "feat: y and z\nfeat: x\ninit\n");

    let first = git(dir.path(), &["show", "--name-only", "--format=", "HEAD~1"]);
    assert_eq!(first.trim(), "x.txt");
    let second = git(dir.path(), &["show", "--name-only", "--format=", "HEAD"]);
    assert_eq!(
        second.lines().filter(|l| !l.is_empty()).collect::<Vec<_>>(),
        vec!["y.txt", "z.txt"]
    );

    assert!(ops.status().unwrap().is_clean());
}

#[test]
fn test_staged_rename_is_one_record() {
    let Some((dir, ops)) = repo(&[("old.txt", "a\nb\nc\nd\ne\n")]) else {
        return;
    };
    git(dir.path(), &["mv", "old.txt", "new.txt"]);
    write(dir.path(), "new.txt", "a\nb\nc\nd\ne\nf\n");
    ops.add(&["new.txt"]).unwrap();

    let changes = extract_changes(&ops, ChangeScope::Staged).unwrap();

    assert_eq!(changes.len(), 1);
    let record = changes.get("new.txt").unwrap();
    assert_eq!(record.status, ChangeStatus::Renamed);
    assert_eq!(record.old_path.as_deref(), Some("old.txt"));
    assert_eq!((record.additions, record.deletions), (1, 0));

    let drafts = DraftSet::new(vec![DraftCommit::new("1", "refactor: rename", vec!["new.txt".to_string()])]);
    SequentialApplier::new(&ops).apply(&drafts, &changes).unwrap();

    let files = git(dir.path(), &["show", "--name-status", "--format=", "HEAD"]);
    assert!(files.trim_start().starts_with('R'));
    assert!(ops.status().unwrap().is_clean());
}
