//! Version control coordination specs (§4.6, §8.4 scenarios 5 and 6).

use crate::prelude::*;
use std::process::Command;
use std::process::Stdio;

fn git(dir: &std::path::Path, args: &[&str]) {
    let status = Command::new("git")
        .arg("-C")
        .arg(dir)
        .args(args)
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .expect("git should run");
    assert!(status.success(), "git {args:?} failed");
}

/// Initializes a repo on a fixed-name branch so tests don't depend on the
/// ambient `init.defaultBranch` setting.
fn init_repo(temp: &Project) {
    git(temp.path(), &["init", "-b", "trunk"]);
    git(temp.path(), &["config", "user.email", "test@example.com"]);
    git(temp.path(), &["config", "user.name", "Test"]);
}

#[test]
fn branch_reports_current_head() {
    let temp = Project::empty();
    init_repo(&temp);
    temp.file("README.md", "hello\n");
    git(temp.path(), &["add", "."]);
    git(temp.path(), &["commit", "-m", "initial"]);
    git(temp.path(), &["checkout", "-b", "manager-mgr_1_1"]);

    temp.oj().args(&["daemon", "start"]).passes();
    temp.oj()
        .args(&["vcc", "branch", temp.path().to_str().unwrap()])
        .passes()
        .stdout_has("manager-mgr_1_1");
}

#[test]
fn clean_merge_succeeds() {
    let temp = Project::empty();
    init_repo(&temp);
    temp.file("a.txt", "base\n");
    git(temp.path(), &["add", "."]);
    git(temp.path(), &["commit", "-m", "base"]);
    git(temp.path(), &["branch", "feature"]);
    git(temp.path(), &["checkout", "feature"]);
    temp.file("b.txt", "feature addition\n");
    git(temp.path(), &["add", "."]);
    git(temp.path(), &["commit", "-m", "add b"]);
    git(temp.path(), &["checkout", "trunk"]);

    temp.oj().args(&["daemon", "start"]).passes();
    temp.oj()
        .args(&["vcc", "merge", "feature", "trunk", temp.path().to_str().unwrap()])
        .passes()
        .stdout_has("merge succeeded");
}

/// Two branches editing the same line must conflict, and a failed auto merge
/// must leave the worktree exactly as it was before the merge was attempted.
#[test]
fn conflicting_merge_rolls_back_to_clean_state() {
    let temp = Project::empty();
    init_repo(&temp);
    temp.file("shared.txt", "line one\n");
    git(temp.path(), &["add", "."]);
    git(temp.path(), &["commit", "-m", "base"]);
    git(temp.path(), &["branch", "feature"]);

    temp.file("shared.txt", "line one from trunk\n");
    git(temp.path(), &["add", "."]);
    git(temp.path(), &["commit", "-m", "trunk edit"]);

    git(temp.path(), &["checkout", "feature"]);
    temp.file("shared.txt", "line one from feature\n");
    git(temp.path(), &["add", "."]);
    git(temp.path(), &["commit", "-m", "feature edit"]);
    git(temp.path(), &["checkout", "trunk"]);

    temp.oj().args(&["daemon", "start"]).passes();
    temp.oj()
        .args(&["vcc", "merge", "feature", "trunk", temp.path().to_str().unwrap()])
        .passes()
        .stdout_has("merge failed")
        .stdout_has("conflict: shared.txt");

    // the rolled-back worktree must be clean and still on trunk.
    temp.oj()
        .args(&["vcc", "status", temp.path().to_str().unwrap(), "-o", "json"])
        .passes()
        .stdout_has("\"branch\":\"trunk\"")
        .stdout_has("\"clean\":true");
}

#[test]
fn conflicts_reports_overlapping_paths() {
    let temp = Project::empty();
    init_repo(&temp);
    temp.file("shared.txt", "line one\n");
    git(temp.path(), &["add", "."]);
    git(temp.path(), &["commit", "-m", "base"]);
    git(temp.path(), &["branch", "branch-a"]);
    git(temp.path(), &["branch", "branch-b"]);

    git(temp.path(), &["checkout", "branch-a"]);
    temp.file("shared.txt", "from a\n");
    git(temp.path(), &["add", "."]);
    git(temp.path(), &["commit", "-m", "a edit"]);

    git(temp.path(), &["checkout", "branch-b"]);
    temp.file("shared.txt", "from b\n");
    git(temp.path(), &["add", "."]);
    git(temp.path(), &["commit", "-m", "b edit"]);

    temp.oj().args(&["daemon", "start"]).passes();
    temp.oj()
        .args(&["vcc", "conflicts", "branch-a", "branch-b", temp.path().to_str().unwrap(), "-o", "json"])
        .passes()
        .stdout_has("shared.txt");
}
