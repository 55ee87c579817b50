// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use oj_core::CoreError;
use std::process::Command as StdCommand;
use tempfile::TempDir;

fn git_available() -> bool {
    StdCommand::new("git").arg("--version").output().map(|o| o.status.success()).unwrap_or(false)
}

macro_rules! fail_if_no_git {
    () => {
        if !git_available() {
            panic!("git is required but not available");
        }
    };
}

fn init_repo(dir: &Path) {
    let run = |args: &[&str]| {
        StdCommand::new("git").arg("-C").arg(dir).args(args).output().unwrap()
    };
    run(&["init", "-q", "-b", "main"]);
    run(&["config", "user.email", "test@example.com"]);
    run(&["config", "user.name", "Test"]);
    std::fs::write(dir.join("README.md"), "hello\n").unwrap();
    run(&["add", "."]);
    run(&["commit", "-q", "-m", "initial"]);
}

#[test]
fn sanitize_ref_component_replaces_disallowed_characters() {
    assert_eq!(sanitize_ref_component("fix bug #42!"), "fix-bug-42");
    assert_eq!(sanitize_ref_component("already-valid_name.txt"), "already-valid_name.txt");
    assert_eq!(sanitize_ref_component("  leading and trailing  "), "leading-and-trailing");
}

#[test]
fn sanitize_ref_component_strips_leading_and_trailing_separators() {
    assert_eq!(sanitize_ref_component("---weird---"), "weird");
}

#[tokio::test]
async fn initialize_shared_workspace_is_idempotent() {
    fail_if_no_git!();
    let dir = TempDir::new().unwrap();
    init_repo(dir.path());

    initialize_shared_workspace(dir.path()).await.unwrap();
    initialize_shared_workspace(dir.path()).await.unwrap();

    let attrs = std::fs::read_to_string(dir.path().join(".gitattributes")).unwrap();
    assert!(attrs.contains("README.md merge=oj-union"));
    assert_eq!(attrs.lines().filter(|l| l.contains("README.md")).count(), 1);
}

#[tokio::test]
async fn initialize_shared_workspace_inits_a_repo_when_missing() {
    fail_if_no_git!();
    let dir = TempDir::new().unwrap();
    initialize_shared_workspace(dir.path()).await.unwrap();
    assert!(dir.path().join(".git").exists());
}

#[tokio::test]
async fn create_manager_branch_fails_without_a_repository() {
    fail_if_no_git!();
    let dir = TempDir::new().unwrap();
    let result = create_manager_branch(dir.path(), "mgr_1_1", None).await;
    assert!(matches!(result, Err(CoreError::NotARepository(_))));
}

#[tokio::test]
async fn create_manager_branch_names_it_after_the_manager_id() {
    fail_if_no_git!();
    let dir = TempDir::new().unwrap();
    init_repo(dir.path());

    let branch = create_manager_branch(dir.path(), "mgr_1_1", None).await.unwrap();
    assert_eq!(branch, "manager-mgr_1_1");
}

#[tokio::test]
async fn create_manager_branch_incorporates_sanitized_task_desc() {
    fail_if_no_git!();
    let dir = TempDir::new().unwrap();
    init_repo(dir.path());

    let branch = create_manager_branch(dir.path(), "mgr_1_1", Some("Fix Bug #42")).await.unwrap();
    assert_eq!(branch, "manager-mgr_1_1-Fix-Bug-42");
}

#[tokio::test]
async fn analyze_conflicts_detects_overlapping_paths() {
    fail_if_no_git!();
    let dir = TempDir::new().unwrap();
    init_repo(dir.path());
    let run = |args: &[&str]| StdCommand::new("git").arg("-C").arg(dir.path()).args(args).output().unwrap();

    run(&["checkout", "-q", "-b", "branch-a"]);
    std::fs::write(dir.path().join("shared.txt"), "a\n").unwrap();
    run(&["add", "."]);
    run(&["commit", "-q", "-m", "a"]);

    run(&["checkout", "-q", "main"]);
    run(&["checkout", "-q", "-b", "branch-b"]);
    std::fs::write(dir.path().join("shared.txt"), "b\n").unwrap();
    run(&["add", "."]);
    run(&["commit", "-q", "-m", "b"]);

    let report = analyze_conflicts("branch-a", "branch-b", dir.path()).await.unwrap();
    assert!(report.has_conflicts);
    assert!(report.files.contains(&"shared.txt".to_string()));
}

#[tokio::test]
async fn analyze_conflicts_empty_when_branches_touch_disjoint_paths() {
    fail_if_no_git!();
    let dir = TempDir::new().unwrap();
    init_repo(dir.path());
    let run = |args: &[&str]| StdCommand::new("git").arg("-C").arg(dir.path()).args(args).output().unwrap();

    run(&["checkout", "-q", "-b", "branch-a"]);
    std::fs::write(dir.path().join("a.txt"), "a\n").unwrap();
    run(&["add", "."]);
    run(&["commit", "-q", "-m", "a"]);

    run(&["checkout", "-q", "main"]);
    run(&["checkout", "-q", "-b", "branch-b"]);
    std::fs::write(dir.path().join("b.txt"), "b\n").unwrap();
    run(&["add", "."]);
    run(&["commit", "-q", "-m", "b"]);

    let report = analyze_conflicts("branch-a", "branch-b", dir.path()).await.unwrap();
    assert!(!report.has_conflicts);
}

#[tokio::test]
async fn coordinated_merge_auto_succeeds_cleanly_when_no_conflict() {
    fail_if_no_git!();
    let dir = TempDir::new().unwrap();
    init_repo(dir.path());
    let run = |args: &[&str]| StdCommand::new("git").arg("-C").arg(dir.path()).args(args).output().unwrap();

    run(&["checkout", "-q", "-b", "feature"]);
    std::fs::write(dir.path().join("new.txt"), "content\n").unwrap();
    run(&["add", "."]);
    run(&["commit", "-q", "-m", "feature work"]);
    run(&["checkout", "-q", "main"]);

    let outcome = coordinated_merge("feature", "main", dir.path(), MergeStrategy::Auto).await.unwrap();
    assert!(outcome.success);
    assert!(outcome.conflicts.is_none());
}

#[tokio::test]
async fn coordinated_merge_manual_reports_conflicts_without_committing() {
    fail_if_no_git!();
    let dir = TempDir::new().unwrap();
    init_repo(dir.path());
    let run = |args: &[&str]| StdCommand::new("git").arg("-C").arg(dir.path()).args(args).output().unwrap();

    run(&["checkout", "-q", "-b", "feature"]);
    std::fs::write(dir.path().join("conflict.rs"), "feature version\n").unwrap();
    run(&["add", "."]);
    run(&["commit", "-q", "-m", "feature"]);

    run(&["checkout", "-q", "main"]);
    std::fs::write(dir.path().join("conflict.rs"), "main version\n").unwrap();
    run(&["add", "."]);
    run(&["commit", "-q", "-m", "main"]);

    let outcome = coordinated_merge("feature", "main", dir.path(), MergeStrategy::Manual).await.unwrap();
    assert!(!outcome.success);
    assert!(outcome.conflicts.is_some());
}

#[tokio::test]
async fn coordinated_merge_auto_resolves_allow_listed_paths() {
    fail_if_no_git!();
    let dir = TempDir::new().unwrap();
    init_repo(dir.path());
    initialize_shared_workspace(dir.path()).await.unwrap();
    let run = |args: &[&str]| StdCommand::new("git").arg("-C").arg(dir.path()).args(args).output().unwrap();
    run(&["add", ".gitattributes"]);
    run(&["commit", "-q", "-m", "attrs"]);

    run(&["checkout", "-q", "-b", "feature"]);
    std::fs::write(dir.path().join("README.md"), "hello\nfeature line\n").unwrap();
    run(&["add", "."]);
    run(&["commit", "-q", "-m", "feature readme"]);

    run(&["checkout", "-q", "main"]);
    std::fs::write(dir.path().join("README.md"), "hello\nmain line\n").unwrap();
    run(&["add", "."]);
    run(&["commit", "-q", "-m", "main readme"]);

    let outcome = coordinated_merge("feature", "main", dir.path(), MergeStrategy::Auto).await.unwrap();
    assert!(outcome.success, "README.md conflicts should auto-resolve via the union driver");
}

#[tokio::test]
async fn git_status_reports_clean_tree_and_branch() {
    fail_if_no_git!();
    let dir = TempDir::new().unwrap();
    init_repo(dir.path());

    let report = git_status(dir.path()).await.unwrap();
    assert_eq!(report.branch, "main");
    assert!(report.clean);
    assert!(report.changed_files.is_empty());
}

#[tokio::test]
async fn git_status_lists_changed_files() {
    fail_if_no_git!();
    let dir = TempDir::new().unwrap();
    init_repo(dir.path());
    std::fs::write(dir.path().join("README.md"), "hello\nmore\n").unwrap();
    std::fs::write(dir.path().join("untracked.txt"), "new\n").unwrap();

    let report = git_status(dir.path()).await.unwrap();
    assert!(!report.clean);
    assert!(report.changed_files.contains(&"README.md".to_string()));
    assert!(report.changed_files.contains(&"untracked.txt".to_string()));
}

#[tokio::test]
async fn current_branch_fails_without_a_repository() {
    fail_if_no_git!();
    let dir = TempDir::new().unwrap();
    let result = current_branch(dir.path()).await;
    assert!(matches!(result, Err(CoreError::NotARepository(_))));
}

#[tokio::test]
async fn git_cleanup_deletes_merged_manager_branches_only() {
    fail_if_no_git!();
    let dir = TempDir::new().unwrap();
    init_repo(dir.path());
    let run = |args: &[&str]| StdCommand::new("git").arg("-C").arg(dir.path()).args(args).output().unwrap();

    run(&["branch", "manager-mgr_1_1"]);
    run(&["checkout", "-q", "-b", "feature"]);
    std::fs::write(dir.path().join("f.txt"), "x\n").unwrap();
    run(&["add", "."]);
    run(&["commit", "-q", "-m", "feature"]);
    run(&["checkout", "-q", "main"]);

    let deleted = git_cleanup(dir.path()).await.unwrap();
    assert_eq!(deleted, vec!["manager-mgr_1_1".to_string()]);
}

#[tokio::test]
async fn atomic_operation_reports_success_when_all_steps_succeed() {
    fail_if_no_git!();
    let dir = TempDir::new().unwrap();
    init_repo(dir.path());

    let steps: Vec<AtomicStep> = vec![Box::new(|_d: &Path| Box::pin(async { Ok("step-one".to_string()) }))];
    let outcome = atomic_operation(dir.path(), "test-op", 1000, steps).await.unwrap();
    assert!(outcome.success);
    assert!(!outcome.rolled_back);
    assert_eq!(outcome.results, vec!["step-one".to_string()]);
}

#[tokio::test]
async fn atomic_operation_rolls_back_on_step_failure() {
    fail_if_no_git!();
    let dir = TempDir::new().unwrap();
    init_repo(dir.path());
    let run = |args: &[&str]| StdCommand::new("git").arg("-C").arg(dir.path()).args(args).output().unwrap();
    let (_, head_before, _) = (true, String::from_utf8(run(&["rev-parse", "HEAD"]).stdout).unwrap(), String::new());

    let steps: Vec<AtomicStep> = vec![
        Box::new(|d: &Path| {
            let d = d.to_path_buf();
            Box::pin(async move {
                std::fs::write(d.join("new_file.txt"), "x").unwrap();
                StdCommand::new("git").arg("-C").arg(&d).args(["add", "."]).output().unwrap();
                StdCommand::new("git").arg("-C").arg(&d).args(["commit", "-q", "-m", "intermediate"]).output().unwrap();
                Ok("committed".to_string())
            })
        }),
        Box::new(|_d: &Path| Box::pin(async { Err("simulated failure".to_string()) })),
    ];

    let outcome = atomic_operation(dir.path(), "failing-op", 2000, steps).await.unwrap();
    assert!(!outcome.success);
    assert!(outcome.rolled_back);

    let (_, head_after, _) = (true, String::from_utf8(run(&["rev-parse", "HEAD"]).stdout).unwrap(), String::new());
    assert_eq!(head_before.trim(), head_after.trim(), "head should be restored after rollback");
}
