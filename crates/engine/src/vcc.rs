// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Version Control Coordinator (§4.6): a transactional façade over a `git`
//! working tree, shelling out to the `git` CLI the way
//! [`oj_adapters::session::TmuxAdapter`] shells out to `tmux` — spawn,
//! inspect the exit code, map failures onto [`oj_core::CoreError`].

use oj_core::{Checkpoint, CoreError, CoreResult, ConflictReport};
use std::collections::BTreeSet;
use std::future::Future;
use std::path::Path;
use std::pin::Pin;
use std::time::Duration;
use tokio::process::Command;

/// A single step of an [`atomic_operation`]: given the worktree path,
/// returns a human-readable result or a failure reason to roll back on.
pub type AtomicStep =
    Box<dyn FnOnce(&Path) -> Pin<Box<dyn Future<Output = Result<String, String>> + Send>> + Send>;

/// Mirrors [`oj_adapters::subprocess::GIT_WORKTREE_TIMEOUT`]; duplicated
/// here rather than pulled in as a dependency since the VCC is the only
/// caller of `git` and oj-adapters has no reason to know about it.
const GIT_TIMEOUT: Duration = Duration::from_secs(60);

const UNION_MERGE_ATTRIBUTES_FILE: &str = ".gitattributes";
const UNION_MERGE_DRIVER_NAME: &str = "oj-union";

#[derive(Debug, Clone, PartialEq)]
pub struct MergeOutcome {
    pub success: bool,
    pub strategy_used: MergeStrategy,
    pub conflicts: Option<ConflictReport>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeStrategy {
    Auto,
    Manual,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AtomicOutcome {
    pub success: bool,
    pub rolled_back: bool,
    pub results: Vec<String>,
}

/// Live worktree status, as returned by the `git_status` verb (§6).
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct GitStatusReport {
    pub branch: String,
    pub clean: bool,
    pub changed_files: Vec<String>,
}

async fn git(dir: &Path, args: &[&str]) -> Result<(bool, String, String), CoreError> {
    let output = Command::new("git")
        .arg("-C")
        .arg(dir)
        .args(args)
        .output();
    match tokio::time::timeout(GIT_TIMEOUT, output).await {
        Ok(Ok(output)) => Ok((
            output.status.success(),
            String::from_utf8_lossy(&output.stdout).to_string(),
            String::from_utf8_lossy(&output.stderr).to_string(),
        )),
        Ok(Err(e)) => Err(CoreError::Internal(format!("git {args:?} failed to start: {e}"))),
        Err(_) => Err(CoreError::Internal(format!("git {args:?} timed out"))),
    }
}

async fn is_repository(dir: &Path) -> bool {
    git(dir, &["rev-parse", "--git-dir"]).await.map(|(ok, _, _)| ok).unwrap_or(false)
}

/// `create_manager_branch`'s sanitization rule (§4.6): allowed characters
/// are `[A-Za-z0-9_./-]`; disallowed characters and whitespace become `-`;
/// leading/trailing separators are stripped.
pub fn sanitize_ref_component(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        if c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '/' | '-') {
            out.push(c);
        } else {
            out.push('-');
        }
    }
    out.trim_matches(|c| c == '-' || c == '/' || c == '.').to_string()
}

/// Idempotent: ensures `dir` is a repository, records its current head
/// branch as the base branch, and installs the union merge driver and
/// attributes for the auto-resolvable allow-list (§4.6).
pub async fn initialize_shared_workspace(dir: &Path) -> CoreResult<()> {
    if !is_repository(dir).await {
        let (ok, _, stderr) = git(dir, &["init"]).await?;
        if !ok {
            return Err(CoreError::NotARepository(stderr));
        }
    }

    git(dir, &["config", "--local", &format!("merge.{UNION_MERGE_DRIVER_NAME}.name"), "union merge driver"]).await?;
    git(
        dir,
        &[
            "config",
            "--local",
            &format!("merge.{UNION_MERGE_DRIVER_NAME}.driver"),
            "git merge-file --union %A %O %B",
        ],
    )
    .await?;

    let attributes_path = dir.join(UNION_MERGE_ATTRIBUTES_FILE);
    let mut lines = match tokio::fs::read_to_string(&attributes_path).await {
        Ok(content) => content.lines().map(str::to_string).collect::<Vec<_>>(),
        Err(_) => Vec::new(),
    };
    for pattern in oj_core::allow_list_patterns() {
        let rule = format!("{pattern} merge={UNION_MERGE_DRIVER_NAME}");
        if !lines.iter().any(|l| l == &rule) {
            lines.push(rule);
        }
    }
    tokio::fs::write(&attributes_path, lines.join("\n") + "\n")
        .await
        .map_err(|e| CoreError::Internal(e.to_string()))?;

    Ok(())
}

/// Creates `manager-<manager_id>` (or a sanitized variant carrying a task
/// tag) and checks it out. Fails `NotARepository`/`InvalidRef` per §4.6.
pub async fn create_manager_branch(dir: &Path, manager_id: &str, task_desc: Option<&str>) -> CoreResult<String> {
    if !is_repository(dir).await {
        return Err(CoreError::NotARepository(dir.display().to_string()));
    }

    let branch_name = match task_desc {
        Some(desc) if !desc.trim().is_empty() => {
            format!("manager-{}-{}", sanitize_ref_component(manager_id), sanitize_ref_component(desc))
        }
        _ => format!("manager-{}", sanitize_ref_component(manager_id)),
    };
    let branch_name = branch_name.trim_matches('-').to_string();
    if branch_name.is_empty() || branch_name == "manager" {
        return Err(CoreError::InvalidRef(format!(
            "sanitized branch name for manager {manager_id} is empty or invalid"
        )));
    }

    let (ok, _, stderr) = git(dir, &["checkout", "-b", &branch_name]).await?;
    if !ok {
        return Err(CoreError::InvalidRef(format!("creating branch {branch_name}: {stderr}")));
    }
    Ok(branch_name)
}

/// Paths modified on both `branch_a` and `branch_b` since their merge base.
pub async fn analyze_conflicts(branch_a: &str, branch_b: &str, dir: &Path) -> CoreResult<ConflictReport> {
    let (ok, base, stderr) = git(dir, &["merge-base", branch_a, branch_b]).await?;
    if !ok {
        return Err(CoreError::InvalidRef(format!("no merge base for {branch_a}/{branch_b}: {stderr}")));
    }
    let base = base.trim();

    let changed = |branch: &str| {
        let base = base.to_string();
        let branch = branch.to_string();
        let dir = dir.to_path_buf();
        async move {
            let (_, stdout, _) = git(&dir, &["diff", "--name-only", &base, &branch]).await?;
            Ok::<BTreeSet<String>, CoreError>(stdout.lines().map(str::to_string).collect())
        }
    };

    let files_a = changed(branch_a).await?;
    let files_b = changed(branch_b).await?;
    let overlap: Vec<String> = files_a.intersection(&files_b).cloned().collect();

    Ok(ConflictReport::from_conflicting_paths(overlap))
}

/// Strategy `auto`: merge, then restrict resolution to the auto-resolvable
/// allow-list. Strategy `manual`: merge and leave a dirty worktree on
/// conflict. Both guarantee the worktree returns to a clean state on
/// failure (§4.6).
pub async fn coordinated_merge(
    src: &str,
    dst: &str,
    dir: &Path,
    strategy: MergeStrategy,
) -> CoreResult<MergeOutcome> {
    git(dir, &["checkout", dst]).await?;

    let (ok, _, _) = git(dir, &["merge", "--no-edit", src]).await?;
    if ok {
        return Ok(MergeOutcome { success: true, strategy_used: strategy, conflicts: None });
    }

    let report = analyze_conflicts(dst, src, dir).await.unwrap_or_else(|_| ConflictReport::clean());

    match strategy {
        MergeStrategy::Auto if report.manual_only_paths().is_empty() => {
            for path in &report.auto_resolvable {
                git(dir, &["add", path]).await?;
            }
            let (ok, _, _) = git(dir, &["commit", "--no-edit"]).await?;
            Ok(MergeOutcome { success: ok, strategy_used: strategy, conflicts: None })
        }
        MergeStrategy::Auto => {
            git(dir, &["merge", "--abort"]).await?;
            Ok(MergeOutcome { success: false, strategy_used: strategy, conflicts: Some(report) })
        }
        MergeStrategy::Manual => Ok(MergeOutcome { success: false, strategy_used: strategy, conflicts: Some(report) }),
    }
}

/// Captures the current head, stashes uncommitted changes into a named ref,
/// and records the op name for rollback (§4.6).
async fn checkpoint(dir: &Path, op_name: &str, now_ms: u64) -> CoreResult<Checkpoint> {
    let (_, head, _) = git(dir, &["rev-parse", "HEAD"]).await?;
    let head = head.trim().to_string();

    let stash_ref = format!("refs/oj-checkpoints/{op_name}-{now_ms}");
    let (worktree_clean, _, _) = git(dir, &["diff", "--quiet", "HEAD"]).await?;
    if !worktree_clean {
        let (ok, stash_sha, _) = git(dir, &["stash", "create"]).await?;
        if ok && !stash_sha.trim().is_empty() {
            git(dir, &["update-ref", &stash_ref, stash_sha.trim()]).await?;
            git(dir, &["stash", "clear"]).await?;
        }
    }

    Ok(Checkpoint::new(op_name, head, stash_ref, now_ms))
}

/// Restores `dir` to the state captured in `cp`. Returns whether rollback
/// itself succeeded.
async fn rollback(dir: &Path, cp: &Checkpoint) -> bool {
    let (reset_ok, _, _) = git(dir, &["reset", "--hard", &cp.branch_ref]).await.map(|(ok, o, e)| (ok, o, e)).unwrap_or((false, String::new(), String::new()));
    let (has_stash, _, _) = git(dir, &["rev-parse", "--verify", &cp.worktree_snapshot_ref]).await.unwrap_or((false, String::new(), String::new()));
    if has_stash {
        let _ = git(dir, &["stash", "apply", &cp.worktree_snapshot_ref]).await;
        let _ = git(dir, &["update-ref", "-d", &cp.worktree_snapshot_ref]).await;
    }
    reset_ok
}

/// Runs `steps` sequentially against the worktree. On any step's failure,
/// rolls back to the pre-op checkpoint in reverse order (§4.6).
///
/// Steps receive no implicit transaction handle — they're plain async
/// closures that mutate `dir` through git directly.
pub async fn atomic_operation(
    dir: &Path,
    op_name: &str,
    now_ms: u64,
    steps: Vec<AtomicStep>,
) -> CoreResult<AtomicOutcome> {
    let cp = checkpoint(dir, op_name, now_ms).await?;
    let mut results = Vec::with_capacity(steps.len());

    for step in steps {
        match step(dir).await {
            Ok(result) => results.push(result),
            Err(reason) => {
                tracing::warn!(op_name, reason, "atomic_operation step failed, rolling back");
                let rolled_back = rollback(dir, &cp).await;
                return Ok(AtomicOutcome { success: false, rolled_back, results });
            }
        }
    }

    Ok(AtomicOutcome { success: true, rolled_back: false, results })
}

/// `git_status` (§6): current branch, working-tree cleanliness, and the
/// list of changed paths.
pub async fn git_status(dir: &Path) -> CoreResult<GitStatusReport> {
    if !is_repository(dir).await {
        return Err(CoreError::NotARepository(dir.display().to_string()));
    }
    let branch = current_branch(dir).await?;
    let (_, porcelain, _) = git(dir, &["status", "--porcelain"]).await?;
    let changed_files: Vec<String> = porcelain
        .lines()
        .filter_map(|line| line.get(3..).map(str::to_string))
        .collect();
    Ok(GitStatusReport { branch, clean: changed_files.is_empty(), changed_files })
}

/// `git_branch` (§6): the worktree's current branch name, read live from
/// `git` rather than the stored `Instance.branch_name` field (distinct from
/// [`crate::supervisor::Supervisor::get_branch`]).
pub async fn current_branch(dir: &Path) -> CoreResult<String> {
    if !is_repository(dir).await {
        return Err(CoreError::NotARepository(dir.display().to_string()));
    }
    let (ok, stdout, stderr) = git(dir, &["rev-parse", "--abbrev-ref", "HEAD"]).await?;
    if !ok {
        return Err(CoreError::InvalidRef(stderr));
    }
    Ok(stdout.trim().to_string())
}

/// `git_cleanup` (§6): deletes merged manager/specialist branches other
/// than the one currently checked out. Returns the names deleted.
pub async fn git_cleanup(dir: &Path) -> CoreResult<Vec<String>> {
    if !is_repository(dir).await {
        return Err(CoreError::NotARepository(dir.display().to_string()));
    }
    let current = current_branch(dir).await?;
    let (_, stdout, _) = git(dir, &["branch", "--merged"]).await?;
    let mut deleted = Vec::new();
    for line in stdout.lines() {
        let name = line.trim_start_matches('*').trim();
        if name.is_empty() || name == current || !name.starts_with("manager-") {
            continue;
        }
        let (ok, _, _) = git(dir, &["branch", "-d", name]).await?;
        if ok {
            deleted.push(name.to_string());
        }
    }
    Ok(deleted)
}

#[cfg(test)]
#[path = "vcc_tests.rs"]
mod tests;
