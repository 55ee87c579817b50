// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Instance roles and the static role → verb capability table (spec §4.8).

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Tier of an instance within the supervision hierarchy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Executive,
    Manager,
    Specialist,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Executive => "executive",
            Role::Manager => "manager",
            Role::Specialist => "specialist",
        }
    }

    /// Whether this role may own children of the given role.
    pub fn may_parent(&self, child: Role) -> bool {
        matches!(
            (self, child),
            (Role::Executive, Role::Manager) | (Role::Manager, Role::Specialist)
        )
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An RPC verb an instance may be permitted to invoke (spec §4.8, §6).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verb {
    Spawn,
    Send,
    Read,
    List,
    Terminate,
    Restart,
    MergeBranch,
    GetProgress,
    GetBranch,
    ExecuteParallel,
    DistributeWork,
    GetParallelStatus,
    GitStatus,
    GitBranch,
    GitConflicts,
    GitMerge,
    GitCleanup,
    GetPerformance,
    OptimizeSettings,
    PrewarmResources,
}

impl Verb {
    pub const ALL: &'static [Verb] = &[
        Verb::Spawn,
        Verb::Send,
        Verb::Read,
        Verb::List,
        Verb::Terminate,
        Verb::Restart,
        Verb::MergeBranch,
        Verb::GetProgress,
        Verb::GetBranch,
        Verb::ExecuteParallel,
        Verb::DistributeWork,
        Verb::GetParallelStatus,
        Verb::GitStatus,
        Verb::GitBranch,
        Verb::GitConflicts,
        Verb::GitMerge,
        Verb::GitCleanup,
        Verb::GetPerformance,
        Verb::OptimizeSettings,
        Verb::PrewarmResources,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Verb::Spawn => "spawn",
            Verb::Send => "send",
            Verb::Read => "read",
            Verb::List => "list",
            Verb::Terminate => "terminate",
            Verb::Restart => "restart",
            Verb::MergeBranch => "merge_branch",
            Verb::GetProgress => "get_progress",
            Verb::GetBranch => "get_branch",
            Verb::ExecuteParallel => "execute_parallel",
            Verb::DistributeWork => "distribute_work",
            Verb::GetParallelStatus => "get_parallel_status",
            Verb::GitStatus => "git_status",
            Verb::GitBranch => "git_branch",
            Verb::GitConflicts => "git_conflicts",
            Verb::GitMerge => "git_merge",
            Verb::GitCleanup => "git_cleanup",
            Verb::GetPerformance => "get_performance",
            Verb::OptimizeSettings => "optimize_settings",
            Verb::PrewarmResources => "prewarm_resources",
        }
    }
}

impl fmt::Display for Verb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Error returned by `Verb::from_str` for an unrecognized verb string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseVerbError(pub String);

impl fmt::Display for ParseVerbError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown verb: {}", self.0)
    }
}

impl std::error::Error for ParseVerbError {}

impl FromStr for Verb {
    type Err = ParseVerbError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Verb::ALL.iter().copied().find(|v| v.as_str() == s).ok_or_else(|| ParseVerbError(s.to_string()))
    }
}

/// Whether `role` is statically permitted to invoke `verb` (spec §4.8 table).
///
/// `get_progress`/`get_branch` are permitted for every role, but a specialist
/// is further restricted to its own instance — that additional check is the
/// caller's responsibility (the capability table alone can't express "self
/// only"), see `oj_daemon::rpc`'s RBAC gate.
pub fn allows(role: Role, verb: Verb) -> bool {
    use Role::*;
    use Verb::*;
    match verb {
        GetProgress | GetBranch => true,
        Spawn | Send | Read | List | Terminate | Restart | MergeBranch | ExecuteParallel
        | DistributeWork | GetParallelStatus | GitStatus | GitBranch | GitConflicts | GitMerge
        | GitCleanup | GetPerformance | OptimizeSettings | PrewarmResources => {
            matches!(role, Executive | Manager)
        }
    }
}

/// Returns the full set of verbs allowed for `role` — used to populate
/// `Instance::allowed_verbs` and the `ALLOWED_VERBS` env var at spawn time.
pub fn allowed_verbs(role: Role) -> Vec<Verb> {
    Verb::ALL.iter().copied().filter(|v| allows(role, *v)).collect()
}

#[cfg(test)]
#[path = "role_tests.rs"]
mod tests;
