// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The Instance entity (§3.1): a live child process hosted in a multiplexer
//! pane.

use crate::role::{allowed_verbs, Role, Verb};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

crate::define_id! {
    /// Hierarchical instance identifier: `exec_<N>`, `mgr_<E>_<M>`, or
    /// `spec_<E>_<M>_<S>` — allocated per-parent against the live
    /// registry by `oj_engine::Supervisor::allocate_instance_id`.
    pub struct InstanceId;
}

impl PartialOrd for InstanceId {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for InstanceId {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.0.cmp(&other.0)
    }
}

/// Current lifecycle state of an instance (§4.7 state machine):
/// `spawning → active ⇌ idle → terminated`; `active → crashed → spawning`
/// via restart; any state → `terminated`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Spawning,
    Active,
    Idle,
    Crashed,
    Terminated,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Spawning => "spawning",
            Status::Active => "active",
            Status::Idle => "idle",
            Status::Crashed => "crashed",
            Status::Terminated => "terminated",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Directory-sharing mode for a manager's workspace (§4.5). Shared mode is
/// only valid for `role = manager` (§3.1 invariant).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkspaceMode {
    Isolated,
    Shared,
}

impl WorkspaceMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkspaceMode::Isolated => "isolated",
            WorkspaceMode::Shared => "shared",
        }
    }
}

impl fmt::Display for WorkspaceMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A live child process hosted in a multiplexer pane.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Instance {
    pub instance_id: InstanceId,
    pub role: Role,
    pub parent_id: Option<InstanceId>,
    pub children: BTreeSet<InstanceId>,
    pub status: Status,
    pub session_name: String,
    pub pane_target: String,
    pub work_dir: String,
    pub workspace_mode: WorkspaceMode,
    pub branch_name: Option<String>,
    pub created_at: u64,
    pub last_seen_at: u64,
    pub allowed_verbs: Vec<Verb>,
}

impl Instance {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        instance_id: InstanceId,
        role: Role,
        parent_id: Option<InstanceId>,
        session_name: String,
        pane_target: String,
        work_dir: String,
        workspace_mode: WorkspaceMode,
        now_ms: u64,
    ) -> Self {
        Self {
            instance_id,
            role,
            parent_id,
            children: BTreeSet::new(),
            status: Status::Spawning,
            session_name,
            pane_target,
            work_dir,
            workspace_mode,
            branch_name: None,
            created_at: now_ms,
            last_seen_at: now_ms,
            allowed_verbs: allowed_verbs(role),
        }
    }

    /// `parent_id` is defined iff `role != executive` (§3.1 invariant).
    pub fn parent_invariant_holds(&self) -> bool {
        (self.role == Role::Executive) == self.parent_id.is_none()
    }

    /// `workspace_mode = shared ⇒ role = manager` (§3.1 invariant).
    pub fn workspace_mode_invariant_holds(&self) -> bool {
        self.workspace_mode != WorkspaceMode::Shared || self.role == Role::Manager
    }

    pub fn is_terminated(&self) -> bool {
        self.status == Status::Terminated
    }

    pub fn mark_active(&mut self, now_ms: u64) {
        self.status = Status::Active;
        self.last_seen_at = now_ms;
    }

    pub fn touch(&mut self, now_ms: u64) {
        self.last_seen_at = now_ms;
    }
}

/// Parses the `E`/`M` ordinals back out of a `mgr_<E>_<M>` or
/// `spec_<E>_<M>_<S>` id, used by the registry to derive fresh per-parent
/// counters when rehydrating from storage.
pub fn parse_ordinals(instance_id: &str) -> Option<Vec<u64>> {
    let mut parts = instance_id.split('_');
    let _prefix = parts.next()?;
    parts.map(|p| p.parse::<u64>().ok()).collect()
}

#[cfg(test)]
#[path = "instance_tests.rs"]
mod tests;
