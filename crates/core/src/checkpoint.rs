// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Rollback state captured before a Version Control Coordinator atomic
//! operation (§4.6).

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checkpoint {
    pub op_name: String,
    pub branch_ref: String,
    pub worktree_snapshot_ref: String,
    pub created_at: u64,
}

impl Checkpoint {
    pub fn new(
        op_name: impl Into<String>,
        branch_ref: impl Into<String>,
        worktree_snapshot_ref: impl Into<String>,
        created_at: u64,
    ) -> Self {
        Self {
            op_name: op_name.into(),
            branch_ref: branch_ref.into(),
            worktree_snapshot_ref: worktree_snapshot_ref.into(),
            created_at,
        }
    }
}

#[cfg(test)]
#[path = "checkpoint_tests.rs"]
mod tests;
