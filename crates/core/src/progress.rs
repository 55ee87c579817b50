// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Progress snapshot parsed from a per-instance progress file (§4.4).

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TodoStatus {
    Pending,
    InProgress,
    Completed,
}

impl TodoStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TodoStatus::Pending => "pending",
            TodoStatus::InProgress => "in_progress",
            TodoStatus::Completed => "completed",
        }
    }
}

impl fmt::Display for TodoStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One item from the externally-maintained progress file's `[{id,status,content}]` array.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressItem {
    pub id: String,
    pub status: TodoStatus,
    pub content: String,
}

/// Snapshot of an instance's progress, as returned by `get_progress`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressRecord {
    pub todos: Vec<ProgressItem>,
    pub completion_rate: f64,
}

impl ProgressRecord {
    /// `completion_rate = completed / total` (0 when total is 0, §4.4).
    pub fn from_todos(todos: Vec<ProgressItem>) -> Self {
        let total = todos.len();
        let completed = todos.iter().filter(|t| t.status == TodoStatus::Completed).count();
        let completion_rate = if total == 0 {
            0.0
        } else {
            completed as f64 / total as f64
        };
        Self {
            todos,
            completion_rate,
        }
    }

    pub fn empty() -> Self {
        Self {
            todos: Vec::new(),
            completion_rate: 0.0,
        }
    }
}

#[cfg(test)]
#[path = "progress_tests.rs"]
mod tests;
