// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Conflict reporting for the Version Control Coordinator (§4.6).

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Basenames that are always safe to auto-resolve via the union merge driver.
const AUTO_RESOLVABLE_BASENAMES: &[&str] = &[
    "README.md",
    "CHANGELOG.md",
    "TODO.md",
    ".gitignore",
    "Cargo.lock",
    "package-lock.json",
    "yarn.lock",
    "pnpm-lock.yaml",
    "poetry.lock",
    "Gemfile.lock",
];

/// Extensions treated as documentation-text, auto-resolvable by convention.
const AUTO_RESOLVABLE_EXTENSIONS: &[&str] = &["md", "txt", "rst", "adoc"];

/// `.gitattributes` glob patterns covering the same allow-list `path`
/// is checked against, for the Version Control Coordinator to install
/// against the union merge driver (§4.6).
pub fn allow_list_patterns() -> Vec<String> {
    AUTO_RESOLVABLE_BASENAMES
        .iter()
        .map(|b| b.to_string())
        .chain(AUTO_RESOLVABLE_EXTENSIONS.iter().map(|ext| format!("*.{ext}")))
        .collect()
}

/// Whether `path`'s basename or extension qualifies for the union
/// merge-driver auto-resolution allow-list (§3.1).
pub fn is_auto_resolvable(path: &str) -> bool {
    let p = Path::new(path);
    if let Some(name) = p.file_name().and_then(|n| n.to_str()) {
        if AUTO_RESOLVABLE_BASENAMES.contains(&name) {
            return true;
        }
    }
    if let Some(ext) = p.extension().and_then(|e| e.to_str()) {
        if AUTO_RESOLVABLE_EXTENSIONS.contains(&ext.to_lowercase().as_str()) {
            return true;
        }
    }
    false
}

/// Result of analyzing the path sets modified on two diverging branches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConflictReport {
    pub has_conflicts: bool,
    pub files: Vec<String>,
    pub auto_resolvable: Vec<String>,
}

impl ConflictReport {
    pub fn from_conflicting_paths(paths: Vec<String>) -> Self {
        let auto_resolvable = paths.iter().filter(|p| is_auto_resolvable(p)).cloned().collect();
        Self {
            has_conflicts: !paths.is_empty(),
            files: paths,
            auto_resolvable,
        }
    }

    pub fn clean() -> Self {
        Self {
            has_conflicts: false,
            files: Vec::new(),
            auto_resolvable: Vec::new(),
        }
    }

    /// Paths that are *not* covered by the auto-resolvable allow-list —
    /// these must abort an `auto` strategy merge (§4.6).
    pub fn manual_only_paths(&self) -> Vec<&str> {
        self.files
            .iter()
            .filter(|f| !self.auto_resolvable.contains(f))
            .map(|s| s.as_str())
            .collect()
    }
}

#[cfg(test)]
#[path = "conflict_tests.rs"]
mod tests;
