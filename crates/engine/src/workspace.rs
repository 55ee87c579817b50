// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Workspace Manager (§4.5): directory layout and per-instance context/
//! capability files.
//!
//! Isolated instances get a private directory under the parent's work_dir;
//! shared instances (managers only) reuse the parent directory and record
//! themselves in a marker file so other managers sharing it can be seen.

use oj_core::{CoreError, CoreResult, InstanceId, Role, Verb, WorkspaceMode};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

pub const CONTEXT_FILENAME: &str = "context.json";
pub const CAPABILITIES_FILENAME: &str = "capabilities.json";
const SHARED_MARKER_FILENAME: &str = ".oj-shared-managers.json";

/// Per-instance context file content (§4.5): a role-specific template
/// carrying the instance's identity and placement in the hierarchy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextFile {
    pub instance_id: String,
    pub role: Role,
    pub work_dir: String,
    pub parent_id: Option<String>,
    #[serde(default)]
    pub context: serde_json::Value,
}

/// Capability file content: the verb subset the instance's RPC client is
/// allowed to invoke, written alongside the context file so the child
/// process can self-report what it's permitted to do without a round trip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapabilityFile {
    pub instance_id: String,
    pub allowed_verbs: Vec<Verb>,
}

impl CapabilityFile {
    /// Specialists carry an empty capability set (§4.5, §4.8).
    fn for_role(instance_id: &InstanceId, role: Role) -> Self {
        let allowed_verbs = match role {
            Role::Specialist => Vec::new(),
            _ => oj_core::allowed_verbs(role),
        };
        Self {
            instance_id: instance_id.as_str().to_string(),
            allowed_verbs,
        }
    }
}

/// Tracks which managers currently share a given directory (§4.5).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
struct SharedMarker {
    managers: BTreeSet<String>,
}

/// Validates the `workspace_mode = shared ⇒ role = manager` invariant
/// before any directory is touched.
pub fn validate_workspace_mode(role: Role, mode: WorkspaceMode) -> CoreResult<()> {
    if mode == WorkspaceMode::Shared && role != Role::Manager {
        return Err(CoreError::CapabilityDenied(
            "workspace_mode=shared is only valid for role=manager".to_string(),
        ));
    }
    Ok(())
}

/// Resolves the absolute work directory for a new instance, without
/// creating anything yet.
pub fn resolve_work_dir(parent_work_dir: &Path, instance_id: &InstanceId, mode: WorkspaceMode) -> PathBuf {
    match mode {
        WorkspaceMode::Isolated => parent_work_dir.join(instance_id.as_str()),
        WorkspaceMode::Shared => parent_work_dir.to_path_buf(),
    }
}

/// Creates the directory layout for an instance and writes its context and
/// capability files (§4.5). Returns the instance's resolved `work_dir`.
pub fn prepare(
    parent_work_dir: &Path,
    instance_id: &InstanceId,
    role: Role,
    parent_id: Option<&InstanceId>,
    mode: WorkspaceMode,
    context: serde_json::Value,
) -> io::Result<PathBuf> {
    validate_workspace_mode(role, mode).map_err(|e| io::Error::new(io::ErrorKind::Other, e.to_string()))?;

    let work_dir = resolve_work_dir(parent_work_dir, instance_id, mode);
    let context_dir = match mode {
        WorkspaceMode::Isolated => work_dir.clone(),
        WorkspaceMode::Shared => work_dir.join(".managers").join(instance_id.as_str()),
    };
    fs::create_dir_all(&context_dir)?;

    let context = ContextFile {
        instance_id: instance_id.as_str().to_string(),
        role,
        work_dir: work_dir.display().to_string(),
        parent_id: parent_id.map(|p| p.as_str().to_string()),
        context,
    };
    fs::write(
        context_dir.join(CONTEXT_FILENAME),
        serde_json::to_string_pretty(&context).unwrap_or_default(),
    )?;

    let capabilities = CapabilityFile::for_role(instance_id, role);
    fs::write(
        context_dir.join(CAPABILITIES_FILENAME),
        serde_json::to_string_pretty(&capabilities).unwrap_or_default(),
    )?;

    if mode == WorkspaceMode::Shared {
        join_shared_marker(&work_dir, instance_id)?;
    }

    Ok(work_dir)
}

/// Removes an isolated instance's directory. Shared workspaces are never
/// deleted on terminate (§4.7); this only unregisters the manager from the
/// marker file.
pub fn teardown(parent_work_dir: &Path, instance_id: &InstanceId, mode: WorkspaceMode) -> io::Result<()> {
    match mode {
        WorkspaceMode::Isolated => {
            let dir = resolve_work_dir(parent_work_dir, instance_id, mode);
            match fs::remove_dir_all(&dir) {
                Ok(()) => Ok(()),
                Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
                Err(e) => Err(e),
            }
        }
        WorkspaceMode::Shared => leave_shared_marker(parent_work_dir, instance_id),
    }
}

/// Adds `instance_id` to the shared marker file, updating it atomically via
/// rename-over-temp (§4.5 invariant).
fn join_shared_marker(work_dir: &Path, instance_id: &InstanceId) -> io::Result<()> {
    update_shared_marker(work_dir, |marker| {
        marker.managers.insert(instance_id.as_str().to_string());
    })
}

fn leave_shared_marker(work_dir: &Path, instance_id: &InstanceId) -> io::Result<()> {
    update_shared_marker(work_dir, |marker| {
        marker.managers.remove(instance_id.as_str());
    })
}

fn update_shared_marker(work_dir: &Path, mutate: impl FnOnce(&mut SharedMarker)) -> io::Result<()> {
    let marker_path = work_dir.join(SHARED_MARKER_FILENAME);
    let mut marker: SharedMarker = match fs::read_to_string(&marker_path) {
        Ok(raw) => serde_json::from_str(&raw).unwrap_or_default(),
        Err(e) if e.kind() == io::ErrorKind::NotFound => SharedMarker::default(),
        Err(e) => return Err(e),
    };
    mutate(&mut marker);

    let tmp_path = work_dir.join(format!("{SHARED_MARKER_FILENAME}.tmp"));
    fs::write(&tmp_path, serde_json::to_string_pretty(&marker).unwrap_or_default())?;
    fs::rename(&tmp_path, &marker_path)
}

/// Reads the current set of managers sharing `work_dir`, if any.
pub fn shared_managers(work_dir: &Path) -> io::Result<BTreeSet<String>> {
    let marker_path = work_dir.join(SHARED_MARKER_FILENAME);
    match fs::read_to_string(&marker_path) {
        Ok(raw) => Ok(serde_json::from_str::<SharedMarker>(&raw).unwrap_or_default().managers),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(BTreeSet::new()),
        Err(e) => Err(e),
    }
}

#[cfg(test)]
#[path = "workspace_tests.rs"]
mod tests;
