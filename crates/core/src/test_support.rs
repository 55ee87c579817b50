// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared test builders, not compiled into release builds.

use crate::instance::{Instance, InstanceId, Status, WorkspaceMode};
use crate::role::Role;

/// Builds a minimal `active` instance for use in unit tests across crates.
pub fn test_instance(id: &str, role: Role, parent: Option<&str>) -> Instance {
    let mut inst = Instance::new(
        InstanceId::new(id),
        role,
        parent.map(InstanceId::new),
        format!("oj_{id}"),
        format!("oj_{id}:0.0"),
        "/tmp/oj-test".to_string(),
        WorkspaceMode::Isolated,
        1_000,
    );
    inst.status = Status::Active;
    inst
}
