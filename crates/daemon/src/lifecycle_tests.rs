// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use oj_storage::Registry;
use tempfile::TempDir;

fn config_in(tmp: &TempDir) -> Config {
    Config {
        state_dir: tmp.path().to_path_buf(),
        socket_path: tmp.path().join("daemon.sock"),
        lock_path: tmp.path().join("daemon.lock"),
        version_path: tmp.path().join("daemon.version"),
        log_path: tmp.path().join("daemon.log"),
        registry_path: tmp.path().join("registry.json"),
    }
}

#[test]
fn acquire_lock_succeeds_when_uncontended() {
    let tmp = TempDir::new().unwrap();
    let config = config_in(&tmp);
    let guard = acquire_lock(&config).unwrap();
    let pid = std::fs::read_to_string(&config.lock_path).unwrap();
    assert_eq!(pid.trim().parse::<u32>().unwrap(), std::process::id());
    drop(guard);
}

#[test]
fn acquire_lock_fails_while_another_guard_is_held() {
    let tmp = TempDir::new().unwrap();
    let config = config_in(&tmp);
    let _first = acquire_lock(&config).unwrap();
    let second = acquire_lock(&config);
    assert!(matches!(second, Err(LifecycleError::LockFailed(_))));
}

#[test]
fn startup_builds_an_empty_registry() {
    let tmp = TempDir::new().unwrap();
    let config = config_in(&tmp);
    let daemon = startup(&config).unwrap();
    let instances = daemon.ctx.registry.list_instances(&Default::default()).unwrap();
    assert!(instances.is_empty());
}
