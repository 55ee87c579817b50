//! Daemon lifecycle specs
//!
//! Verify daemon start/stop/status lifecycle and lock contention, independent
//! of any spawned instance.

use crate::prelude::*;

#[test]
fn daemon_status_fails_when_not_running() {
    let temp = Project::empty();

    temp.oj().args(&["daemon", "status"]).passes().stdout_has("Daemon not running");
}

#[test]
fn daemon_start_reports_success() {
    let temp = Project::empty();

    temp.oj().args(&["daemon", "start"]).passes().stdout_has("Daemon started");
}

#[test]
fn daemon_status_shows_running_after_start() {
    let temp = Project::empty();
    temp.oj().args(&["daemon", "start"]).passes();
    temp.oj().args(&["daemon", "status"]).passes().stdout_has("Status: running");
}

#[test]
fn daemon_status_shows_uptime() {
    let temp = Project::empty();
    temp.oj().args(&["daemon", "start"]).passes();
    temp.oj().args(&["daemon", "status"]).passes().stdout_has("Uptime:");
}

#[test]
fn daemon_status_shows_instance_count() {
    let temp = Project::empty();
    temp.oj().args(&["daemon", "start"]).passes();
    temp.oj().args(&["daemon", "status"]).passes().stdout_has("Instances:");
}

#[test]
fn daemon_status_shows_version() {
    let temp = Project::empty();
    temp.oj().args(&["daemon", "start"]).passes();
    temp.oj().args(&["daemon", "status"]).passes().stdout_has("Version:");
}

#[test]
fn daemon_stop_reports_success() {
    let temp = Project::empty();
    temp.oj().args(&["daemon", "start"]).passes();
    temp.oj().args(&["daemon", "stop"]).passes().stdout_has("Daemon stopped");
}

#[test]
fn daemon_status_fails_after_stop() {
    let temp = Project::empty();
    temp.oj().args(&["daemon", "start"]).passes();
    temp.oj().args(&["daemon", "stop"]).passes();
    temp.oj().args(&["daemon", "status"]).passes().stdout_has("Daemon not running");
}

#[test]
fn daemon_creates_version_file() {
    let temp = Project::empty();
    temp.oj().args(&["daemon", "start"]).passes();

    let version_file = temp.state_path().join("daemon.version");
    let has_version = wait_for(SPEC_WAIT_MAX_MS, || version_file.exists());
    assert!(has_version, "daemon.version file should exist");
}

#[test]
fn daemon_creates_pid_file() {
    let temp = Project::empty();
    temp.oj().args(&["daemon", "start"]).passes();

    let pid_file = temp.state_path().join("daemon.pid");
    let has_pid = wait_for(SPEC_WAIT_MAX_MS, || pid_file.exists());
    assert!(has_pid, "daemon.pid file should exist");
}

#[test]
fn daemon_creates_socket_file() {
    let temp = Project::empty();
    temp.oj().args(&["daemon", "start"]).passes();

    let socket_file = temp.state_path().join("daemon.sock");
    let has_socket = wait_for(SPEC_WAIT_MAX_MS, || socket_file.exists());
    assert!(has_socket, "daemon socket file should exist");
}

/// Running `ojd` directly when a daemon is already running must not disrupt it.
///
/// Regression: a failed startup used to delete the socket and lock files
/// belonging to the running daemon, making it unreachable.
#[test]
fn running_ojd_while_daemon_running_does_not_kill_it() {
    let temp = Project::empty();
    temp.oj().args(&["daemon", "start"]).passes();
    temp.oj().args(&["daemon", "status"]).passes().stdout_has("Status: running");

    let ojd = ojd_binary();
    let output = std::process::Command::new(&ojd)
        .env("OJ_STATE_DIR", temp.state_path())
        .output()
        .expect("ojd should run");
    assert!(!output.status.success(), "ojd should fail when daemon is already running");

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("already running"), "stderr should contain 'already running', got: {stderr}");

    temp.oj().args(&["daemon", "status"]).passes().stdout_has("Status: running");
    assert!(temp.state_path().join("daemon.sock").exists(), "socket file must survive failed ojd");
    assert!(temp.state_path().join("daemon.pid").exists(), "pid file must survive failed ojd");
}

/// Running `ojd` twice after the first daemon exits should work normally —
/// the lock file is released when a daemon exits.
#[test]
fn ojd_starts_after_previous_daemon_stopped() {
    let temp = Project::empty();
    temp.oj().args(&["daemon", "start"]).passes();
    temp.oj().args(&["daemon", "stop"]).passes();
    temp.oj().args(&["daemon", "start"]).passes();
    temp.oj().args(&["daemon", "status"]).passes().stdout_has("Status: running");
}
