//! External bridge specs (§4.12, §6).

use crate::prelude::*;
use std::process::Command;

fn bridge_cmd(temp: &Project) -> Command {
    let mut cmd = Command::new(oj_bridge_binary());
    cmd.env("OJ_STATE_DIR", temp.state_path());
    cmd.env("OJ_DAEMON_BINARY", ojd_binary());
    cmd
}

#[test]
fn missing_verb_exits_with_validation_error() {
    let temp = Project::empty();
    temp.oj().args(&["daemon", "start"]).passes();

    let output = bridge_cmd(&temp).output().expect("oj-bridge should run");
    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn missing_json_exits_with_json_parse_error() {
    let temp = Project::empty();
    temp.oj().args(&["daemon", "start"]).passes();

    let output = bridge_cmd(&temp).arg("list").output().expect("oj-bridge should run");
    assert_eq!(output.status.code(), Some(1));
}

#[test]
fn malformed_json_exits_with_json_parse_error() {
    let temp = Project::empty();
    temp.oj().args(&["daemon", "start"]).passes();

    let output = bridge_cmd(&temp).args(["list", "{not json"]).output().expect("oj-bridge should run");
    assert_eq!(output.status.code(), Some(1));
}

#[test]
fn list_verb_succeeds_and_prints_result() {
    let temp = Project::empty();
    temp.oj().args(&["daemon", "start"]).passes();

    let output = bridge_cmd(&temp).args(["list", "{}"]).output().expect("oj-bridge should run");
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("\"success\":true"), "stdout: {stdout}");
}

/// A verb that reports failure at the daemon level, not a transport error,
/// still reaches the bridge's success:false envelope and a non-zero exit.
#[test]
fn unknown_instance_reports_failure_envelope() {
    let temp = Project::empty();
    temp.oj().args(&["daemon", "start"]).passes();

    let output = bridge_cmd(&temp)
        .args(["send", r#"{"instance_id": "exec_999", "text": "hi"}"#])
        .output()
        .expect("oj-bridge should run");
    assert!(!output.status.success());
    assert_eq!(output.status.code(), Some(2));
}
