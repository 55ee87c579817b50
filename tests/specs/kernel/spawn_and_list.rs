//! Spawn/list/hierarchy specs (§4.7, §8.4 scenarios 1, 3).

use crate::prelude::*;

#[test]
fn list_on_empty_registry_returns_zero_count() {
    let temp = Project::empty();
    temp.oj().args(&["daemon", "start"]).passes();

    temp.oj()
        .args(&["list", "-o", "json"])
        .passes()
        .stdout_has("\"instances\": []")
        .stdout_has("\"count\": 0");
}

#[test]
fn spawn_manager_then_list_shows_it() {
    let temp = Project::empty();
    temp.oj().args(&["daemon", "start"]).passes();

    temp.oj()
        .args(&["spawn", "manager", temp.path().to_str().unwrap(), "--context", "Test"])
        .passes()
        .stdout_has("spawned mgr_1_1");

    temp.oj()
        .args(&["list", "-o", "json"])
        .passes()
        .stdout_has("\"instance_id\": \"mgr_1_1\"")
        .stdout_has("\"role\": \"manager\"")
        .stdout_has("\"status\": \"active\"");
}

#[test]
fn spawn_child_records_parent_id() {
    let temp = Project::empty();
    temp.oj().args(&["daemon", "start"]).passes();

    temp.oj()
        .args(&["spawn", "executive", temp.path().to_str().unwrap()])
        .passes()
        .stdout_has("spawned exec_1");

    temp.oj()
        .args(&["spawn", "manager", temp.path().to_str().unwrap(), "--parent-id", "exec_1"])
        .passes()
        .stdout_has("spawned mgr_1_1");

    temp.oj()
        .args(&["list", "-o", "json", "--parent-id", "exec_1"])
        .passes()
        .stdout_has("\"instance_id\": \"mgr_1_1\"")
        .stdout_has("\"parent_id\": \"exec_1\"");
}

#[test]
fn cascade_terminate_removes_whole_subtree() {
    let temp = Project::empty();
    temp.oj().args(&["daemon", "start"]).passes();

    temp.oj().args(&["spawn", "executive", temp.path().to_str().unwrap()]).passes();
    temp.oj()
        .args(&["spawn", "manager", temp.path().to_str().unwrap(), "--parent-id", "exec_1"])
        .passes();
    temp.oj()
        .args(&["spawn", "specialist", temp.path().to_str().unwrap(), "--parent-id", "mgr_1_1"])
        .passes();

    temp.oj().args(&["terminate", "exec_1"]).passes().stdout_has("terminated 3 instance(s)");

    temp.oj().args(&["list", "-o", "json"]).passes().stdout_has("\"count\": 0");
}

#[test]
fn spawning_specialist_with_shared_workspace_is_denied() {
    let temp = Project::empty();
    temp.oj().args(&["daemon", "start"]).passes();

    temp.oj().args(&["spawn", "executive", temp.path().to_str().unwrap()]).passes();
    temp.oj()
        .args(&["spawn", "manager", temp.path().to_str().unwrap(), "--parent-id", "exec_1"])
        .passes();

    temp.oj()
        .args(&[
            "spawn",
            "specialist",
            temp.path().to_str().unwrap(),
            "--parent-id",
            "mgr_1_1",
            "--workspace-mode",
            "shared",
        ])
        .fails();
}
