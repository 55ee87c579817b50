// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use oj_core::CoreError;
use std::path::Path;

#[tokio::test]
async fn create_session_records_call_and_session_state() {
    let adapter = FakeSessionAdapter::new();
    adapter.create_session("exec_1", Path::new("/tmp")).await.unwrap();

    assert!(adapter.get_session("exec_1").is_some());
    let calls = adapter.calls();
    assert_eq!(calls.len(), 1);
    assert!(matches!(calls[0], SessionCall::CreateSession { .. }));
}

#[tokio::test]
async fn create_session_twice_fails_with_session_exists() {
    let adapter = FakeSessionAdapter::new();
    adapter.create_session("exec_1", Path::new("/tmp")).await.unwrap();
    let result = adapter.create_session("exec_1", Path::new("/tmp")).await;
    assert!(matches!(result, Err(CoreError::SessionExists(_))));
}

#[tokio::test]
async fn create_session_after_kill_succeeds() {
    let adapter = FakeSessionAdapter::new();
    adapter.create_session("exec_1", Path::new("/tmp")).await.unwrap();
    adapter.kill_session("exec_1").await.unwrap();
    adapter.create_session("exec_1", Path::new("/tmp")).await.unwrap();
}

#[tokio::test]
async fn send_keys_to_live_session_succeeds() {
    let adapter = FakeSessionAdapter::new();
    adapter.create_session("exec_1", Path::new("/tmp")).await.unwrap();

    adapter.send_keys("exec_1:0.0", "hello", true).await.unwrap();

    let calls = adapter.calls();
    assert!(matches!(
        &calls[1],
        SessionCall::SendKeys { pane_target, text, press_enter }
        if pane_target == "exec_1:0.0" && text == "hello" && *press_enter
    ));
}

#[tokio::test]
async fn send_keys_to_missing_session_returns_pane_missing() {
    let adapter = FakeSessionAdapter::new();
    let result = adapter.send_keys("nonexistent:0.0", "input", false).await;
    assert!(matches!(result, Err(CoreError::PaneMissing(_))));
}

#[tokio::test]
async fn send_keys_after_kill_returns_pane_missing() {
    let adapter = FakeSessionAdapter::new();
    adapter.create_session("exec_1", Path::new("/tmp")).await.unwrap();
    adapter.kill_session("exec_1").await.unwrap();

    let result = adapter.send_keys("exec_1:0.0", "input", false).await;
    assert!(matches!(result, Err(CoreError::PaneMissing(_))));
}

#[tokio::test]
async fn capture_pane_returns_requested_tail() {
    let adapter = FakeSessionAdapter::new();
    adapter.create_session("exec_1", Path::new("/tmp")).await.unwrap();
    adapter.push_output("exec_1", ["line1".to_string(), "line2".to_string(), "line3".to_string()]);

    let tail = adapter.capture_pane("exec_1:0.0", Some(2)).await.unwrap();
    assert_eq!(tail, "line2\nline3");

    let all = adapter.capture_pane("exec_1:0.0", None).await.unwrap();
    assert_eq!(all, "line1\nline2\nline3");
}

#[tokio::test]
async fn capture_pane_missing_session_returns_pane_missing() {
    let adapter = FakeSessionAdapter::new();
    let result = adapter.capture_pane("nonexistent:0.0", Some(10)).await;
    assert!(matches!(result, Err(CoreError::PaneMissing(_))));
}

#[tokio::test]
async fn list_sessions_excludes_killed_sessions() {
    let adapter = FakeSessionAdapter::new();
    adapter.create_session("exec_1", Path::new("/tmp")).await.unwrap();
    adapter.create_session("exec_2", Path::new("/tmp")).await.unwrap();
    adapter.kill_session("exec_2").await.unwrap();

    let sessions = adapter.list_sessions().await;
    assert_eq!(sessions.len(), 1);
    assert_eq!(sessions[0].name, "exec_1");
}

#[tokio::test]
async fn list_sessions_is_empty_when_none_created() {
    let adapter = FakeSessionAdapter::new();
    assert!(adapter.list_sessions().await.is_empty());
}

#[tokio::test]
async fn mark_dead_simulates_a_crash() {
    let adapter = FakeSessionAdapter::new();
    adapter.create_session("exec_1", Path::new("/tmp")).await.unwrap();
    adapter.mark_dead("exec_1");

    let result = adapter.send_keys("exec_1:0.0", "x", false).await;
    assert!(matches!(result, Err(CoreError::PaneMissing(_))));
}
