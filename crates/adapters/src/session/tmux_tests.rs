// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use oj_core::CoreError;
use serial_test::serial;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::LazyLock;

/// Random prefix for this test run to avoid conflicts with parallel test runs.
static TEST_PREFIX: LazyLock<String> = LazyLock::new(|| {
    use std::time::{SystemTime, UNIX_EPOCH};
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .subsec_nanos();
    format!("t{:04x}", nanos & 0xFFFF)
});

static SESSION_COUNTER: AtomicU64 = AtomicU64::new(0);

fn unique_name(suffix: &str) -> String {
    let id = SESSION_COUNTER.fetch_add(1, Ordering::SeqCst);
    format!("{}-{}-{}", *TEST_PREFIX, suffix, id)
}

fn tmux_available() -> bool {
    std::process::Command::new("tmux")
        .arg("-V")
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

macro_rules! fail_if_no_tmux {
    () => {
        if !tmux_available() {
            panic!("tmux is required but not available");
        }
    };
}

// All tmux tests are serialized: some tests mutate PATH, which affects all others.

#[tokio::test]
#[serial(tmux)]
async fn create_session_then_has_it_in_list() {
    fail_if_no_tmux!();
    let adapter = TmuxAdapter::new();
    let name = unique_name("create");

    adapter.create_session(&name, Path::new("/tmp")).await.unwrap();

    let sessions = adapter.list_sessions().await;
    assert!(sessions.iter().any(|s| s.name == name));

    let _ = adapter.kill_session(&name).await;
}

#[tokio::test]
#[serial(tmux)]
async fn create_session_twice_fails_with_session_exists() {
    fail_if_no_tmux!();
    let adapter = TmuxAdapter::new();
    let name = unique_name("dup");

    adapter.create_session(&name, Path::new("/tmp")).await.unwrap();
    let result = adapter.create_session(&name, Path::new("/tmp")).await;
    assert!(matches!(result, Err(CoreError::SessionExists(_))));

    let _ = adapter.kill_session(&name).await;
}

#[tokio::test]
#[serial(tmux)]
async fn send_keys_with_enter_is_visible_in_capture() {
    fail_if_no_tmux!();
    let adapter = TmuxAdapter::new();
    let name = unique_name("send");

    adapter.create_session(&name, Path::new("/tmp")).await.unwrap();
    let target = pane_target(&name, 0, 0);

    tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;
    adapter.send_keys(&target, "echo hello-from-test", true).await.unwrap();
    tokio::time::sleep(tokio::time::Duration::from_millis(200)).await;

    let output = adapter.capture_pane(&target, Some(10)).await.unwrap();
    assert!(output.contains("hello-from-test"));

    let _ = adapter.kill_session(&name).await;
}

#[tokio::test]
#[serial(tmux)]
async fn send_keys_to_missing_pane_returns_pane_missing() {
    fail_if_no_tmux!();
    let adapter = TmuxAdapter::new();

    let result = adapter
        .send_keys("nonexistent-session-xyz:0.0", "test", false)
        .await;
    assert!(matches!(result, Err(CoreError::PaneMissing(_))));
}

#[tokio::test]
#[serial(tmux)]
async fn kill_session_terminates_it() {
    fail_if_no_tmux!();
    let adapter = TmuxAdapter::new();
    let name = unique_name("kill");

    adapter.create_session(&name, Path::new("/tmp")).await.unwrap();
    adapter.kill_session(&name).await.unwrap();

    tokio::time::sleep(tokio::time::Duration::from_millis(50)).await;
    let sessions = adapter.list_sessions().await;
    assert!(!sessions.iter().any(|s| s.name == name));
}

#[tokio::test]
#[serial(tmux)]
async fn kill_session_is_idempotent() {
    fail_if_no_tmux!();
    let adapter = TmuxAdapter::new();

    let result = adapter.kill_session("nonexistent-session-xyz").await;
    assert!(result.is_ok());
}

#[tokio::test]
#[serial(tmux)]
async fn capture_pane_returns_pane_content() {
    fail_if_no_tmux!();
    let adapter = TmuxAdapter::new();
    let name = unique_name("capture");

    adapter.create_session(&name, Path::new("/tmp")).await.unwrap();
    let target = pane_target(&name, 0, 0);

    adapter.send_keys(&target, "echo capture-test-output", true).await.unwrap();
    tokio::time::sleep(tokio::time::Duration::from_millis(200)).await;

    let output = adapter.capture_pane(&target, None).await.unwrap();
    assert!(output.contains("capture-test-output"));

    let _ = adapter.kill_session(&name).await;
}

#[tokio::test]
#[serial(tmux)]
async fn capture_pane_missing_session_returns_pane_missing() {
    fail_if_no_tmux!();
    let adapter = TmuxAdapter::new();

    let result = adapter.capture_pane("nonexistent-session-xyz:0.0", Some(10)).await;
    assert!(matches!(result, Err(CoreError::PaneMissing(_))));
}

#[tokio::test]
#[serial(tmux)]
async fn list_sessions_returns_empty_vec_when_none_running() {
    fail_if_no_tmux!();
    // Can't guarantee zero sessions on a shared system; just assert it never fails.
    let adapter = TmuxAdapter::new();
    let _sessions = adapter.list_sessions().await;
}

#[test]
fn tmux_adapter_is_zero_sized() {
    let adapter = TmuxAdapter;
    assert!(std::mem::size_of_val(&adapter) == 0);
}

// Tests below modify PATH to simulate tmux being unavailable.

#[tokio::test]
#[serial(tmux)]
async fn create_session_fails_when_tmux_unavailable() {
    use std::env;

    let original_path = env::var("PATH").unwrap_or_default();
    env::set_var("PATH", "/nonexistent");

    let adapter = TmuxAdapter::new();
    let result = adapter.create_session("test-no-tmux", Path::new("/tmp")).await;

    env::set_var("PATH", &original_path);

    assert!(matches!(result, Err(CoreError::TransportUnavailable(_))));
}

#[tokio::test]
#[serial(tmux)]
async fn list_sessions_returns_empty_when_tmux_unavailable() {
    use std::env;

    let original_path = env::var("PATH").unwrap_or_default();
    env::set_var("PATH", "/nonexistent");

    let adapter = TmuxAdapter::new();
    let sessions = adapter.list_sessions().await;

    env::set_var("PATH", &original_path);

    assert!(sessions.is_empty());
}

#[tokio::test]
#[serial(tmux)]
async fn kill_session_succeeds_when_tmux_unavailable() {
    use std::env;

    let original_path = env::var("PATH").unwrap_or_default();
    env::set_var("PATH", "/nonexistent");

    let adapter = TmuxAdapter::new();
    let result = adapter.kill_session("any-session").await;

    env::set_var("PATH", &original_path);

    // kill_session intentionally ignores "nothing to kill" failures.
    assert!(result.is_ok());
}
