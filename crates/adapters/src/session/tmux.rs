// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Tmux-backed Terminal Transport.

use super::SessionInfo;
use crate::session::SessionAdapter;
use async_trait::async_trait;
use oj_core::{CoreError, CoreResult};
use std::path::Path;
use tokio::process::Command;

/// Tmux-based session adapter
#[derive(Clone, Default)]
pub struct TmuxAdapter;

impl TmuxAdapter {
    pub fn new() -> Self {
        Self
    }
}

async fn has_session(name: &str) -> bool {
    Command::new("tmux")
        .args(["has-session", "-t", name])
        .output()
        .await
        .map(|o| o.status.success())
        .unwrap_or(false)
}

#[async_trait]
impl SessionAdapter for TmuxAdapter {
    async fn create_session(&self, name: &str, cwd: &Path) -> CoreResult<()> {
        if has_session(name).await {
            return Err(CoreError::SessionExists(name.to_string()));
        }

        let output = Command::new("tmux")
            .arg("new-session")
            .arg("-d")
            .arg("-s")
            .arg(name)
            .arg("-c")
            .arg(cwd)
            .output()
            .await
            .map_err(|e| CoreError::TransportUnavailable(e.to_string()))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            tracing::error!(session = name, stderr = %stderr, "tmux new-session failed");
            return Err(CoreError::TransportUnavailable(stderr.to_string()));
        }

        Ok(())
    }

    async fn kill_session(&self, name: &str) -> CoreResult<()> {
        // Idempotent: a session already gone, or tmux itself unreachable, is
        // not a failure — there is nothing left to kill either way.
        match Command::new("tmux").args(["kill-session", "-t", name]).output().await {
            Ok(output) if !output.status.success() => {
                tracing::debug!(session = name, "kill-session found nothing to kill");
            }
            Err(e) => {
                tracing::debug!(session = name, error = %e, "kill-session could not reach tmux");
            }
            Ok(_) => {}
        }

        Ok(())
    }

    async fn send_keys(&self, pane_target: &str, text: &str, press_enter: bool) -> CoreResult<()> {
        let output = Command::new("tmux")
            .args(["send-keys", "-t", pane_target, "-l", "--", text])
            .output()
            .await
            .map_err(|e| CoreError::TransportUnavailable(e.to_string()))?;

        if !output.status.success() {
            return Err(CoreError::PaneMissing(pane_target.to_string()));
        }

        if press_enter {
            let output = Command::new("tmux")
                .args(["send-keys", "-t", pane_target, "Enter"])
                .output()
                .await
                .map_err(|e| CoreError::TransportUnavailable(e.to_string()))?;

            if !output.status.success() {
                return Err(CoreError::PaneMissing(pane_target.to_string()));
            }
        }

        Ok(())
    }

    async fn capture_pane(&self, pane_target: &str, lines: Option<u32>) -> CoreResult<String> {
        let history_flag = match lines {
            Some(n) => format!("-{n}"),
            None => "-".to_string(),
        };

        let output = Command::new("tmux")
            .args(["capture-pane", "-t", pane_target, "-p", "-S", &history_flag])
            .output()
            .await
            .map_err(|e| CoreError::TransportUnavailable(e.to_string()))?;

        if !output.status.success() {
            return Err(CoreError::PaneMissing(pane_target.to_string()));
        }

        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }

    async fn list_sessions(&self) -> Vec<SessionInfo> {
        let output = Command::new("tmux")
            .args([
                "list-sessions",
                "-F",
                "#{session_name}|#{session_windows}|#{session_attached}|#{session_id}",
            ])
            .output()
            .await;

        let Ok(output) = output else {
            return Vec::new();
        };
        if !output.status.success() {
            return Vec::new();
        }

        String::from_utf8_lossy(&output.stdout)
            .lines()
            .filter_map(parse_session_line)
            .collect()
    }
}

fn parse_session_line(line: &str) -> Option<SessionInfo> {
    let mut fields = line.splitn(4, '|');
    let name = fields.next()?.to_string();
    let windows = fields.next()?.parse().ok()?;
    let attached = fields.next()? != "0";
    let id = fields.next()?.to_string();
    Some(SessionInfo { name, windows, attached, id })
}

#[cfg(test)]
#[path = "tmux_tests.rs"]
mod tests;
