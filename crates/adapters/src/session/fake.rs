// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fake Terminal Transport for tests: records every call, never shells out.
#![cfg_attr(coverage_nightly, coverage(off))]

use super::{SessionAdapter, SessionInfo};
use async_trait::async_trait;
use oj_core::{CoreError, CoreResult};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Recorded session call
#[derive(Debug, Clone)]
pub enum SessionCall {
    CreateSession { name: String, cwd: PathBuf },
    KillSession { name: String },
    SendKeys { pane_target: String, text: String, press_enter: bool },
    CapturePane { pane_target: String, lines: Option<u32> },
    ListSessions,
}

/// Fake session state, keyed by session name.
#[derive(Debug, Clone)]
pub struct FakeSession {
    pub name: String,
    pub cwd: PathBuf,
    pub output: Vec<String>,
    pub alive: bool,
}

struct FakeSessionState {
    sessions: HashMap<String, FakeSession>,
    calls: Vec<SessionCall>,
}

/// Fake session adapter for testing
#[derive(Clone)]
pub struct FakeSessionAdapter {
    inner: Arc<Mutex<FakeSessionState>>,
}

impl Default for FakeSessionAdapter {
    fn default() -> Self {
        Self {
            inner: Arc::new(Mutex::new(FakeSessionState {
                sessions: HashMap::new(),
                calls: Vec::new(),
            })),
        }
    }
}

impl FakeSessionAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<SessionCall> {
        self.inner.lock().calls.clone()
    }

    pub fn get_session(&self, name: &str) -> Option<FakeSession> {
        self.inner.lock().sessions.get(name).cloned()
    }

    /// Appends lines to a session's recorded output (simulates a pane producing output).
    pub fn push_output(&self, name: &str, lines: impl IntoIterator<Item = String>) {
        if let Some(session) = self.inner.lock().sessions.get_mut(name) {
            session.output.extend(lines);
        }
    }

    /// Marks a session dead without going through `kill_session` (simulates a crash).
    pub fn mark_dead(&self, name: &str) {
        if let Some(session) = self.inner.lock().sessions.get_mut(name) {
            session.alive = false;
        }
    }

    fn session_for_pane<'a>(target: &'a str) -> &'a str {
        target.split(':').next().unwrap_or(target)
    }
}

#[async_trait]
impl SessionAdapter for FakeSessionAdapter {
    async fn create_session(&self, name: &str, cwd: &Path) -> CoreResult<()> {
        let mut inner = self.inner.lock();
        inner.calls.push(SessionCall::CreateSession { name: name.to_string(), cwd: cwd.to_path_buf() });

        if inner.sessions.get(name).is_some_and(|s| s.alive) {
            return Err(CoreError::SessionExists(name.to_string()));
        }

        inner.sessions.insert(
            name.to_string(),
            FakeSession { name: name.to_string(), cwd: cwd.to_path_buf(), output: Vec::new(), alive: true },
        );
        Ok(())
    }

    async fn kill_session(&self, name: &str) -> CoreResult<()> {
        let mut inner = self.inner.lock();
        inner.calls.push(SessionCall::KillSession { name: name.to_string() });

        if let Some(session) = inner.sessions.get_mut(name) {
            session.alive = false;
        }
        Ok(())
    }

    async fn send_keys(&self, pane_target: &str, text: &str, press_enter: bool) -> CoreResult<()> {
        let mut inner = self.inner.lock();
        inner.calls.push(SessionCall::SendKeys {
            pane_target: pane_target.to_string(),
            text: text.to_string(),
            press_enter,
        });

        let name = Self::session_for_pane(pane_target).to_string();
        match inner.sessions.get(&name) {
            Some(session) if session.alive => Ok(()),
            _ => Err(CoreError::PaneMissing(pane_target.to_string())),
        }
    }

    async fn capture_pane(&self, pane_target: &str, lines: Option<u32>) -> CoreResult<String> {
        let mut inner = self.inner.lock();
        inner.calls.push(SessionCall::CapturePane { pane_target: pane_target.to_string(), lines });

        let name = Self::session_for_pane(pane_target).to_string();
        match inner.sessions.get(&name) {
            Some(session) if session.alive => {
                let start = match lines {
                    Some(n) => session.output.len().saturating_sub(n as usize),
                    None => 0,
                };
                Ok(session.output[start..].join("\n"))
            }
            _ => Err(CoreError::PaneMissing(pane_target.to_string())),
        }
    }

    async fn list_sessions(&self) -> Vec<SessionInfo> {
        let mut inner = self.inner.lock();
        inner.calls.push(SessionCall::ListSessions);

        inner
            .sessions
            .values()
            .filter(|s| s.alive)
            .map(|s| SessionInfo { name: s.name.clone(), windows: 1, attached: false, id: format!("${}", s.name) })
            .collect()
    }
}

#[cfg(test)]
#[path = "fake_tests.rs"]
mod tests;
