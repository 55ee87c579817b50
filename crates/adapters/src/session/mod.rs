// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Terminal Transport: create/kill multiplexer sessions, send keystrokes to
//! panes, capture scrollback. One session per instance (`<prefix>_<instance_id>`).

mod noop;
mod tmux;

pub use noop::NoOpSessionAdapter;
pub use tmux::TmuxAdapter;

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
mod fake;
#[cfg(any(test, feature = "test-support"))]
pub use fake::{FakeSession, FakeSessionAdapter, SessionCall};

use async_trait::async_trait;
use oj_core::CoreResult;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// A running multiplexer session as reported by `list_sessions`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionInfo {
    pub name: String,
    pub windows: u32,
    pub attached: bool,
    pub id: String,
}

/// `"<session>:<window>.<pane>"`, the address `send_keys`/`capture_pane` act on.
pub fn pane_target(session: &str, window: u32, pane: u32) -> String {
    format!("{session}:{window}.{pane}")
}

/// Adapter for managing terminal sessions (tmux, etc.)
#[async_trait]
pub trait SessionAdapter: Clone + Send + Sync + 'static {
    /// Creates a detached session named `name` rooted at `cwd`. Fails with
    /// `SessionExists` if already present, `TransportUnavailable` if the
    /// underlying multiplexer cannot be reached.
    async fn create_session(&self, name: &str, cwd: &Path) -> CoreResult<()>;

    /// Kills a session. Idempotent: killing an already-dead session is `Ok`.
    async fn kill_session(&self, name: &str) -> CoreResult<()>;

    /// Sends `text` to `pane_target`, optionally followed by Enter.
    /// Fails with `PaneMissing` if the pane does not exist.
    async fn send_keys(&self, pane_target: &str, text: &str, press_enter: bool) -> CoreResult<()>;

    /// Returns the last `lines` lines of scrollback (`None` means all of it).
    /// Fails with `PaneMissing` if the pane does not exist.
    async fn capture_pane(&self, pane_target: &str, lines: Option<u32>) -> CoreResult<String>;

    /// Lists live sessions. Never fails; returns `vec![]` when none exist or
    /// the transport is unreachable.
    async fn list_sessions(&self) -> Vec<SessionInfo>;
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
