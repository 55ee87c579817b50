// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! No-op Terminal Transport for specialist roles, which never need a live
//! pane check, and for minimal deployments with session management disabled.

use super::{SessionAdapter, SessionInfo};
use async_trait::async_trait;
use oj_core::CoreResult;
use std::path::Path;

#[derive(Clone, Copy, Debug, Default)]
pub struct NoOpSessionAdapter;

impl NoOpSessionAdapter {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl SessionAdapter for NoOpSessionAdapter {
    async fn create_session(&self, _name: &str, _cwd: &Path) -> CoreResult<()> {
        Ok(())
    }

    async fn kill_session(&self, _name: &str) -> CoreResult<()> {
        Ok(())
    }

    async fn send_keys(&self, _pane_target: &str, _text: &str, _press_enter: bool) -> CoreResult<()> {
        Ok(())
    }

    async fn capture_pane(&self, _pane_target: &str, _lines: Option<u32>) -> CoreResult<String> {
        Ok(String::new())
    }

    async fn list_sessions(&self) -> Vec<SessionInfo> {
        Vec::new()
    }
}

#[cfg(test)]
#[path = "noop_tests.rs"]
mod tests;
