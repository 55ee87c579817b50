// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Traced adapter wrapper for consistent observability.

use crate::session::{SessionAdapter, SessionInfo};
use async_trait::async_trait;
use oj_core::CoreResult;
use std::path::Path;
use tracing::Instrument;

/// Wrapper that adds tracing spans/events to any `SessionAdapter`.
#[derive(Clone)]
pub struct TracedSession<S> {
    inner: S,
}

impl<S> TracedSession<S> {
    pub fn new(inner: S) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl<S: SessionAdapter> SessionAdapter for TracedSession<S> {
    async fn create_session(&self, name: &str, cwd: &Path) -> CoreResult<()> {
        async {
            tracing::info!("creating session");
            let start = std::time::Instant::now();
            let result = self.inner.create_session(name, cwd).await;
            let elapsed_ms = start.elapsed().as_millis() as u64;
            match &result {
                Ok(()) => tracing::info!(elapsed_ms, "session created"),
                Err(e) => tracing::error!(elapsed_ms, error = %e, "create_session failed"),
            }
            result
        }
        .instrument(tracing::info_span!("session.create", name, cwd = %cwd.display()))
        .await
    }

    async fn kill_session(&self, name: &str) -> CoreResult<()> {
        let result = self.inner.kill_session(name).await;
        tracing::info_span!("session.kill", name).in_scope(|| match &result {
            Ok(()) => tracing::info!("killed"),
            Err(e) => tracing::warn!(error = %e, "kill_session failed"),
        });
        result
    }

    async fn send_keys(&self, pane_target: &str, text: &str, press_enter: bool) -> CoreResult<()> {
        tracing::info_span!("session.send_keys", pane_target)
            .in_scope(|| tracing::debug!(len = text.len(), press_enter, "sending"));
        let result = self.inner.send_keys(pane_target, text, press_enter).await;
        if let Err(ref e) = result {
            tracing::error!(pane_target, error = %e, "send_keys failed");
        }
        result
    }

    async fn capture_pane(&self, pane_target: &str, lines: Option<u32>) -> CoreResult<String> {
        let result = self.inner.capture_pane(pane_target, lines).await;
        tracing::info_span!("session.capture_pane", pane_target, lines).in_scope(|| {
            tracing::debug!(captured_len = result.as_ref().map(|s| s.len()).ok(), "captured")
        });
        result
    }

    async fn list_sessions(&self) -> Vec<SessionInfo> {
        self.inner.list_sessions().await
    }
}

#[cfg(test)]
#[path = "traced_tests.rs"]
mod tests;
