// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Reliable Sender (§4.3): wraps [`SessionAdapter`] with verification and
//! retries, escalating through three strategies. Grounded on
//! `tmux.rs`'s check-then-verify shape, generalized into a batching buffer
//! for the low-priority path.

use crate::session::SessionAdapter;
use oj_core::{CoreError, CoreResult};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// Delivery priority (§4.3) — distinct from [`oj_core::Priority`], which
/// ranks dispatched jobs rather than transport sends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendPriority {
    Normal,
    Critical,
}

const DEFAULT_BATCH_WINDOW: Duration = Duration::from_millis(100);
const DEFAULT_BATCH_MAX: usize = 10;
const DEFAULT_CRITICAL_RETRIES: u32 = 3;
const DEFAULT_CHUNK_SIZE: usize = 200;
const DEFAULT_CHUNK_DELAY: Duration = Duration::from_millis(20);
const VERIFY_DELAY: Duration = Duration::from_millis(50);
const VERIFY_LINES: u32 = 20;

/// The substring a verification capture must contain for a send to count
/// as delivered: the last non-blank line of the message (§3.1).
fn verification_token(text: &str) -> &str {
    text.lines().rev().find(|l| !l.trim().is_empty()).unwrap_or(text)
}

#[derive(Clone)]
pub struct ReliableSender<S: SessionAdapter> {
    session: S,
    batch_window: Duration,
    batch_max: usize,
    critical_retries: u32,
    buffers: Arc<Mutex<HashMap<String, Vec<String>>>>,
}

impl<S: SessionAdapter> ReliableSender<S> {
    pub fn new(session: S) -> Self {
        Self {
            session,
            batch_window: DEFAULT_BATCH_WINDOW,
            batch_max: DEFAULT_BATCH_MAX,
            critical_retries: DEFAULT_CRITICAL_RETRIES,
            buffers: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn with_batch_window(mut self, window: Duration) -> Self {
        self.batch_window = window;
        self
    }

    pub fn with_batch_max(mut self, max: usize) -> Self {
        self.batch_max = max;
        self
    }

    /// The underlying transport, for callers that need capabilities
    /// `ReliableSender` doesn't wrap (session lifecycle, listing).
    pub fn transport(&self) -> &S {
        &self.session
    }

    /// `send(target, text, priority, batchable) → delivered | fails(Undeliverable)` (§4.3).
    pub async fn send(&self, target: &str, text: &str, priority: SendPriority, batchable: bool) -> CoreResult<()> {
        match (priority, batchable) {
            (SendPriority::Normal, true) => self.enqueue_batched(target, text).await,
            (SendPriority::Normal, false) => self.send_single_shot(target, text).await,
            (SendPriority::Critical, _) => self.send_critical(target, text).await,
        }
    }

    async fn enqueue_batched(&self, target: &str, text: &str) -> CoreResult<()> {
        let (should_flush_now, needs_flusher) = {
            let mut buffers = self.buffers.lock();
            let buf = buffers.entry(target.to_string()).or_default();
            buf.push(text.to_string());
            (buf.len() >= self.batch_max, buf.len() == 1)
        };

        if should_flush_now {
            return self.flush(target).await;
        }
        if needs_flusher {
            let this = self.clone();
            let target = target.to_string();
            let window = self.batch_window;
            tokio::spawn(async move {
                tokio::time::sleep(window).await;
                let _ = this.flush(&target).await;
            });
        }
        Ok(())
    }

    async fn flush(&self, target: &str) -> CoreResult<()> {
        let batch = {
            let mut buffers = self.buffers.lock();
            buffers.remove(target).unwrap_or_default()
        };
        if batch.is_empty() {
            return Ok(());
        }
        let block = batch.join("\n");
        self.session.send_keys(target, &block, true).await
    }

    async fn send_single_shot(&self, target: &str, text: &str) -> CoreResult<()> {
        self.session.send_keys(target, text, true).await?;
        self.verify(target, text).await
    }

    async fn verify(&self, target: &str, text: &str) -> CoreResult<()> {
        tokio::time::sleep(VERIFY_DELAY).await;
        let tail = self.session.capture_pane(target, Some(VERIFY_LINES)).await?;
        if tail.contains(verification_token(text)) {
            Ok(())
        } else {
            Err(CoreError::Undeliverable {
                target: target.to_string(),
                reason: "verification capture did not contain the sent text".to_string(),
            })
        }
    }

    /// Sends in chunks with inter-chunk sleep, verifies, and retries with
    /// exponential backoff. The final attempt sends the whole text in one
    /// call, standing in for the multiplexer's paste-buffer escalation.
    async fn send_critical(&self, target: &str, text: &str) -> CoreResult<()> {
        let mut last_err = None;
        for attempt in 0..=self.critical_retries {
            let result = if attempt < self.critical_retries {
                self.send_chunked(target, text).await
            } else {
                self.session.send_keys(target, text, true).await
            };

            match result.and(self.verify(target, text).await) {
                Ok(()) => return Ok(()),
                Err(e) => {
                    tracing::warn!(target, attempt, error = %e, "critical send attempt failed");
                    last_err = Some(e);
                    if attempt < self.critical_retries {
                        tokio::time::sleep(backoff(attempt)).await;
                    }
                }
            }
        }
        Err(last_err.unwrap_or_else(|| CoreError::Undeliverable {
            target: target.to_string(),
            reason: "exhausted critical retries".to_string(),
        }))
    }

    async fn send_chunked(&self, target: &str, text: &str) -> CoreResult<()> {
        let chars: Vec<char> = text.chars().collect();
        let chunks: Vec<String> = chars.chunks(DEFAULT_CHUNK_SIZE).map(|c| c.iter().collect()).collect();
        let last = chunks.len().saturating_sub(1);
        for (i, chunk) in chunks.iter().enumerate() {
            self.session.send_keys(target, chunk, i == last).await?;
            if i != last {
                tokio::time::sleep(DEFAULT_CHUNK_DELAY).await;
            }
        }
        Ok(())
    }
}

fn backoff(attempt: u32) -> Duration {
    Duration::from_millis(100 * 2u64.saturating_pow(attempt))
}

#[cfg(test)]
#[path = "reliable_sender_tests.rs"]
mod tests;
