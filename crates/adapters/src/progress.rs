// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Progress Monitor: watches an instance's progress file and parses the
//! `[{id, status, content}]` JSON array into an `oj_core::ProgressRecord`.
//! Uses `notify` for near-instant updates with a polling fallback, the same
//! shape as the agent session-log watcher this module is ported from.

use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use oj_core::{CoreError, CoreResult, ProgressItem, ProgressRecord};
use std::fs;
use std::path::{Path, PathBuf};
use tokio::sync::{mpsc, oneshot};

/// Default progress file name, relative to an instance's work directory.
/// Overridable via `OJ_PROGRESS_FILE` (Open Question (b)).
pub const DEFAULT_PROGRESS_FILENAME: &str = ".oj-progress.json";

pub fn progress_file_path(work_dir: &Path) -> PathBuf {
    match std::env::var("OJ_PROGRESS_FILE") {
        Ok(name) if !name.is_empty() => work_dir.join(name),
        _ => work_dir.join(DEFAULT_PROGRESS_FILENAME),
    }
}

/// Reads and parses the progress file. A missing file is not an error: it
/// means the instance hasn't reported progress yet, so this returns an
/// empty record.
pub fn read_progress(work_dir: &Path) -> CoreResult<ProgressRecord> {
    let path = progress_file_path(work_dir);
    let raw = match fs::read_to_string(&path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(ProgressRecord::empty()),
        Err(e) => return Err(CoreError::Internal(format!("reading {}: {e}", path.display()))),
    };
    let todos: Vec<ProgressItem> = serde_json::from_str(&raw)
        .map_err(|e| CoreError::Internal(format!("parsing {}: {e}", path.display())))?;
    Ok(ProgressRecord::from_todos(todos))
}

/// Watches `work_dir`'s progress file, pushing a freshly-parsed
/// `ProgressRecord` onto `updates` each time it changes. Returns a sender
/// that stops the watcher when dropped or sent to.
pub fn watch(work_dir: PathBuf, updates: mpsc::Sender<ProgressRecord>) -> oneshot::Sender<()> {
    let (shutdown_tx, shutdown_rx) = oneshot::channel();
    tokio::spawn(watch_loop(work_dir, updates, shutdown_rx));
    shutdown_tx
}

async fn watch_loop(
    work_dir: PathBuf,
    updates: mpsc::Sender<ProgressRecord>,
    mut shutdown_rx: oneshot::Receiver<()>,
) {
    let path = progress_file_path(&work_dir);
    let (file_tx, mut file_rx) = mpsc::channel(32);
    let _watcher_guard = create_file_watcher(&path, file_tx).ok();
    if _watcher_guard.is_none() {
        tracing::warn!(path = %path.display(), "progress file watcher failed, using fallback polling");
    }

    let mut last = ProgressRecord::empty();
    loop {
        tokio::select! {
            Some(_) = file_rx.recv() => {
                if let Some(next) = poll_and_emit(&work_dir, &last, &updates).await {
                    last = next;
                }
            }
            _ = tokio::time::sleep(crate::env::watcher_poll_ms()) => {
                if let Some(next) = poll_and_emit(&work_dir, &last, &updates).await {
                    last = next;
                }
            }
            _ = &mut shutdown_rx => {
                tracing::debug!(path = %path.display(), "progress watcher shutdown requested");
                break;
            }
        }
    }
}

async fn poll_and_emit(
    work_dir: &Path,
    last: &ProgressRecord,
    updates: &mpsc::Sender<ProgressRecord>,
) -> Option<ProgressRecord> {
    match read_progress(work_dir) {
        Ok(current) if &current != last => {
            let _ = updates.send(current.clone()).await;
            Some(current)
        }
        Ok(_) => None,
        Err(e) => {
            tracing::warn!(work_dir = %work_dir.display(), error = %e, "failed to read progress file");
            None
        }
    }
}

fn create_file_watcher(
    path: &Path,
    tx: mpsc::Sender<()>,
) -> Result<RecommendedWatcher, notify::Error> {
    let mut watcher = notify::recommended_watcher(move |res: Result<notify::Event, _>| {
        if res.is_ok() {
            let _ = tx.blocking_send(());
        }
    })?;
    // Watch the parent directory: the progress file may not exist yet when
    // the watcher starts, and most editors/writers replace-via-rename.
    let watch_target = path.parent().unwrap_or(path);
    watcher.watch(watch_target, RecursiveMode::NonRecursive)?;
    Ok(watcher)
}

#[cfg(test)]
#[path = "progress_tests.rs"]
mod tests;
