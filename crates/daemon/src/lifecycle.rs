// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon lifecycle: configuration, the single-instance lock file, and
//! startup/shutdown of the engine components the listener dispatches into.

use crate::env;
use crate::rpc::RpcCtx;
use oj_adapters::session::TmuxAdapter;
use oj_core::SystemClock;
use oj_engine::{HealthMonitor, ParallelDispatcher, PerfSettings, PerformanceOptimizer, PrewarmPool, Supervisor};
use oj_storage::FileBackend;
use std::fs::File;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("could not determine a state directory")]
    NoStateDir,

    #[error("another daemon instance holds the lock")]
    LockFailed(std::io::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Storage(#[from] oj_storage::StorageError),
}

/// Paths the daemon owns under its state directory.
#[derive(Debug, Clone)]
pub struct Config {
    pub state_dir: PathBuf,
    pub socket_path: PathBuf,
    pub lock_path: PathBuf,
    pub version_path: PathBuf,
    pub log_path: PathBuf,
    pub registry_path: PathBuf,
}

impl Config {
    pub fn load() -> Result<Self, LifecycleError> {
        let state_dir = env::state_dir()?;
        std::fs::create_dir_all(&state_dir)?;
        Ok(Self {
            socket_path: state_dir.join("daemon.sock"),
            lock_path: state_dir.join("daemon.lock"),
            version_path: state_dir.join("daemon.version"),
            log_path: state_dir.join("daemon.log"),
            registry_path: state_dir.join("registry.json"),
            state_dir,
        })
    }
}

/// Holds the lock file open for the process lifetime; dropping it releases
/// the advisory lock.
pub struct LockGuard {
    _file: File,
}

/// Acquires the daemon's single-instance lock, recording the current pid
/// and protocol version for a competing process to report back.
pub fn acquire_lock(config: &Config) -> Result<LockGuard, LifecycleError> {
    use fs2::FileExt;

    let mut file = std::fs::OpenOptions::new().create(true).write(true).truncate(false).open(&config.lock_path)?;
    file.try_lock_exclusive().map_err(LifecycleError::LockFailed)?;
    file.set_len(0)?;
    writeln!(file, "{}", std::process::id())?;
    std::fs::write(&config.version_path, crate::protocol::PROTOCOL_VERSION)?;
    Ok(LockGuard { _file: file })
}

type DaemonSession = TmuxAdapter;
type DaemonClock = SystemClock;
type DaemonRegistry = FileBackend;

/// The fully assembled engine, ready for the listener to dispatch RPCs into
/// and for the engine loop to tick its health monitor against.
pub struct Daemon {
    pub ctx: RpcCtx<DaemonSession, DaemonRegistry, DaemonClock>,
    pub health: Arc<HealthMonitor<DaemonSession, DaemonRegistry, DaemonClock>>,
    pub start_time: std::time::Instant,
    pub _lock: LockGuard,
}

/// Builds the registry, supervisor, dispatcher, optimizer, prewarm pool, and
/// health monitor over a [`FileBackend`] and acquires the single-instance
/// lock. Returns [`LifecycleError::LockFailed`] when another daemon already
/// owns the lock — the caller is expected to report that distinctly from
/// any other startup failure.
pub fn startup(config: &Config) -> Result<Daemon, LifecycleError> {
    let lock = acquire_lock(config)?;

    let registry = Arc::new(FileBackend::open(config.registry_path.clone())?);
    let clock = SystemClock;
    let session = TmuxAdapter::new();

    let supervisor = Supervisor::new(session.clone(), registry.clone(), clock);
    let dispatcher = Arc::new(ParallelDispatcher::new(registry.clone(), clock));
    let optimizer = Arc::new(PerformanceOptimizer::new(PerfSettings::default()));
    let prewarm = Arc::new(PrewarmPool::new(
        session.clone(),
        oj_engine::env::prewarm_pool_size(),
        oj_engine::env::session_prefix(),
        config.state_dir.clone(),
    ));
    let health = Arc::new(HealthMonitor::new(session, registry.clone(), clock));

    let ctx = RpcCtx { supervisor, dispatcher, optimizer, prewarm, registry, clock };
    Ok(Daemon { ctx, health, start_time: std::time::Instant::now(), _lock: lock })
}

#[cfg(test)]
#[path = "lifecycle_tests.rs"]
mod tests;
