// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for the engine crate. Every variant maps 1:1 onto an
//! [`oj_core::CoreError`] tag so RPC handlers in `oj-daemon` can surface it
//! without re-stringifying.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Core(#[from] oj_core::CoreError),

    #[error(transparent)]
    Storage(#[from] oj_storage::StorageError),

    #[error("git error: {0}")]
    Git(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl EngineError {
    /// The stable RPC error tag (§4.8, §4.12). Storage/git/io failures that
    /// have no spec-named counterpart surface as `Internal`.
    pub fn tag(&self) -> &'static str {
        match self {
            EngineError::Core(e) => e.tag(),
            EngineError::Storage(_) | EngineError::Git(_) | EngineError::Io(_) => "Internal",
        }
    }
}

pub type EngineResult<T> = Result<T, EngineError>;
