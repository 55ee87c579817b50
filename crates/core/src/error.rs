// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error taxonomy shared across every component of the kernel. Each variant
//! is named after the failure mode it corresponds to in the component
//! contracts (§4.1–§4.9), so a `CoreError` can be mapped 1:1 onto an RPC
//! error string without re-stringifying by hand at each call site.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CoreError {
    #[error("session already exists: {0}")]
    SessionExists(String),

    #[error("transport unavailable: {0}")]
    TransportUnavailable(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("pane missing: {0}")]
    PaneMissing(String),

    #[error("message undeliverable to {target}: {reason}")]
    Undeliverable { target: String, reason: String },

    #[error("invalid role: {0}")]
    InvalidRole(String),

    #[error("parent not found: {0}")]
    ParentNotFound(String),

    #[error("capability denied: {0}")]
    CapabilityDenied(String),

    #[error("resource limit exceeded: {0}")]
    ResourceLimitExceeded(String),

    #[error("instance not found: {0}")]
    InstanceNotFound(String),

    #[error("invalid ref: {0}")]
    InvalidRef(String),

    #[error("not a repository: {0}")]
    NotARepository(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("ambiguous time expression: {0}")]
    AmbiguousTime(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl CoreError {
    /// The stable, stringly-typed error tag returned over the RPC surface
    /// (§4.8, §4.12) — distinct from the human-readable `Display` message.
    pub fn tag(&self) -> &'static str {
        match self {
            CoreError::SessionExists(_) => "SessionExists",
            CoreError::TransportUnavailable(_) => "TransportUnavailable",
            CoreError::NotFound(_) => "NotFound",
            CoreError::PaneMissing(_) => "PaneMissing",
            CoreError::Undeliverable { .. } => "Undeliverable",
            CoreError::InvalidRole(_) => "InvalidRole",
            CoreError::ParentNotFound(_) => "ParentNotFound",
            CoreError::CapabilityDenied(_) => "CapabilityDenied",
            CoreError::ResourceLimitExceeded(_) => "ResourceLimitExceeded",
            CoreError::InstanceNotFound(_) => "InstanceNotFound",
            CoreError::InvalidRef(_) => "InvalidRef",
            CoreError::NotARepository(_) => "NotARepository",
            CoreError::InvalidArgument(_) => "InvalidArgument",
            CoreError::AmbiguousTime(_) => "AmbiguousTime",
            CoreError::Internal(_) => "Internal",
        }
    }
}

pub type CoreResult<T> = Result<T, CoreError>;

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
