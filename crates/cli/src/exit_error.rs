// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Typed process exit codes (§6), carried through `anyhow::Error` so a
//! single top-level handler in each binary can map failures to the exact
//! code external callers depend on.

use std::fmt;

/// An error tagged with the process exit code it should produce.
#[derive(Debug)]
pub struct ExitError {
    pub code: i32,
    pub message: String,
}

impl ExitError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self { code, message: message.into() }
    }

    pub fn into_anyhow(self) -> anyhow::Error {
        anyhow::Error::new(self)
    }
}

impl fmt::Display for ExitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ExitError {}

/// Bridge exit codes (§4.12, §6).
pub mod bridge {
    pub const JSON_PARSE_ERROR: i32 = 1;
    pub const VALIDATION_ERROR: i32 = 2;
    pub const SESSION_DISCOVERY_ERROR: i32 = 3;
    pub const ALL_DELIVERIES_FAILED: i32 = 5;
}

/// Scheduled broadcast exit codes (§4.13, §6).
pub mod broadcast {
    pub const MISSING_ARGUMENT: i32 = 1;
    pub const INVALID_TIME: i32 = 2;
    pub const NO_SESSIONS: i32 = 3;
    pub const ALL_DELIVERIES_FAILED: i32 = 5;
}
