// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Odd Jobs CLI library: the daemon client plus the bridge and scheduled
//! broadcast command implementations, exposed so `oj-bridge`/`oj-broadcast`
//! can run as standalone binaries without linking the full `oj` subcommand
//! surface.

pub mod client;
pub mod client_lifecycle;
pub mod daemon_process;
pub mod env;
pub mod exit_error;
pub mod output;

pub mod commands {
    pub mod bridge;
    pub mod broadcast;
}
