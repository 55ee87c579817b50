//! Behavioral specifications for oj CLI.
//!
//! These tests are black-box: they invoke the CLI binary and verify
//! stdout, stderr, and exit codes.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

#[path = "specs/prelude.rs"]
mod prelude;

// cli/
#[path = "specs/cli/errors.rs"]
mod cli_errors;
#[path = "specs/cli/help.rs"]
mod cli_help;

// daemon/
#[path = "specs/daemon/lifecycle.rs"]
mod daemon_lifecycle;

// kernel/
#[path = "specs/kernel/spawn_and_list.rs"]
mod kernel_spawn_and_list;

// vcc/
#[path = "specs/vcc/merge_and_conflicts.rs"]
mod vcc_merge_and_conflicts;

// bridge/
#[path = "specs/bridge/exit_codes.rs"]
mod bridge_exit_codes;

// broadcast/
#[path = "specs/broadcast/time_expression.rs"]
mod broadcast_time_expression;
