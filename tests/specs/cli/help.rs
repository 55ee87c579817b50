//! CLI help output specs
//!
//! Verify help text displays for the kernel command surface.

use crate::prelude::*;

#[test]
fn oj_no_args_shows_usage_and_exits_zero() {
    cli().passes().stdout_has("Usage:");
}

#[test]
fn oj_help_shows_usage() {
    cli().args(&["--help"]).passes().stdout_has("Usage:");
}

#[test]
fn oj_help_lists_core_commands() {
    cli()
        .args(&["--help"])
        .passes()
        .stdout_has("spawn")
        .stdout_has("send")
        .stdout_has("list")
        .stdout_has("terminate");
}

#[test]
fn oj_daemon_help_shows_subcommands() {
    cli().args(&["daemon", "--help"]).passes().stdout_has("start").stdout_has("stop").stdout_has("status");
}

#[test]
fn oj_vcc_help_shows_subcommands() {
    cli().args(&["vcc", "--help"]).passes().stdout_has("status").stdout_has("merge");
}

#[test]
fn oj_version_shows_version() {
    cli().args(&["--version"]).passes().stdout_has("0.1");
}
