//! CLI error handling specs
//!
//! Verify clap-level argument validation — these never need a running daemon.

use crate::prelude::*;

#[test]
fn unknown_subcommand_shows_error() {
    cli().args(&["frobnicate"]).fails().stderr_has("unrecognized subcommand");
}

#[test]
fn spawn_missing_work_dir_shows_error() {
    cli().args(&["spawn", "manager"]).fails().stderr_has("required");
}

#[test]
fn spawn_invalid_role_shows_error() {
    cli().args(&["spawn", "overlord", "/tmp"]).fails().stderr_has("invalid value");
}

#[test]
fn send_missing_text_shows_error() {
    cli().args(&["send", "mgr_1_1"]).fails().stderr_has("required");
}

#[test]
fn terminate_missing_instance_id_shows_error() {
    cli().args(&["terminate"]).fails().stderr_has("required");
}
