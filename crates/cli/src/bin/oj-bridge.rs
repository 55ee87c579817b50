// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `oj-bridge`: standalone RPC bridge binary for external tool integration
//! (§4.12, §6), sharing its implementation with `oj bridge`.

use clap::Parser;
use oj::commands::bridge::{self, BridgeArgs};

#[derive(Parser)]
#[command(
    name = "oj-bridge",
    version,
    about = "Invoke an RPC verb as JSON against the running daemon"
)]
struct Cli {
    #[command(flatten)]
    args: BridgeArgs,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    if let Err(e) = bridge::run(cli.args).await {
        let code = e
            .downcast_ref::<oj::exit_error::ExitError>()
            .map_or(1, |c| c.code);
        eprintln!("Error: {e}");
        std::process::exit(code);
    }
}
