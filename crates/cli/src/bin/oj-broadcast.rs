// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `oj-broadcast`: standalone scheduled broadcast binary (§4.13, §6),
//! sharing its implementation with `oj broadcast`.

use clap::Parser;
use oj::commands::broadcast::{self, BroadcastArgs};
use oj::output::OutputFormat;

#[derive(Parser)]
#[command(
    name = "oj-broadcast",
    version,
    about = "Schedule a message for delivery to every live instance session"
)]
struct Cli {
    #[command(flatten)]
    args: BroadcastArgs,

    /// Output format
    #[arg(short = 'o', long = "output", value_enum, default_value_t)]
    output: OutputFormat,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    if let Err(e) = broadcast::run(cli.args, cli.output).await {
        let code = e
            .downcast_ref::<oj::exit_error::ExitError>()
            .map_or(1, |c| c.code);
        eprintln!("Error: {e}");
        std::process::exit(code);
    }
}
