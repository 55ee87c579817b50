// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! oj - Orchestration Kernel CLI

mod client;
mod client_lifecycle;
mod color;
mod commands;
mod daemon_process;
mod env;
mod exit_error;
mod help;
mod output;
mod table;

use output::OutputFormat;

use anyhow::Result;
use clap::{CommandFactory, FromArgMatches, Parser, Subcommand};
use commands::{bridge, broadcast, daemon, kernel, parallel, perf, vcc};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "oj",
    version,
    disable_version_flag = true,
    about = "Odd Jobs - an orchestration kernel for hierarchical agent work"
)]
struct Cli {
    /// Change to <dir> before doing anything
    #[arg(short = 'C', global = true, value_name = "DIR")]
    directory: Option<PathBuf>,

    /// Output format
    #[arg(
        short = 'o',
        long = "output",
        value_enum,
        default_value_t,
        global = true
    )]
    output: OutputFormat,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Spawn a child instance under the calling instance
    Spawn(kernel::SpawnArgs),
    /// Send text to an instance's pane
    Send(kernel::SendArgs),
    /// Read recent output from an instance's pane
    Read(kernel::ReadArgs),
    /// List instances in the hierarchy
    List(kernel::ListArgs),
    /// Terminate an instance and its descendants
    Terminate { instance_id: String },
    /// Restart a crashed or terminated instance
    Restart { instance_id: String },
    /// Show an instance's task progress
    Progress(kernel::ProgressArgs),
    /// Merge an instance's branch into another
    MergeBranch {
        instance_id: String,
        dst: String,
        #[arg(long, value_enum, default_value = "auto")]
        strategy: kernel::MergeStrategyArg,
    },
    /// Show an instance's owned branch, if any
    GetBranch { instance_id: String },
    /// Version control coordination
    Vcc {
        #[command(subcommand)]
        command: vcc::VccCommand,
    },
    /// Distribute and inspect parallel work
    Parallel {
        #[command(subcommand)]
        command: parallel::ParallelCommand,
    },
    /// Inspect and tune performance settings
    Perf {
        #[command(subcommand)]
        command: perf::PerfCommand,
    },
    /// Invoke an RPC verb as JSON, for external tool integration
    Bridge(bridge::BridgeArgs),
    /// Schedule a message for delivery to every live instance session
    Broadcast(broadcast::BroadcastArgs),
    /// Daemon management
    Daemon(daemon::DaemonArgs),
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        let code = e
            .downcast_ref::<exit_error::ExitError>()
            .map_or(1, |c| c.code);
        let msg = format_error(&e);
        if !msg.is_empty() {
            eprintln!("Error: {}", msg);
        }
        std::process::exit(code);
    }
}

/// Format an anyhow error, deduplicating the chain.
///
/// If the top-level Display already contains the source error text, we skip
/// the "Caused by" chain to avoid noisy duplicate output (common when
/// thiserror variants use `#[error("... {0}")]` with `#[from]`).
/// Otherwise we render the full chain so context isn't lost.
fn format_error(err: &anyhow::Error) -> String {
    let top = err.to_string();

    let chain_redundant = err
        .chain()
        .skip(1)
        .all(|cause| top.contains(&cause.to_string()));

    if chain_redundant {
        return top;
    }

    let mut buf = top;
    for (i, cause) in err.chain().skip(1).enumerate() {
        buf.push_str(&format!("\n\nCaused by:\n    {}: {}", i, cause));
    }
    buf
}

fn cli_command() -> clap::Command {
    Cli::command()
        .help_template(help::template())
        .before_help(help::commands())
        .after_help(help::after_help())
        .styles(help::styles())
        .arg(
            clap::Arg::new("version")
                .short('v')
                .short_alias('V')
                .long("version")
                .action(clap::ArgAction::Version)
                .help("Print version"),
        )
}

async fn run() -> Result<()> {
    let matches = match cli_command().try_get_matches() {
        Ok(m) => m,
        Err(e) => {
            if e.kind() == clap::error::ErrorKind::DisplayHelp {
                let args: Vec<String> = std::env::args().collect();
                let args = strip_global_flags(&args);
                print_formatted_help(&args);
                return Ok(());
            }
            e.exit();
        }
    };
    let cli = Cli::from_arg_matches(&matches)?;
    let format = cli.output;

    if let Some(ref dir) = cli.directory {
        let canonical = std::fs::canonicalize(dir).map_err(|e| {
            anyhow::anyhow!("cannot change to directory '{}': {}", dir.display(), e)
        })?;
        std::env::set_current_dir(&canonical).map_err(|e| {
            anyhow::anyhow!(
                "cannot change to directory '{}': {}",
                canonical.display(),
                e
            )
        })?;
    }

    let command = match cli.command {
        Some(cmd) => cmd,
        None => {
            help::print_help(cli_command());
            return Ok(());
        }
    };

    match command {
        Commands::Spawn(args) => kernel::spawn(args, format).await?,
        Commands::Send(args) => kernel::send(args, format).await?,
        Commands::Read(args) => kernel::read(args, format).await?,
        Commands::List(args) => kernel::list(args, format).await?,
        Commands::Terminate { instance_id } => kernel::terminate(instance_id, format).await?,
        Commands::Restart { instance_id } => kernel::restart(instance_id, format).await?,
        Commands::Progress(args) => kernel::progress(args, format).await?,
        Commands::MergeBranch { instance_id, dst, strategy } => {
            kernel::kernel(kernel::KernelCommand::MergeBranch { instance_id, dst, strategy }, format).await?
        }
        Commands::GetBranch { instance_id } => {
            kernel::kernel(kernel::KernelCommand::GetBranch { instance_id }, format).await?
        }
        Commands::Vcc { command } => vcc::vcc(command, format).await?,
        Commands::Parallel { command } => parallel::parallel(command, format).await?,
        Commands::Perf { command } => perf::perf(command, format).await?,
        Commands::Bridge(args) => bridge::run(args).await?,
        Commands::Broadcast(args) => broadcast::run(args, format).await?,
        Commands::Daemon(args) => daemon::daemon(args, format).await?,
    }

    Ok(())
}

/// Print help with post-hoc colorization, resolving the correct subcommand from args.
fn print_formatted_help(args: &[String]) {
    let cmd = cli_command();

    let non_flags: Vec<&String> = args
        .iter()
        .skip(1)
        .filter(|arg| !arg.starts_with('-'))
        .collect();

    let subcommand_names: Vec<&str> = if non_flags.first().map(|s| s.as_str()) == Some("help") {
        non_flags.iter().skip(1).map(|s| s.as_str()).collect()
    } else {
        non_flags.iter().map(|s| s.as_str()).collect()
    };

    let target_cmd = find_subcommand(cmd, &subcommand_names);
    help::print_help(target_cmd);
}

/// Strip `-C <value>` from args to avoid mistaking its value for a subcommand
/// name in help formatting.
fn strip_global_flags(args: &[String]) -> Vec<String> {
    let mut result = Vec::with_capacity(args.len());
    let mut skip_next = false;
    for arg in args {
        if skip_next {
            skip_next = false;
            continue;
        }
        if arg == "-C" {
            skip_next = true;
            continue;
        }
        if arg.starts_with("-C") && arg.len() > 2 {
            continue;
        }
        result.push(arg.clone());
    }
    result
}

/// Recursively find a nested subcommand by name path.
pub(crate) fn find_subcommand(mut cmd: clap::Command, names: &[&str]) -> clap::Command {
    for name in names {
        let mut found_sub = None;
        for sub in cmd.get_subcommands() {
            if sub.get_name() == *name || sub.get_all_aliases().any(|a| a == *name) {
                found_sub = Some(sub.get_name().to_string());
                break;
            }
        }
        if let Some(sub_name) = found_sub {
            if let Some(sub) = cmd.find_subcommand_mut(&sub_name) {
                cmd = sub.clone();
            } else {
                break;
            }
        } else {
            break;
        }
    }
    cmd
}
