// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `oj daemon` - Daemon management commands

use crate::client::{ClientError, DaemonClient};
use crate::client_lifecycle::daemon_stop;
use crate::output::OutputFormat;
use anyhow::{anyhow, Result};
use clap::{Args, Subcommand};
use std::path::PathBuf;
use std::process::Command;

#[derive(Args)]
pub struct DaemonArgs {
    /// Print daemon version
    #[arg(short = 'v', long = "version")]
    pub version: bool,

    #[command(subcommand)]
    pub command: Option<DaemonCommand>,
}

#[derive(Subcommand)]
pub enum DaemonCommand {
    /// Start the daemon (foreground or background)
    Start {
        /// Run in foreground (useful for debugging)
        #[arg(long)]
        foreground: bool,
    },
    /// Stop the daemon
    Stop {
        /// Kill all active instances before stopping
        #[arg(long)]
        kill: bool,
    },
    /// Check daemon status
    Status,
    /// Stop and restart the daemon
    Restart {
        /// Kill all active instances before restarting
        #[arg(long)]
        kill: bool,
    },
    /// View daemon logs
    Logs {
        /// Number of recent lines to show (default: 50)
        #[arg(short = 'n', long, default_value = "50")]
        limit: usize,
        /// Show all lines (no limit)
        #[arg(long, conflicts_with = "limit")]
        no_limit: bool,
    },
}

pub async fn daemon(args: DaemonArgs, format: OutputFormat) -> Result<()> {
    if args.version {
        return version(format).await;
    }

    match args.command {
        Some(DaemonCommand::Start { foreground }) => start(foreground).await,
        Some(DaemonCommand::Stop { kill }) => stop(kill).await,
        Some(DaemonCommand::Restart { kill }) => restart(kill).await,
        Some(DaemonCommand::Status) => status(format).await,
        Some(DaemonCommand::Logs { limit, no_limit }) => logs(limit, no_limit, format).await,
        None => {
            let cmd = crate::find_subcommand(crate::cli_command(), &["daemon"]);
            crate::help::print_help(cmd);
            Ok(())
        }
    }
}

fn not_running(format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Text => println!("Daemon not running"),
        OutputFormat::Json => println!(r#"{{ "status": "not_running" }}"#),
    }
    Ok(())
}

fn is_connection_refused(e: &ClientError) -> bool {
    matches!(e, ClientError::DaemonNotRunning)
        || matches!(
            e,
            ClientError::Io(ref io)
                if matches!(io.kind(), std::io::ErrorKind::ConnectionRefused | std::io::ErrorKind::NotFound)
        )
}

async fn version(format: OutputFormat) -> Result<()> {
    let client = match DaemonClient::connect() {
        Ok(c) => c,
        Err(_) => return not_running(format),
    };

    let version = match client.hello().await {
        Ok(v) => v,
        Err(e) if is_connection_refused(&e) => return not_running(format),
        Err(_) => "unknown".to_string(),
    };

    match format {
        OutputFormat::Text => println!("ojd {}", version),
        OutputFormat::Json => {
            let obj = serde_json::json!({ "version": version });
            println!("{}", serde_json::to_string_pretty(&obj)?);
        }
    }

    Ok(())
}

async fn start(foreground: bool) -> Result<()> {
    if foreground {
        let ojd_path = find_ojd_binary()?;
        let status = Command::new(&ojd_path).status()?;
        if !status.success() {
            return Err(anyhow!("Daemon exited with status: {}", status));
        }
        return Ok(());
    }

    if let Ok(client) = DaemonClient::connect() {
        if let Ok((_, uptime_secs, _)) = client.status().await {
            println!("Daemon already running (uptime: {}s)", uptime_secs);
            return Ok(());
        }
    }

    match DaemonClient::for_action() {
        Ok(_client) => {
            println!("Daemon started");
            Ok(())
        }
        Err(e) => Err(anyhow!("{}", e)),
    }
}

async fn stop(kill: bool) -> Result<()> {
    match daemon_stop(kill).await {
        Ok(true) => {
            println!("Daemon stopped");
            Ok(())
        }
        Ok(false) => {
            println!("Daemon not running");
            Ok(())
        }
        Err(e) => Err(anyhow!("Failed to stop daemon: {}", e)),
    }
}

async fn restart(kill: bool) -> Result<()> {
    let was_running = daemon_stop(kill).await.map_err(|e| anyhow!("Failed to stop daemon: {}", e))?;

    if was_running {
        tokio::time::sleep(std::time::Duration::from_millis(500)).await;
    }

    match DaemonClient::for_action() {
        Ok(_client) => {
            println!("Daemon restarted");
            Ok(())
        }
        Err(e) => Err(anyhow!("{}", e)),
    }
}

async fn status(format: OutputFormat) -> Result<()> {
    let client = match DaemonClient::connect() {
        Ok(c) => c,
        Err(_) => return not_running(format),
    };

    let (version, uptime_secs, instance_count) = match client.status().await {
        Ok(result) => result,
        Err(e) if is_connection_refused(&e) => return not_running(format),
        Err(e) => return Err(anyhow!("{}", e)),
    };

    match format {
        OutputFormat::Text => {
            println!("Status: running");
            println!("Version: {}", version);
            println!("Uptime: {}", format_uptime(uptime_secs));
            println!("Instances: {}", instance_count);
        }
        OutputFormat::Json => {
            let obj = serde_json::json!({
                "status": "running",
                "version": version,
                "uptime_secs": uptime_secs,
                "uptime": format_uptime(uptime_secs),
                "instance_count": instance_count,
            });
            println!("{}", serde_json::to_string_pretty(&obj)?);
        }
    }

    Ok(())
}

async fn logs(limit: usize, no_limit: bool, format: OutputFormat) -> Result<()> {
    let log_path = get_log_path()?;

    if !log_path.exists() {
        match format {
            OutputFormat::Text => println!("No log file found at {}", log_path.display()),
            OutputFormat::Json => {
                let obj = serde_json::json!({
                    "log_path": log_path.to_string_lossy(),
                    "lines": [],
                });
                println!("{}", serde_json::to_string_pretty(&obj)?);
            }
        }
        return Ok(());
    }

    let content = if no_limit { std::fs::read_to_string(&log_path)? } else { read_last_lines(&log_path, limit)? };

    match format {
        OutputFormat::Text => {
            print!("{}", content);
            if !content.ends_with('\n') {
                println!();
            }
        }
        OutputFormat::Json => {
            let obj = serde_json::json!({
                "log_path": log_path.to_string_lossy(),
                "lines": content.lines().collect::<Vec<_>>(),
            });
            println!("{}", serde_json::to_string_pretty(&obj)?);
        }
    }

    Ok(())
}

fn read_last_lines(path: &std::path::Path, n: usize) -> Result<String> {
    use std::io::{BufRead, BufReader};
    let file = std::fs::File::open(path)?;
    let lines: Vec<String> = BufReader::new(file).lines().collect::<std::io::Result<_>>()?;
    let start = lines.len().saturating_sub(n);
    Ok(lines[start..].join("\n"))
}

fn format_uptime(secs: u64) -> String {
    let hours = secs / 3600;
    let mins = (secs % 3600) / 60;
    let secs = secs % 60;

    if hours > 0 {
        format!("{}h {}m {}s", hours, mins, secs)
    } else if mins > 0 {
        format!("{}m {}s", mins, secs)
    } else {
        format!("{}s", secs)
    }
}

fn find_ojd_binary() -> Result<PathBuf> {
    let current_exe = std::env::current_exe().ok();

    let is_debug_build =
        current_exe.as_ref().and_then(|p| p.to_str()).map(|s| s.contains("target/debug")).unwrap_or(false);

    if is_debug_build {
        if let Ok(manifest_dir) = std::env::var("CARGO_MANIFEST_DIR") {
            let dev_path =
                PathBuf::from(manifest_dir).parent().and_then(|p| p.parent()).map(|p| p.join("target/debug/ojd"));
            if let Some(path) = dev_path {
                if path.exists() {
                    return Ok(path);
                }
            }
        }
    }

    if let Some(ref exe) = current_exe {
        if let Some(dir) = exe.parent() {
            let sibling = dir.join("ojd");
            if sibling.exists() {
                return Ok(sibling);
            }
        }
    }

    Ok(PathBuf::from("ojd"))
}

fn get_log_path() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var("OJ_STATE_DIR") {
        return Ok(PathBuf::from(dir).join("daemon.log"));
    }

    let state_dir = std::env::var("XDG_STATE_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            std::env::var("HOME").map(|h| PathBuf::from(h).join(".local/state")).unwrap_or_else(|_| PathBuf::from("."))
        })
        .join("oj");

    Ok(state_dir.join("daemon.log"))
}
