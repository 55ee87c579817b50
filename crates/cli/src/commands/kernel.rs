// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `oj spawn`/`send`/`read`/`list`/`terminate`/`restart`: the core
//! supervisor verbs (§4.7, §4.8).

use anyhow::{anyhow, Result};
use clap::{Args, Subcommand};
use serde_json::Value;

use crate::client::DaemonClient;
use crate::output::{format_time_ago, OutputFormat};
use crate::table::{Column, Table};

#[derive(Args)]
pub struct SpawnArgs {
    /// Role of the new instance.
    #[arg(value_enum)]
    pub role: RoleArg,
    /// Working directory for the new instance.
    pub work_dir: String,
    /// Free-form context handed to the spawned instance (JSON or plain text).
    #[arg(long, default_value = "")]
    pub context: String,
    /// Parent instance id (omit for an executive).
    #[arg(long)]
    pub parent_id: Option<String>,
    /// Workspace mode: isolated (default) or shared (managers only).
    #[arg(long, value_enum)]
    pub workspace_mode: Option<WorkspaceModeArg>,
}

#[derive(Clone, Copy, clap::ValueEnum)]
pub enum RoleArg {
    Executive,
    Manager,
    Specialist,
}

impl RoleArg {
    fn as_str(self) -> &'static str {
        match self {
            RoleArg::Executive => "executive",
            RoleArg::Manager => "manager",
            RoleArg::Specialist => "specialist",
        }
    }
}

#[derive(Clone, Copy, clap::ValueEnum)]
pub enum WorkspaceModeArg {
    Isolated,
    Shared,
}

impl WorkspaceModeArg {
    fn as_str(self) -> &'static str {
        match self {
            WorkspaceModeArg::Isolated => "isolated",
            WorkspaceModeArg::Shared => "shared",
        }
    }
}

pub async fn spawn(args: SpawnArgs, format: OutputFormat) -> Result<()> {
    let client = DaemonClient::for_action()?;
    let context: Value = serde_json::from_str(&args.context).unwrap_or_else(|_| Value::String(args.context.clone()));

    let mut payload = serde_json::json!({
        "role": args.role.as_str(),
        "work_dir": args.work_dir,
        "context": context,
    });
    if let Some(parent_id) = &args.parent_id {
        payload["parent_id"] = Value::String(parent_id.clone());
    }
    if let Some(mode) = args.workspace_mode {
        payload["workspace_mode"] = Value::String(mode.as_str().to_string());
    }

    let result = client.rpc("spawn", payload, None).await.map_err(|e| anyhow!("{e}"))?;
    let instance_id = result.get("instance_id").and_then(Value::as_str).unwrap_or_default();

    match format {
        OutputFormat::Text => println!("spawned {instance_id}"),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&result)?),
    }
    Ok(())
}

#[derive(Args)]
pub struct SendArgs {
    pub instance_id: String,
    pub text: String,
    /// Deliver ahead of queued normal-priority messages.
    #[arg(long)]
    pub critical: bool,
    /// Allow this send to be coalesced with adjacent sends to the same pane.
    #[arg(long)]
    pub batchable: bool,
}

pub async fn send(args: SendArgs, format: OutputFormat) -> Result<()> {
    let client = DaemonClient::for_action()?;
    let payload = serde_json::json!({
        "instance_id": args.instance_id,
        "text": args.text,
        "priority": if args.critical { "critical" } else { "normal" },
        "batchable": args.batchable,
    });
    client.rpc("send", payload, None).await.map_err(|e| anyhow!("{e}"))?;

    match format {
        OutputFormat::Text => println!("sent"),
        OutputFormat::Json => println!(r#"{{ "success": true }}"#),
    }
    Ok(())
}

#[derive(Args)]
pub struct ReadArgs {
    pub instance_id: String,
    /// Number of trailing lines to return (default: all scrollback).
    #[arg(long)]
    pub lines: Option<u32>,
}

pub async fn read(args: ReadArgs, format: OutputFormat) -> Result<()> {
    let client = DaemonClient::for_query()?;
    let mut payload = serde_json::json!({"instance_id": args.instance_id});
    if let Some(lines) = args.lines {
        payload["lines"] = Value::from(lines);
    }
    let result = client.rpc("read", payload, None).await.map_err(|e| anyhow!("{e}"))?;
    let output = result.get("output").and_then(Value::as_str).unwrap_or_default();

    match format {
        OutputFormat::Text => print!("{output}"),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&result)?),
    }
    Ok(())
}

#[derive(Args)]
pub struct ListArgs {
    /// Filter by role.
    #[arg(long, value_enum)]
    pub role: Option<RoleArg>,
    /// Filter by parent instance id.
    #[arg(long)]
    pub parent_id: Option<String>,
}

pub async fn list(args: ListArgs, format: OutputFormat) -> Result<()> {
    let client = DaemonClient::for_query()?;
    let mut payload = serde_json::json!({});
    if let Some(role) = args.role {
        payload["role"] = Value::String(role.as_str().to_string());
    }
    if let Some(parent_id) = &args.parent_id {
        payload["parent_id"] = Value::String(parent_id.clone());
    }

    let result = client.rpc("list", payload, None).await.map_err(|e| anyhow!("{e}"))?;
    let instances = result.get("instances").and_then(Value::as_array).cloned().unwrap_or_default();

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&result)?),
        OutputFormat::Text => {
            let mut table = Table::new(vec![
                Column::left("INSTANCE"),
                Column::left("ROLE"),
                Column::left("PARENT"),
                Column::status("STATUS"),
                Column::left("LAST SEEN"),
            ]);
            for inst in &instances {
                let row = vec![
                    inst.get("instance_id").and_then(Value::as_str).unwrap_or("-").to_string(),
                    inst.get("role").and_then(Value::as_str).unwrap_or("-").to_string(),
                    inst.get("parent_id").and_then(Value::as_str).unwrap_or("-").to_string(),
                    inst.get("status").and_then(Value::as_str).unwrap_or("-").to_string(),
                    inst.get("last_seen_at").and_then(Value::as_u64).map(format_time_ago).unwrap_or_default(),
                ];
                table.row(row);
            }
            let mut buf = Vec::new();
            table.render(&mut buf);
            print!("{}", String::from_utf8_lossy(&buf));
        }
    }
    Ok(())
}

pub async fn terminate(instance_id: String, format: OutputFormat) -> Result<()> {
    let client = DaemonClient::for_action()?;
    let result =
        client.rpc("terminate", serde_json::json!({"instance_id": instance_id}), None).await.map_err(|e| anyhow!("{e}"))?;

    match format {
        OutputFormat::Text => {
            let terminated = result.get("terminated").and_then(Value::as_array).cloned().unwrap_or_default();
            println!("terminated {} instance(s)", terminated.len());
            for id in &terminated {
                if let Some(id) = id.as_str() {
                    println!("  {id}");
                }
            }
        }
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&result)?),
    }
    Ok(())
}

pub async fn restart(instance_id: String, format: OutputFormat) -> Result<()> {
    let client = DaemonClient::for_action()?;
    let result =
        client.rpc("restart", serde_json::json!({"instance_id": instance_id}), None).await.map_err(|e| anyhow!("{e}"))?;

    match format {
        OutputFormat::Text => {
            let resumed = result.get("resumed").and_then(Value::as_bool).unwrap_or(false);
            println!("restarted {instance_id} (resumed: {resumed})");
        }
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&result)?),
    }
    Ok(())
}

#[derive(Args)]
pub struct ProgressArgs {
    pub instance_id: String,
}

pub async fn progress(args: ProgressArgs, format: OutputFormat) -> Result<()> {
    let client = DaemonClient::for_query()?;
    let result =
        client.rpc("get_progress", serde_json::json!({"instance_id": args.instance_id}), None).await.map_err(|e| anyhow!("{e}"))?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&result)?),
        OutputFormat::Text => {
            let rate = result.get("completion_rate").and_then(Value::as_f64).unwrap_or(0.0);
            println!("completion: {:.0}%", rate * 100.0);
            if let Some(todos) = result.get("todos").and_then(Value::as_array) {
                for todo in todos {
                    let status = todo.get("status").and_then(Value::as_str).unwrap_or("-");
                    let content = todo.get("content").and_then(Value::as_str).unwrap_or("-");
                    println!("  [{status}] {content}");
                }
            }
        }
    }
    Ok(())
}

#[derive(Subcommand)]
pub enum KernelCommand {
    /// Merge an instance's branch into another (§4.6).
    MergeBranch {
        instance_id: String,
        dst: String,
        #[arg(long, value_enum, default_value = "auto")]
        strategy: MergeStrategyArg,
    },
    /// Show an instance's owned branch, if any.
    GetBranch { instance_id: String },
}

#[derive(Clone, Copy, clap::ValueEnum)]
pub enum MergeStrategyArg {
    Auto,
    Manual,
}

pub async fn kernel(cmd: KernelCommand, format: OutputFormat) -> Result<()> {
    match cmd {
        KernelCommand::MergeBranch { instance_id, dst, strategy } => {
            let client = DaemonClient::for_action()?;
            let strategy_str = match strategy {
                MergeStrategyArg::Auto => "auto",
                MergeStrategyArg::Manual => "manual",
            };
            let payload = serde_json::json!({"instance_id": instance_id, "dst": dst, "strategy": strategy_str});
            let result = client.rpc("merge_branch", payload, None).await.map_err(|e| anyhow!("{e}"))?;
            match format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&result)?),
                OutputFormat::Text => {
                    let success = result.get("success").and_then(Value::as_bool).unwrap_or(false);
                    println!("merge {}", if success { "succeeded" } else { "failed" });
                }
            }
        }
        KernelCommand::GetBranch { instance_id } => {
            let client = DaemonClient::for_query()?;
            let result = client.rpc("get_branch", serde_json::json!({"instance_id": instance_id}), None).await.map_err(|e| anyhow!("{e}"))?;
            match format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&result)?),
                OutputFormat::Text => {
                    let branch = result.get("branch_name").and_then(Value::as_str).unwrap_or("(none)");
                    println!("{branch}");
                }
            }
        }
    }
    Ok(())
}
