// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `oj vcc`: version control coordination verbs (§4.6, §4.8).

use anyhow::{anyhow, Result};
use clap::Subcommand;
use serde_json::Value;

use crate::client::DaemonClient;
use crate::output::OutputFormat;

#[derive(Subcommand)]
pub enum VccCommand {
    /// Cached working-tree status for a worktree.
    Status { work_dir: String },
    /// Current branch of a worktree.
    Branch { work_dir: String },
    /// Analyze conflicts between two branches.
    Conflicts { branch_a: String, branch_b: String, work_dir: String },
    /// Merge `src` into `dst`.
    Merge {
        src: String,
        dst: String,
        work_dir: String,
        #[arg(long, value_enum, default_value = "auto")]
        strategy: super::kernel::MergeStrategyArg,
    },
    /// Delete merged branches left behind after cleanup.
    Cleanup { work_dir: String },
}

pub async fn vcc(cmd: VccCommand, format: OutputFormat) -> Result<()> {
    let client = DaemonClient::for_action()?;

    let (verb, payload): (&str, Value) = match cmd {
        VccCommand::Status { work_dir } => ("git_status", serde_json::json!({"work_dir": work_dir})),
        VccCommand::Branch { work_dir } => ("git_branch", serde_json::json!({"work_dir": work_dir})),
        VccCommand::Conflicts { branch_a, branch_b, work_dir } => {
            ("git_conflicts", serde_json::json!({"branch_a": branch_a, "branch_b": branch_b, "work_dir": work_dir}))
        }
        VccCommand::Merge { src, dst, work_dir, strategy } => {
            let strategy_str = match strategy {
                super::kernel::MergeStrategyArg::Auto => "auto",
                super::kernel::MergeStrategyArg::Manual => "manual",
            };
            ("git_merge", serde_json::json!({"src": src, "dst": dst, "work_dir": work_dir, "strategy": strategy_str}))
        }
        VccCommand::Cleanup { work_dir } => ("git_cleanup", serde_json::json!({"work_dir": work_dir})),
    };

    let result = client.rpc(verb, payload, None).await.map_err(|e| anyhow!("{e}"))?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&result)?),
        OutputFormat::Text => print_text(verb, &result),
    }
    Ok(())
}

fn print_text(verb: &str, result: &Value) {
    match verb {
        "git_branch" => println!("{}", result.get("branch").and_then(Value::as_str).unwrap_or("-")),
        "git_merge" => {
            let success = result.get("success").and_then(Value::as_bool).unwrap_or(false);
            println!("merge {}", if success { "succeeded" } else { "failed" });
            if let Some(conflicts) = result.get("conflicts").and_then(Value::as_array) {
                for c in conflicts {
                    if let Some(path) = c.as_str() {
                        println!("  conflict: {path}");
                    }
                }
            }
        }
        "git_cleanup" => {
            let deleted = result.get("deleted_branches").and_then(Value::as_array).cloned().unwrap_or_default();
            println!("deleted {} branch(es)", deleted.len());
            for b in &deleted {
                if let Some(b) = b.as_str() {
                    println!("  {b}");
                }
            }
        }
        _ => println!("{}", serde_json::to_string_pretty(result).unwrap_or_default()),
    }
}
