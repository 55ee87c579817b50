// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `oj parallel`: the Parallel Dispatcher's verbs (§4.9).

use anyhow::{anyhow, Result};
use clap::Subcommand;
use serde_json::Value;

use crate::client::DaemonClient;
use crate::output::OutputFormat;

#[derive(Subcommand)]
pub enum ParallelCommand {
    /// Submit tasks and assign them to managers in one step.
    ///
    /// `tasks` and `managers` are each a JSON array, e.g.
    /// `--tasks '[{"job_id":"j1","priority":"high"}]' --managers '[{"manager_id":"mgr_1_1","capacity":4}]'`.
    Execute {
        #[arg(long)]
        tasks: String,
        #[arg(long)]
        managers: String,
        #[arg(long, default_value = "priority")]
        strategy: String,
    },
    /// Compute an assignment plan without submitting tasks to the registry.
    Distribute {
        #[arg(long)]
        tasks: String,
        #[arg(long)]
        managers: String,
        #[arg(long, default_value = "priority")]
        strategy: String,
    },
    /// Show pending/active/completed/failed job counts.
    Status,
}

pub async fn parallel(cmd: ParallelCommand, format: OutputFormat) -> Result<()> {
    let client = DaemonClient::for_action()?;

    let (verb, payload) = match cmd {
        ParallelCommand::Execute { tasks, managers, strategy } => {
            ("execute_parallel", distribution_payload(&tasks, &managers, &strategy)?)
        }
        ParallelCommand::Distribute { tasks, managers, strategy } => {
            ("distribute_work", distribution_payload(&tasks, &managers, &strategy)?)
        }
        ParallelCommand::Status => ("get_parallel_status", serde_json::json!({})),
    };

    let result = client.rpc(verb, payload, None).await.map_err(|e| anyhow!("{e}"))?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&result)?),
        OutputFormat::Text => print_text(verb, &result),
    }
    Ok(())
}

fn distribution_payload(tasks: &str, managers: &str, strategy: &str) -> Result<Value> {
    let tasks: Value = serde_json::from_str(tasks).map_err(|e| anyhow!("invalid --tasks JSON: {e}"))?;
    let managers: Value = serde_json::from_str(managers).map_err(|e| anyhow!("invalid --managers JSON: {e}"))?;
    Ok(serde_json::json!({"tasks": tasks, "managers": managers, "strategy": strategy}))
}

fn print_text(verb: &str, result: &Value) {
    match verb {
        "get_parallel_status" => {
            println!("pending:   {}", result.get("pending").and_then(Value::as_u64).unwrap_or(0));
            println!("active:    {}", result.get("active").and_then(Value::as_u64).unwrap_or(0));
            println!("completed: {}", result.get("completed").and_then(Value::as_u64).unwrap_or(0));
            println!("failed:    {}", result.get("failed").and_then(Value::as_u64).unwrap_or(0));
        }
        _ => {
            let assignments = result.get("assignments").and_then(Value::as_array).cloned().unwrap_or_default();
            for a in &assignments {
                let manager = a.get("manager_id").and_then(Value::as_str).unwrap_or("-");
                let jobs = a.get("job_ids").and_then(Value::as_array).cloned().unwrap_or_default();
                let job_ids: Vec<&str> = jobs.iter().filter_map(Value::as_str).collect();
                println!("{manager}: {}", job_ids.join(", "));
            }
        }
    }
}
