// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `oj perf`: the Performance Optimizer's verbs (§4.10).

use anyhow::{anyhow, Result};
use clap::Subcommand;
use serde_json::Value;

use crate::client::DaemonClient;
use crate::output::OutputFormat;

#[derive(Subcommand)]
pub enum PerfCommand {
    /// Show current performance settings and live queue/cache state.
    Show,
    /// Tune one or more performance settings; omitted fields keep their
    /// current value.
    Set {
        #[arg(long)]
        max_concurrent_spawns: Option<usize>,
        #[arg(long)]
        max_concurrent_vcc_ops: Option<usize>,
        #[arg(long)]
        cache_capacity: Option<usize>,
        #[arg(long)]
        cache_ttl_secs: Option<u64>,
        #[arg(long)]
        prewarm_pool_size: Option<usize>,
    },
    /// Refill the prewarmed session pool immediately.
    Prewarm,
}

pub async fn perf(cmd: PerfCommand, format: OutputFormat) -> Result<()> {
    let client = DaemonClient::for_action()?;

    let (verb, payload) = match cmd {
        PerfCommand::Show => ("get_performance", serde_json::json!({})),
        PerfCommand::Set {
            max_concurrent_spawns,
            max_concurrent_vcc_ops,
            cache_capacity,
            cache_ttl_secs,
            prewarm_pool_size,
        } => {
            let mut payload = serde_json::json!({});
            if let Some(v) = max_concurrent_spawns {
                payload["max_concurrent_spawns"] = Value::from(v);
            }
            if let Some(v) = max_concurrent_vcc_ops {
                payload["max_concurrent_vcc_ops"] = Value::from(v);
            }
            if let Some(v) = cache_capacity {
                payload["cache_capacity"] = Value::from(v);
            }
            if let Some(v) = cache_ttl_secs {
                payload["cache_ttl_secs"] = Value::from(v);
            }
            if let Some(v) = prewarm_pool_size {
                payload["prewarm_pool_size"] = Value::from(v);
            }
            ("optimize_settings", payload)
        }
        PerfCommand::Prewarm => ("prewarm_resources", serde_json::json!({})),
    };

    let result = client.rpc(verb, payload, None).await.map_err(|e| anyhow!("{e}"))?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&result)?),
        OutputFormat::Text => print_text(verb, &result),
    }
    Ok(())
}

fn print_text(verb: &str, result: &Value) {
    if verb == "prewarm_resources" {
        println!("pool size: {}", result.get("pool_size").and_then(Value::as_u64).unwrap_or(0));
        return;
    }

    let field = |name: &str| result.get(name).and_then(Value::as_u64).unwrap_or(0);
    println!("max_concurrent_spawns:  {}", field("max_concurrent_spawns"));
    println!("max_concurrent_vcc_ops: {}", field("max_concurrent_vcc_ops"));
    println!("cache_capacity:         {}", field("cache_capacity"));
    println!("cache_ttl_secs:         {}", field("cache_ttl_secs"));
    println!("prewarm_pool_size:      {}", field("prewarm_pool_size"));
    println!("spawn_queue_available:  {}", field("spawn_queue_available"));
    println!("vcc_queue_available:    {}", field("vcc_queue_available"));
    println!("cache_len:              {}", field("cache_len"));
    println!("prewarm_ready:          {}", field("prewarm_ready"));
}
