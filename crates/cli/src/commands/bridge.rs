// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `oj bridge` / `oj-bridge`: invoke a single RPC verb as JSON, for external
//! tools and spawned instances that shell out instead of linking the
//! daemon's protocol types directly (§4.12).
//!
//! Shared between the `oj` subcommand and the standalone `oj-bridge` binary.
//! Both go through [`DaemonClient`] over the daemon's Unix socket — neither
//! touches the Registry or Supervisor in-process.

use anyhow::Result;
use clap::Args;
use serde_json::Value;

use crate::client::DaemonClient;
use crate::exit_error::{bridge as codes, ExitError};

#[derive(Args, Clone)]
pub struct BridgeArgs {
    /// RPC verb, e.g. `spawn`, `send`, `list`.
    pub verb: Option<String>,
    /// JSON object of arguments for the verb.
    pub json: Option<String>,
}

/// Caller identity for RBAC, taken from `INSTANCE_ID` (§6) when the bridge
/// is invoked from inside a spawned instance; `None` for the operator.
fn caller_id() -> Option<String> {
    std::env::var("INSTANCE_ID").ok().filter(|s| !s.is_empty())
}

pub async fn run(args: BridgeArgs) -> Result<()> {
    let Some(verb) = args.verb else {
        return Err(ExitError::new(codes::VALIDATION_ERROR, "missing verb argument").into_anyhow());
    };
    let Some(json) = args.json else {
        return Err(ExitError::new(codes::JSON_PARSE_ERROR, "missing json argument").into_anyhow());
    };

    let parsed: Value = serde_json::from_str(&json)
        .map_err(|e| ExitError::new(codes::JSON_PARSE_ERROR, format!("invalid json: {e}")).into_anyhow())?;

    let client = DaemonClient::for_action().map_err(|e| ExitError::new(codes::VALIDATION_ERROR, e.to_string()).into_anyhow())?;

    match client.rpc(&verb, parsed, caller_id()).await {
        Ok(body) => {
            let success = body.get("success").and_then(Value::as_bool).unwrap_or(true);
            println!("{}", serde_json::to_string(&serde_json::json!({"success": success, "result": body}))?);
            if !success {
                return Err(ExitError::new(codes::VALIDATION_ERROR, "verb reported failure").into_anyhow());
            }
            Ok(())
        }
        Err(e) => {
            println!("{}", serde_json::to_string(&serde_json::json!({"success": false, "error": e.to_string()}))?);
            Err(ExitError::new(codes::VALIDATION_ERROR, e.to_string()).into_anyhow())
        }
    }
}
