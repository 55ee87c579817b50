// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `oj broadcast` / `oj-broadcast`: schedule a message for delivery to every
//! live instance session at a future time (§4.13).
//!
//! Shared between the `oj` subcommand and the standalone `oj-broadcast`
//! binary so both parse the same grammar and hit the same exit codes (§6).

use anyhow::Result;
use chrono::{DateTime, Duration as ChronoDuration, Local, NaiveTime};
use clap::Args;
use serde_json::Value;

use crate::client::DaemonClient;
use crate::exit_error::{broadcast as codes, ExitError};
use crate::output::OutputFormat;

#[derive(Args, Clone)]
pub struct BroadcastArgs {
    /// Time expression: `+30m`, `+2h`, `14:30`, `2:30pm`, `in 30 minutes`
    pub time_expression: Option<String>,

    /// Compute and print the target time without sending anything
    #[arg(long)]
    pub dry_run: bool,

    /// Message to deliver (default: a generic reminder)
    #[arg(short = 'm', long)]
    pub message: Option<String>,

    #[arg(long)]
    pub verbose: bool,
}

const DEFAULT_MESSAGE: &str = "scheduled broadcast: check in";

const MIN_RELATIVE_DELAY: ChronoDuration = ChronoDuration::minutes(1);
const MAX_RELATIVE_DELAY: ChronoDuration = ChronoDuration::hours(24);

/// Result of parsing a time expression against a reference instant.
pub struct ParsedTime {
    pub target: DateTime<Local>,
    pub delay_ms: i64,
    pub matched_parser: &'static str,
}

/// Parse the grammar in §4.13 against `now`. Pure function, no I/O, so it's
/// testable without touching the system clock.
pub fn parse_time_expression(input: &str, now: DateTime<Local>) -> Result<ParsedTime, oj_core::CoreError> {
    let trimmed = input.trim();

    if let Some(parsed) = parse_relative(trimmed, now)? {
        return Ok(parsed);
    }
    if let Some(parsed) = parse_natural(trimmed, now)? {
        return Ok(parsed);
    }
    if let Some(parsed) = parse_12_hour(trimmed, now)? {
        return Ok(parsed);
    }
    if let Some(parsed) = parse_24_hour_or_ambiguous(trimmed, now)? {
        return Ok(parsed);
    }

    Err(oj_core::CoreError::InvalidArgument(format!("unrecognized time expression: {input}")))
}

fn parse_relative(s: &str, now: DateTime<Local>) -> Result<Option<ParsedTime>, oj_core::CoreError> {
    let Some(rest) = s.strip_prefix('+') else { return Ok(None) };
    let Some(unit) = rest.chars().last() else { return Ok(None) };
    if unit != 'm' && unit != 'h' {
        return Ok(None);
    }
    let digits = &rest[..rest.len() - 1];
    let Ok(n) = digits.parse::<i64>() else { return Ok(None) };
    if n < 1 {
        return Err(oj_core::CoreError::InvalidArgument("relative delay must be at least 1".into()));
    }

    let delay = if unit == 'm' { ChronoDuration::minutes(n) } else { ChronoDuration::hours(n) };
    check_relative_bounds(delay)?;
    Ok(Some(finish(now, delay, "relative")))
}

fn parse_natural(s: &str, now: DateTime<Local>) -> Result<Option<ParsedTime>, oj_core::CoreError> {
    let lower = s.to_lowercase();
    let Some(rest) = lower.strip_prefix("in ") else { return Ok(None) };
    let mut parts = rest.split_whitespace();
    let (Some(n_str), Some(unit)) = (parts.next(), parts.next()) else { return Ok(None) };
    if parts.next().is_some() {
        return Ok(None);
    }
    let Ok(n) = n_str.parse::<i64>() else { return Ok(None) };

    let delay = match unit {
        "minute" | "minutes" => ChronoDuration::minutes(n),
        "hour" | "hours" => ChronoDuration::hours(n),
        _ => return Ok(None),
    };
    if n < 1 {
        return Err(oj_core::CoreError::InvalidArgument("relative delay must be at least 1".into()));
    }
    check_relative_bounds(delay)?;
    Ok(Some(finish(now, delay, "natural")))
}

fn check_relative_bounds(delay: ChronoDuration) -> Result<(), oj_core::CoreError> {
    if delay < MIN_RELATIVE_DELAY || delay > MAX_RELATIVE_DELAY {
        return Err(oj_core::CoreError::InvalidArgument(format!(
            "relative delay {}m out of range [1m, 24h]",
            delay.num_minutes()
        )));
    }
    Ok(())
}

fn parse_12_hour(s: &str, now: DateTime<Local>) -> Result<Option<ParsedTime>, oj_core::CoreError> {
    let lower = s.to_lowercase();
    let (body, pm) = if let Some(b) = lower.strip_suffix("am") {
        (b, false)
    } else if let Some(b) = lower.strip_suffix("pm") {
        (b, true)
    } else {
        return Ok(None);
    };
    let body = body.trim_end();

    let (hour_str, minute_str) = match body.split_once(':') {
        Some((h, m)) => (h, m),
        None => (body, "0"),
    };
    let Ok(hour12) = hour_str.parse::<u32>() else { return Ok(None) };
    let Ok(minute) = minute_str.parse::<u32>() else { return Ok(None) };
    if !(1..=12).contains(&hour12) || minute > 59 {
        return Err(oj_core::CoreError::InvalidArgument(format!("invalid 12-hour time: {s}")));
    }

    let hour24 = match (hour12, pm) {
        (12, false) => 0,
        (12, true) => 12,
        (h, false) => h,
        (h, true) => h + 12,
    };

    Ok(Some(next_occurrence(now, hour24, minute, "12-hour")))
}

fn parse_24_hour_or_ambiguous(s: &str, now: DateTime<Local>) -> Result<Option<ParsedTime>, oj_core::CoreError> {
    let Some((hour_str, minute_str)) = s.split_once(':') else { return Ok(None) };
    let Ok(hour) = hour_str.parse::<u32>() else { return Ok(None) };
    let Ok(minute) = minute_str.parse::<u32>() else { return Ok(None) };
    if hour > 23 || minute > 59 {
        return Ok(None);
    }

    if (1..=12).contains(&hour) {
        return Err(oj_core::CoreError::AmbiguousTime(format!(
            "`{s}` could be a 24-hour or 12-hour time — add am/pm"
        )));
    }

    Ok(Some(next_occurrence(now, hour, minute, "24-hour")))
}

fn next_occurrence(now: DateTime<Local>, hour: u32, minute: u32, parser: &'static str) -> ParsedTime {
    let time = NaiveTime::from_hms_opt(hour, minute, 0).unwrap_or_else(|| NaiveTime::from_hms_opt(0, 0, 0).unwrap());
    let mut target = now.date_naive().and_time(time).and_local_timezone(now.timezone()).single().unwrap_or(now);
    if target <= now {
        target += ChronoDuration::days(1);
    }
    let delay = target - now;
    ParsedTime { target, delay_ms: delay.num_milliseconds(), matched_parser: parser }
}

fn finish(now: DateTime<Local>, delay: ChronoDuration, parser: &'static str) -> ParsedTime {
    let target = now + delay;
    ParsedTime { target, delay_ms: delay.num_milliseconds(), matched_parser: parser }
}

/// Shared implementation for both the `oj broadcast` subcommand and the
/// standalone `oj-broadcast` binary.
pub async fn run(args: BroadcastArgs, format: OutputFormat) -> Result<()> {
    let Some(expr) = args.time_expression.as_deref() else {
        return Err(ExitError::new(codes::MISSING_ARGUMENT, "missing time expression").into_anyhow());
    };

    let now = Local::now();
    let parsed = parse_time_expression(expr, now)
        .map_err(|e| ExitError::new(codes::INVALID_TIME, e.to_string()).into_anyhow())?;

    let message = args.message.clone().unwrap_or_else(|| DEFAULT_MESSAGE.to_string());

    if args.verbose || args.dry_run {
        eprintln!(
            "parsed `{}` via {} parser: target {} (delay {}ms)",
            expr,
            parsed.matched_parser,
            parsed.target.to_rfc3339(),
            parsed.delay_ms
        );
    }

    if args.dry_run {
        print_report(format, &parsed, &message, &[], true);
        return Ok(());
    }

    if parsed.delay_ms > 0 {
        tokio::time::sleep(std::time::Duration::from_millis(parsed.delay_ms as u64)).await;
    }

    let client = DaemonClient::for_action().map_err(|e| anyhow::anyhow!("{e}"))?;
    let instances = client.rpc("list", serde_json::json!({}), None).await.map_err(|e| anyhow::anyhow!("{e}"))?;
    let instances = instances.get("instances").and_then(Value::as_array).cloned().unwrap_or_default();

    if instances.is_empty() {
        return Err(ExitError::new(codes::NO_SESSIONS, "no active instance sessions").into_anyhow());
    }

    let mut results = Vec::new();
    for instance in &instances {
        let Some(instance_id) = instance.get("instance_id").and_then(Value::as_str) else { continue };
        let send_args = serde_json::json!({"instance_id": instance_id, "text": message});
        let ok = client.rpc("send", send_args, None).await.is_ok();
        results.push((instance_id.to_string(), ok));
    }

    let all_failed = results.iter().all(|(_, ok)| !*ok);
    print_report(format, &parsed, &message, &results, false);

    if all_failed {
        return Err(ExitError::new(codes::ALL_DELIVERIES_FAILED, "all deliveries failed").into_anyhow());
    }

    Ok(())
}

fn print_report(format: OutputFormat, parsed: &ParsedTime, message: &str, results: &[(String, bool)], dry_run: bool) {
    match format {
        OutputFormat::Text => {
            if dry_run {
                println!("DRY RUN MODE");
                println!("would deliver at {} (via {} parser)", parsed.target.to_rfc3339(), parsed.matched_parser);
                println!("message: {message}");
                println!("Dry run completed");
            } else {
                println!("delivered at {}", parsed.target.to_rfc3339());
                for (id, ok) in results {
                    println!("  {id}: {}", if *ok { "ok" } else { "failed" });
                }
            }
        }
        OutputFormat::Json => {
            let obj = serde_json::json!({
                "target": parsed.target.to_rfc3339(),
                "delay_ms": parsed.delay_ms,
                "matched_parser": parsed.matched_parser,
                "message": message,
                "dry_run": dry_run,
                "deliveries": results.iter().map(|(id, ok)| serde_json::json!({"instance_id": id, "success": ok})).collect::<Vec<_>>(),
            });
            println!("{}", serde_json::to_string_pretty(&obj).unwrap_or_default());
        }
    }
}

#[cfg(test)]
#[path = "broadcast_tests.rs"]
mod tests;
