// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access for the engine crate.

use std::time::Duration;

fn parse_duration_ms(var: &str) -> Option<Duration> {
    std::env::var(var).ok().and_then(|s| s.parse::<u64>().ok()).map(Duration::from_millis)
}

fn parse_usize(var: &str) -> Option<usize> {
    std::env::var(var).ok().and_then(|s| s.parse::<usize>().ok())
}

/// Multiplexer session name prefix (`<prefix>_<instance_id>`, §3.1).
pub fn session_prefix() -> String {
    std::env::var("OJ_SESSION_PREFIX").unwrap_or_else(|_| "oj".to_string())
}

/// Delay after spawn before an instance transitions `spawning → active`
/// (§4.7), default 2s.
pub fn readiness_delay() -> Duration {
    parse_duration_ms("OJ_READINESS_DELAY_MS").unwrap_or(Duration::from_secs(2))
}

/// Command line used to start the child assistant process inside a newly
/// created pane (§4.7). No built-in default: callers must configure what
/// assistant binary their deployment runs.
pub fn child_command() -> Option<String> {
    std::env::var("OJ_CHILD_COMMAND").ok().filter(|s| !s.is_empty())
}

/// Maximum number of concurrently live (non-terminated) instances before
/// spawn fails `ResourceLimitExceeded` (§4.7). `None` means unbounded.
pub fn max_instances() -> Option<usize> {
    parse_usize("OJ_MAX_INSTANCES")
}

/// Global maximum concurrent spawns the dispatcher/optimizer will admit at
/// once (§4.9, §4.10), default 5.
pub fn max_concurrent_spawns() -> usize {
    parse_usize("OJ_MAX_CONCURRENT_SPAWNS").unwrap_or(5)
}

/// Maximum specialists a single manager may hold active (§4.9), default 4.
pub fn max_specialists_per_manager() -> usize {
    parse_usize("OJ_MAX_SPECIALISTS_PER_MANAGER").unwrap_or(4)
}

/// Maximum concurrent VCC operations across the workspace (§4.10), default 4.
pub fn max_concurrent_vcc_ops() -> usize {
    parse_usize("OJ_MAX_CONCURRENT_VCC_OPS").unwrap_or(4)
}

/// Idempotent-read cache capacity (§4.10), default 1000 entries.
pub fn cache_capacity() -> usize {
    parse_usize("OJ_CACHE_CAPACITY").unwrap_or(1000)
}

/// Idempotent-read cache entry TTL (§4.10), default 60s.
pub fn cache_ttl() -> Duration {
    parse_duration_ms("OJ_CACHE_TTL_MS").unwrap_or(Duration::from_secs(60))
}

/// Number of multiplexer sessions the pre-warm pool keeps ready (§4.10),
/// default 0 (pre-warming disabled unless configured).
pub fn prewarm_pool_size() -> usize {
    parse_usize("OJ_PREWARM_POOL_SIZE").unwrap_or(0)
}

/// Health probe interval (§4.11), default 30s.
pub fn health_probe_interval() -> Duration {
    parse_duration_ms("OJ_HEALTH_PROBE_INTERVAL_MS").unwrap_or(Duration::from_secs(30))
}

/// Consecutive probe failures before a breaker opens (§4.11), default 5.
pub fn breaker_failure_threshold() -> u32 {
    parse_usize("OJ_BREAKER_FAILURE_THRESHOLD").unwrap_or(5) as u32
}

/// Consecutive half-open successes before a breaker closes (§4.11), default 2.
pub fn breaker_success_threshold() -> u32 {
    parse_usize("OJ_BREAKER_SUCCESS_THRESHOLD").unwrap_or(2) as u32
}

/// Time an open breaker waits before allowing a half-open trial (§4.11),
/// default 60s.
pub fn breaker_reset_timeout() -> Duration {
    parse_duration_ms("OJ_BREAKER_RESET_TIMEOUT_MS").unwrap_or(Duration::from_secs(60))
}

#[cfg(test)]
#[path = "env_tests.rs"]
mod tests;
