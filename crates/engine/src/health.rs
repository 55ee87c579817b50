// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Health Monitor & Circuit Breaker (§4.11). Builds on the same shape as
//! the base workspace's session-state classifier — a small enum that
//! normalizes a liveness probe into one verdict, driving what happens next
//! — but classifies multiplexer session liveness rather than agent
//! file-watcher state, and layers a per-instance breaker on top of it.

use crate::env;
use oj_adapters::SessionAdapter;
use oj_core::{Clock, Instance, InstanceId, Status};
use oj_storage::{InstanceFilter, Registry};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// Verdict of one liveness probe against an instance's session (§4.11).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Liveness {
    /// Session exists and (when checked) has produced output since
    /// `last_seen_at`.
    Alive,
    /// Session exists but has produced no output since `last_seen_at`.
    Stalled,
    /// Session no longer exists.
    Gone,
}

/// Per-instance breaker state (§4.11): `closed → open → half_open → closed
/// | open`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakerState {
    Closed,
    Open,
    HalfOpen,
}

impl BreakerState {
    pub fn as_str(&self) -> &'static str {
        match self {
            BreakerState::Closed => "closed",
            BreakerState::Open => "open",
            BreakerState::HalfOpen => "half_open",
        }
    }
}

/// Circuit breaker config (§4.11 defaults: 5, 2, 60s).
#[derive(Debug, Clone, Copy)]
pub struct BreakerConfig {
    pub failure_threshold: u32,
    pub success_threshold: u32,
    pub reset_timeout: Duration,
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: env::breaker_failure_threshold(),
            success_threshold: env::breaker_success_threshold(),
            reset_timeout: env::breaker_reset_timeout(),
        }
    }
}

/// One instance's breaker: tracks consecutive failures/successes and the
/// timestamp it last tripped open.
#[derive(Debug, Clone)]
struct Breaker {
    state: BreakerState,
    consecutive_failures: u32,
    consecutive_successes: u32,
    opened_at_ms: u64,
}

impl Breaker {
    fn new() -> Self {
        Self { state: BreakerState::Closed, consecutive_failures: 0, consecutive_successes: 0, opened_at_ms: 0 }
    }

    /// Whether a restart attempt is currently permitted, advancing
    /// `open → half_open` when `reset_timeout` has elapsed.
    fn allow(&mut self, now_ms: u64, config: &BreakerConfig) -> bool {
        match self.state {
            BreakerState::Closed | BreakerState::HalfOpen => true,
            BreakerState::Open => {
                if now_ms.saturating_sub(self.opened_at_ms) >= config.reset_timeout.as_millis() as u64 {
                    self.state = BreakerState::HalfOpen;
                    self.consecutive_successes = 0;
                    true
                } else {
                    false
                }
            }
        }
    }

    fn record_success(&mut self, config: &BreakerConfig) {
        self.consecutive_failures = 0;
        match self.state {
            BreakerState::Closed => {}
            BreakerState::HalfOpen => {
                self.consecutive_successes += 1;
                if self.consecutive_successes >= config.success_threshold {
                    self.state = BreakerState::Closed;
                    self.consecutive_successes = 0;
                }
            }
            BreakerState::Open => {}
        }
    }

    fn record_failure(&mut self, now_ms: u64, config: &BreakerConfig) {
        self.consecutive_successes = 0;
        match self.state {
            BreakerState::HalfOpen => {
                self.state = BreakerState::Open;
                self.opened_at_ms = now_ms;
            }
            BreakerState::Closed => {
                self.consecutive_failures += 1;
                if self.consecutive_failures >= config.failure_threshold {
                    self.state = BreakerState::Open;
                    self.opened_at_ms = now_ms;
                }
            }
            BreakerState::Open => {}
        }
    }
}

/// Outcome of probing and, where the breaker allows it, acting on one
/// instance (§4.11).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthAction {
    Healthy,
    /// The instance was unresponsive but the breaker rejected a restart
    /// attempt (`open`).
    RejectedByBreaker,
    /// The instance was unresponsive and a restart was triggered.
    RestartTriggered,
}

/// Runs liveness probes across active instances and gates restarts behind
/// a per-instance breaker (§4.11).
pub struct HealthMonitor<S: SessionAdapter, R: Registry + 'static, C: Clock> {
    session: S,
    registry: Arc<R>,
    clock: C,
    config: BreakerConfig,
    breakers: parking_lot::Mutex<HashMap<InstanceId, Breaker>>,
}

impl<S: SessionAdapter, R: Registry + 'static, C: Clock> HealthMonitor<S, R, C> {
    pub fn new(session: S, registry: Arc<R>, clock: C) -> Self {
        Self { session, registry, clock, config: BreakerConfig::default(), breakers: parking_lot::Mutex::new(HashMap::new()) }
    }

    pub fn with_config(mut self, config: BreakerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn breaker_state(&self, instance_id: &InstanceId) -> BreakerState {
        self.breakers.lock().get(instance_id).map(|b| b.state).unwrap_or(BreakerState::Closed)
    }

    /// Probes one instance's session (§4.11): `session_exists` plus, when
    /// the instance has a `last_seen_at` to compare against, whether the
    /// pane has produced output since then.
    async fn probe(&self, instance: &Instance) -> Liveness {
        let sessions = self.session.list_sessions().await;
        let exists = sessions.iter().any(|s| s.name == instance.session_name);
        if !exists {
            return Liveness::Gone;
        }
        match self.session.capture_pane(&instance.pane_target, Some(1)).await {
            Ok(tail) if tail.trim().is_empty() => Liveness::Stalled,
            Ok(_) => Liveness::Alive,
            Err(_) => Liveness::Stalled,
        }
    }

    /// Probes every active instance once and returns the action taken for
    /// each. Intended to be called on `env::health_probe_interval()`'s tick.
    pub async fn run_once(&self) -> Vec<(InstanceId, HealthAction)> {
        let instances = self
            .registry
            .list_instances(&InstanceFilter::default())
            .unwrap_or_default()
            .into_iter()
            .filter(|i| i.status == Status::Active || i.status == Status::Idle);

        let mut results = Vec::new();
        for instance in instances {
            let action = self.check_instance(&instance).await;
            results.push((instance.instance_id.clone(), action));
        }
        results
    }

    async fn check_instance(&self, instance: &Instance) -> HealthAction {
        let liveness = self.probe(instance).await;
        if liveness == Liveness::Alive {
            self.mark_breaker_success(&instance.instance_id);
            return HealthAction::Healthy;
        }

        let mut instance = instance.clone();
        instance.status = Status::Crashed;
        instance.last_seen_at = self.clock.now_ms();
        let _ = self.registry.put_instance(instance.clone());

        let now = self.clock.now_ms();
        let mut breakers = self.breakers.lock();
        let breaker = breakers.entry(instance.instance_id.clone()).or_insert_with(Breaker::new);
        if !breaker.allow(now, &self.config) {
            return HealthAction::RejectedByBreaker;
        }
        drop(breakers);
        // The actual restart is performed by `Supervisor::restart`; this
        // component only decides whether the breaker permits the attempt.
        HealthAction::RestartTriggered
    }

    fn mark_breaker_success(&self, instance_id: &InstanceId) {
        let now = self.clock.now_ms();
        let mut breakers = self.breakers.lock();
        let breaker = breakers.entry(instance_id.clone()).or_insert_with(Breaker::new);
        breaker.record_success(&self.config);
        let _ = now;
    }

    /// Records the outcome of a restart attempt the breaker allowed,
    /// advancing its state machine (§4.11).
    pub fn record_restart_outcome(&self, instance_id: &InstanceId, succeeded: bool) {
        let now = self.clock.now_ms();
        let mut breakers = self.breakers.lock();
        let breaker = breakers.entry(instance_id.clone()).or_insert_with(Breaker::new);
        if succeeded {
            breaker.record_success(&self.config);
        } else {
            breaker.record_failure(now, &self.config);
        }
    }
}

#[cfg(test)]
#[path = "health_tests.rs"]
mod tests;
