// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Units of work dispatched to managers by the Parallel Dispatcher (§4.9).

use crate::id::IdGen;
use crate::instance::InstanceId;
use serde::{Deserialize, Serialize};
use std::fmt;

crate::define_id! {
    /// Unique identifier for a dispatched unit of work.
    pub struct JobId;
}

/// Dispatch priority. Ordered `Critical > High > Medium > Low`; dequeue
/// strictly follows priority then submission time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    Medium,
    High,
    Critical,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Critical => "critical",
            Priority::High => "high",
            Priority::Medium => "medium",
            Priority::Low => "low",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Lifecycle state of a dispatched job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Active,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Active => "active",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Default retry budget before a job is marked permanently `failed` (§3.1).
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// A unit of work dispatched to a manager instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub job_id: JobId,
    pub priority: Priority,
    pub payload: serde_json::Value,
    pub status: JobStatus,
    pub attempts: u32,
    pub max_attempts: u32,
    pub assigned_to: Option<InstanceId>,
    pub next_retry_at: Option<u64>,
}

impl Job {
    pub fn new(id_gen: &impl IdGen, priority: Priority, payload: serde_json::Value) -> Self {
        Self {
            job_id: JobId::new(id_gen.next()),
            priority,
            payload,
            status: JobStatus::Pending,
            attempts: 0,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            assigned_to: None,
            next_retry_at: None,
        }
    }

    /// A job at `active` must always carry a non-empty `assigned_to` (§3.1 invariant).
    pub fn assign(&mut self, manager: InstanceId) {
        self.status = JobStatus::Active;
        self.assigned_to = Some(manager);
    }

    /// Records a single failed attempt: increments `attempts`, schedules the
    /// next retry with exponential backoff (`2^attempts` seconds, capped), or
    /// marks the job permanently `failed` once `max_attempts` is reached.
    pub fn record_failure(&mut self, now_ms: u64, backoff_cap_s: u64) {
        self.attempts += 1;
        if self.attempts >= self.max_attempts {
            self.status = JobStatus::Failed;
            self.next_retry_at = None;
            return;
        }
        let backoff_s = 2u64.saturating_pow(self.attempts).min(backoff_cap_s);
        self.status = JobStatus::Pending;
        self.next_retry_at = Some(now_ms + backoff_s * 1_000);
    }

    pub fn record_success(&mut self) {
        self.status = JobStatus::Completed;
        self.next_retry_at = None;
    }

    pub fn is_ready_at(&self, now_ms: u64) -> bool {
        self.status == JobStatus::Pending && self.next_retry_at.map_or(true, |t| now_ms >= t)
    }
}

#[cfg(test)]
#[path = "job_tests.rs"]
mod tests;
