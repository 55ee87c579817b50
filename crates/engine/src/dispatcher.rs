// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Parallel Dispatcher (§4.9): a priority job queue plus distribution
//! strategies that spread tasks across managers. Queueing and distribution
//! are kept as pure, registry-free functions — `PriorityQueue` and
//! `distribute` — so they're unit-testable without a live supervisor,
//! mirroring `workspace.rs`'s split between pure logic and I/O glue.
//! `ParallelDispatcher` is the thin glue layer that persists the result
//! through the [`Registry`].

use crate::env;
use crate::error::EngineResult;
use oj_core::{Clock, InstanceId, Job, JobId, JobStatus, Priority};
use oj_storage::Registry;
use std::collections::VecDeque;
use std::sync::Arc;

/// A manager's advertised capacity and current active-job count (§4.9).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManagerLoad {
    pub manager_id: InstanceId,
    pub capacity: usize,
    pub active: usize,
}

/// One manager's share of a distribution (§4.9): `Σ|tasks| = |T|` across
/// the full set of assignments returned by [`distribute`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assignment {
    pub manager_id: InstanceId,
    pub job_ids: Vec<JobId>,
}

/// Distribution strategy over a set of managers (§4.9).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    RoundRobin,
    LeastLoaded,
    CapacityAware,
}

/// A strict priority-then-submission-time queue backed by four `VecDeque`s
/// — one per priority — rather than a binary heap, which keeps the dequeue
/// order auditable by inspection (§4.9).
#[derive(Debug, Default)]
pub struct PriorityQueue {
    critical: VecDeque<Job>,
    high: VecDeque<Job>,
    medium: VecDeque<Job>,
    low: VecDeque<Job>,
}

impl PriorityQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, job: Job) {
        self.bucket_mut(job.priority).push_back(job);
    }

    /// Pops the highest-priority, earliest-submitted job, if any.
    pub fn pop(&mut self) -> Option<Job> {
        for priority in [Priority::Critical, Priority::High, Priority::Medium, Priority::Low] {
            if let Some(job) = self.bucket_mut(priority).pop_front() {
                return Some(job);
            }
        }
        None
    }

    pub fn len(&self) -> usize {
        self.critical.len() + self.high.len() + self.medium.len() + self.low.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn bucket_mut(&mut self, priority: Priority) -> &mut VecDeque<Job> {
        match priority {
            Priority::Critical => &mut self.critical,
            Priority::High => &mut self.high,
            Priority::Medium => &mut self.medium,
            Priority::Low => &mut self.low,
        }
    }
}

/// Spreads `tasks` across `managers` per `strategy` (§4.9). Returns one
/// [`Assignment`] per manager that received at least one task;
/// `Σ|job_ids| = tasks.len()` across the returned assignments. Managers at
/// zero remaining capacity are skipped entirely.
pub fn distribute(strategy: Strategy, tasks: &[Job], managers: &[ManagerLoad]) -> Vec<Assignment> {
    match strategy {
        Strategy::RoundRobin => round_robin(tasks, managers),
        Strategy::LeastLoaded => least_loaded(tasks, managers),
        Strategy::CapacityAware => capacity_aware(tasks, managers),
    }
}

fn remaining_capacity(m: &ManagerLoad) -> usize {
    m.capacity.saturating_sub(m.active)
}

fn round_robin(tasks: &[Job], managers: &[ManagerLoad]) -> Vec<Assignment> {
    let mut buckets: Vec<Vec<JobId>> = vec![Vec::new(); managers.len()];
    let mut remaining: Vec<usize> = managers.iter().map(remaining_capacity).collect();
    let mut cursor = 0usize;
    for task in tasks {
        let Some(idx) = next_available(&remaining, &mut cursor) else { break };
        buckets[idx].push(task.job_id.clone());
        remaining[idx] -= 1;
    }
    assemble(managers, buckets)
}

/// Advances `cursor` round-robin style to the next manager with spare
/// capacity, wrapping at most once around the full set.
fn next_available(remaining: &[usize], cursor: &mut usize) -> Option<usize> {
    if remaining.is_empty() {
        return None;
    }
    for _ in 0..remaining.len() {
        let idx = *cursor % remaining.len();
        *cursor += 1;
        if remaining[idx] > 0 {
            return Some(idx);
        }
    }
    None
}

fn least_loaded(tasks: &[Job], managers: &[ManagerLoad]) -> Vec<Assignment> {
    let mut buckets: Vec<Vec<JobId>> = vec![Vec::new(); managers.len()];
    let mut active: Vec<usize> = managers.iter().map(|m| m.active).collect();
    let mut remaining: Vec<usize> = managers.iter().map(remaining_capacity).collect();
    for task in tasks {
        let Some(idx) = active
            .iter()
            .enumerate()
            .filter(|(i, _)| remaining[*i] > 0)
            .min_by_key(|(_, a)| **a)
            .map(|(i, _)| i)
        else {
            break;
        };
        buckets[idx].push(task.job_id.clone());
        active[idx] += 1;
        remaining[idx] -= 1;
    }
    assemble(managers, buckets)
}

fn capacity_aware(tasks: &[Job], managers: &[ManagerLoad]) -> Vec<Assignment> {
    let mut buckets: Vec<Vec<JobId>> = vec![Vec::new(); managers.len()];
    let mut remaining: Vec<usize> = managers.iter().map(remaining_capacity).collect();
    for task in tasks {
        let Some(idx) = remaining
            .iter()
            .enumerate()
            .filter(|(_, r)| **r > 0)
            .max_by_key(|(_, r)| **r)
            .map(|(i, _)| i)
        else {
            break;
        };
        buckets[idx].push(task.job_id.clone());
        remaining[idx] -= 1;
    }
    assemble(managers, buckets)
}

fn assemble(managers: &[ManagerLoad], buckets: Vec<Vec<JobId>>) -> Vec<Assignment> {
    managers
        .iter()
        .zip(buckets)
        .filter(|(_, job_ids)| !job_ids.is_empty())
        .map(|(m, job_ids)| Assignment { manager_id: m.manager_id.clone(), job_ids })
        .collect()
}

/// Aggregate counts for the `get_parallel_status` verb (§6).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ParallelStatus {
    pub pending: usize,
    pub active: usize,
    pub completed: usize,
    pub failed: usize,
}

/// Exponential backoff cap applied to job retries (§4.9), matching the
/// scheduled-broadcast and VCC components' own backoff ceilings.
const RETRY_BACKOFF_CAP_S: u64 = 3600;

/// Persists dispatch decisions against the [`Registry`], honoring the
/// global max concurrent spawn count and the per-manager specialist cap
/// (§4.9 defaults: 5 and 4).
pub struct ParallelDispatcher<R: Registry + 'static, C: Clock> {
    registry: Arc<R>,
    clock: C,
    max_concurrent_spawns: usize,
    max_specialists_per_manager: usize,
}

impl<R: Registry + 'static, C: Clock> ParallelDispatcher<R, C> {
    pub fn new(registry: Arc<R>, clock: C) -> Self {
        Self {
            registry,
            clock,
            max_concurrent_spawns: env::max_concurrent_spawns(),
            max_specialists_per_manager: env::max_specialists_per_manager(),
        }
    }

    pub fn with_limits(mut self, max_concurrent_spawns: usize, max_specialists_per_manager: usize) -> Self {
        self.max_concurrent_spawns = max_concurrent_spawns;
        self.max_specialists_per_manager = max_specialists_per_manager;
        self
    }

    /// Enqueues a unit of work (§4.9). Returns the assigned [`JobId`].
    pub fn submit(&self, job: Job) -> EngineResult<JobId> {
        let job_id = job.job_id.clone();
        self.registry.put_job(job)?;
        Ok(job_id)
    }

    /// `distribute_work` (§6): plans an assignment without dispatching it.
    /// Caps each manager's share at `max_specialists_per_manager` on top of
    /// its own advertised capacity, and the combined total at
    /// `max_concurrent_spawns`.
    pub fn distribute_work(&self, tasks: &[Job], managers: &[ManagerLoad], strategy: Strategy) -> Vec<Assignment> {
        let capped: Vec<ManagerLoad> = managers
            .iter()
            .map(|m| ManagerLoad {
                manager_id: m.manager_id.clone(),
                capacity: m.capacity.min(self.max_specialists_per_manager),
                active: m.active,
            })
            .collect();
        let in_flight_budget = self.max_concurrent_spawns.saturating_sub(total_active(&capped));
        let bounded_tasks = &tasks[..tasks.len().min(in_flight_budget)];
        distribute(strategy, bounded_tasks, &capped)
    }

    /// `execute_parallel` (§6): plans via [`distribute_work`] and persists
    /// each assignment by marking the corresponding job active against its
    /// manager.
    pub fn execute_parallel(
        &self,
        tasks: &[Job],
        managers: &[ManagerLoad],
        strategy: Strategy,
    ) -> EngineResult<Vec<Assignment>> {
        let plan = self.distribute_work(tasks, managers, strategy);
        for assignment in &plan {
            for job_id in &assignment.job_ids {
                self.registry.mark_active(job_id, assignment.manager_id.clone())?;
            }
        }
        Ok(plan)
    }

    /// Pulls the next ready job off the registry's own priority queue and
    /// marks it active against `manager_id` (§4.2's `dequeue_job` already
    /// implements the priority-then-submission-time order this component
    /// specifies; this just binds a manager to the result).
    pub fn dequeue_and_assign(&self, manager_id: &InstanceId) -> EngineResult<Option<JobId>> {
        let now = self.clock.now_ms();
        let Some(job) = self.registry.dequeue_job(now)? else { return Ok(None) };
        self.registry.mark_active(&job.job_id, manager_id.clone())?;
        Ok(Some(job.job_id))
    }

    /// Records a job failure with exponential backoff, or permanent
    /// failure at `max_attempts` (§4.9, §8.1 #8).
    pub fn record_failure(&self, job_id: &JobId) -> EngineResult<()> {
        let now = self.clock.now_ms();
        self.registry.mark_failed(job_id, now, RETRY_BACKOFF_CAP_S)?;
        Ok(())
    }

    pub fn record_success(&self, job_id: &JobId) -> EngineResult<()> {
        self.registry.mark_completed(job_id)?;
        Ok(())
    }

    /// `get_parallel_status` (§6).
    pub fn get_parallel_status(&self) -> EngineResult<ParallelStatus> {
        let jobs = self.registry.list_jobs(None)?;
        let mut status = ParallelStatus::default();
        for job in jobs {
            match job.status {
                JobStatus::Pending => status.pending += 1,
                JobStatus::Active => status.active += 1,
                JobStatus::Completed => status.completed += 1,
                JobStatus::Failed => status.failed += 1,
            }
        }
        Ok(status)
    }
}

fn total_active(managers: &[ManagerLoad]) -> usize {
    managers.iter().map(|m| m.active).sum()
}

#[cfg(test)]
#[path = "dispatcher_tests.rs"]
mod tests;
