// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The `Registry` contract (§4.2) implemented by both backends.

use oj_core::{Instance, InstanceId, Job, JobId, JobStatus, Role};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("instance not found: {0}")]
    InstanceNotFound(String),
    #[error("job not found: {0}")]
    JobNotFound(String),
    #[error("backend unavailable: {0}")]
    BackendUnavailable(String),
}

pub type StorageResult<T> = Result<T, StorageError>;

/// Filter applied by `list_instances`. `None` on a field means "don't filter
/// on this field".
#[derive(Debug, Clone, Default)]
pub struct InstanceFilter {
    pub role: Option<Role>,
    pub parent_id: Option<InstanceId>,
}

impl InstanceFilter {
    pub fn matches(&self, instance: &Instance) -> bool {
        if let Some(role) = self.role {
            if instance.role != role {
                return false;
            }
        }
        if let Some(parent) = &self.parent_id {
            if instance.parent_id.as_ref() != Some(parent) {
                return false;
            }
        }
        true
    }
}

/// The Instance Registry exclusively owns `Instance` and `Job` records
/// (§3.2); every other component borrows and mutates them through here.
pub trait Registry: Send + Sync {
    fn put_instance(&self, instance: Instance) -> StorageResult<()>;
    fn get_instance(&self, id: &InstanceId) -> StorageResult<Option<Instance>>;
    fn delete_instance(&self, id: &InstanceId) -> StorageResult<()>;
    fn list_instances(&self, filter: &InstanceFilter) -> StorageResult<Vec<Instance>>;

    fn put_job(&self, job: Job) -> StorageResult<()>;
    /// Pops the highest-priority, earliest-submitted ready job, if any.
    fn dequeue_job(&self, now_ms: u64) -> StorageResult<Option<Job>>;
    fn mark_active(&self, job_id: &JobId, assigned_to: InstanceId) -> StorageResult<()>;
    fn mark_completed(&self, job_id: &JobId) -> StorageResult<()>;
    fn mark_failed(&self, job_id: &JobId, now_ms: u64, backoff_cap_s: u64) -> StorageResult<()>;
    fn get_job(&self, job_id: &JobId) -> StorageResult<Option<Job>>;
    fn list_jobs(&self, status: Option<JobStatus>) -> StorageResult<Vec<Job>>;

    /// Single acquirer wins; others receive `None` (§4.2 invariant: lock
    /// acquisition is linearizable per resource).
    fn acquire_lock(&self, resource: &str, ttl_ms: u64, now_ms: u64) -> StorageResult<Option<String>>;
    /// Releasing with a stale token is a no-op.
    fn release_lock(&self, resource: &str, token: &str) -> StorageResult<()>;

    fn record_metric(&self, name: &str, value: f64) -> StorageResult<()>;
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
