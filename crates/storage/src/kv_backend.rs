// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Distributed key/value registry backend (§4.2). Keys are namespaced
//! (`registry:instance:<id>`, `registry:job:<id>`, `registry:lock:<resource>`,
//! `registry:metric:<name>`); locks use the underlying store's
//! compare-and-set for linearizable acquisition.

use crate::kv::DistributedKv;
use crate::registry::{InstanceFilter, Registry, StorageError, StorageResult};
use oj_core::{Instance, InstanceId, Job, JobId, JobStatus, Lock};
use std::sync::Arc;

fn instance_key(id: &str) -> String {
    format!("registry:instance:{id}")
}
fn job_key(id: &str) -> String {
    format!("registry:job:{id}")
}
fn lock_key(resource: &str) -> String {
    format!("registry:lock:{resource}")
}
fn metric_key(name: &str) -> String {
    format!("registry:metric:{name}")
}

pub struct DistributedBackend {
    kv: Arc<dyn DistributedKv>,
}

impl DistributedBackend {
    pub fn new(kv: Arc<dyn DistributedKv>) -> Self {
        Self { kv }
    }

    fn read_instance(&self, id: &str) -> StorageResult<Option<Instance>> {
        match self.kv.get(&instance_key(id)) {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    fn read_job(&self, id: &str) -> StorageResult<Option<Job>> {
        match self.kv.get(&job_key(id)) {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    fn write_job(&self, job: &Job) -> StorageResult<()> {
        self.kv.put(&job_key(job.job_id.as_str()), serde_json::to_string(job)?);
        Ok(())
    }
}

impl Registry for DistributedBackend {
    fn put_instance(&self, instance: Instance) -> StorageResult<()> {
        let key = instance_key(instance.instance_id.as_str());
        self.kv.put(&key, serde_json::to_string(&instance)?);
        Ok(())
    }

    fn get_instance(&self, id: &InstanceId) -> StorageResult<Option<Instance>> {
        self.read_instance(id.as_str())
    }

    fn delete_instance(&self, id: &InstanceId) -> StorageResult<()> {
        self.kv.delete(&instance_key(id.as_str()));
        Ok(())
    }

    fn list_instances(&self, filter: &InstanceFilter) -> StorageResult<Vec<Instance>> {
        let mut out = Vec::new();
        for (_, raw) in self.kv.scan_prefix("registry:instance:") {
            let inst: Instance = serde_json::from_str(&raw)?;
            if filter.matches(&inst) {
                out.push(inst);
            }
        }
        Ok(out)
    }

    fn put_job(&self, job: Job) -> StorageResult<()> {
        self.write_job(&job)
    }

    fn dequeue_job(&self, now_ms: u64) -> StorageResult<Option<Job>> {
        let mut best: Option<Job> = None;
        for (_, raw) in self.kv.scan_prefix("registry:job:") {
            let job: Job = serde_json::from_str(&raw)?;
            if !job.is_ready_at(now_ms) {
                continue;
            }
            best = match best {
                None => Some(job),
                Some(current) if job.priority > current.priority => Some(job),
                Some(current) => Some(current),
            };
        }
        Ok(best)
    }

    fn mark_active(&self, job_id: &JobId, assigned_to: InstanceId) -> StorageResult<()> {
        let mut job = self
            .read_job(job_id.as_str())?
            .ok_or_else(|| StorageError::JobNotFound(job_id.to_string()))?;
        job.assign(assigned_to);
        self.write_job(&job)
    }

    fn mark_completed(&self, job_id: &JobId) -> StorageResult<()> {
        let mut job = self
            .read_job(job_id.as_str())?
            .ok_or_else(|| StorageError::JobNotFound(job_id.to_string()))?;
        job.record_success();
        self.write_job(&job)
    }

    fn mark_failed(&self, job_id: &JobId, now_ms: u64, backoff_cap_s: u64) -> StorageResult<()> {
        let mut job = self
            .read_job(job_id.as_str())?
            .ok_or_else(|| StorageError::JobNotFound(job_id.to_string()))?;
        job.record_failure(now_ms, backoff_cap_s);
        self.write_job(&job)
    }

    fn get_job(&self, job_id: &JobId) -> StorageResult<Option<Job>> {
        self.read_job(job_id.as_str())
    }

    fn list_jobs(&self, status: Option<JobStatus>) -> StorageResult<Vec<Job>> {
        let mut out = Vec::new();
        for (_, raw) in self.kv.scan_prefix("registry:job:") {
            let job: Job = serde_json::from_str(&raw)?;
            if status.map_or(true, |s| job.status == s) {
                out.push(job);
            }
        }
        Ok(out)
    }

    fn acquire_lock(&self, resource: &str, ttl_ms: u64, now_ms: u64) -> StorageResult<Option<String>> {
        let key = lock_key(resource);
        let token = uuid::Uuid::new_v4().to_string();
        let new_value = serde_json::to_string(&Lock::new(resource, token.clone(), now_ms + ttl_ms))?;

        match self.kv.get(&key) {
            None => {
                if self.kv.compare_and_swap(&key, None, new_value) {
                    Ok(Some(token))
                } else {
                    Ok(None)
                }
            }
            Some(raw) => {
                let existing: Lock = serde_json::from_str(&raw)?;
                if existing.is_expired(now_ms) && self.kv.compare_and_swap(&key, Some(&raw), new_value) {
                    Ok(Some(token))
                } else {
                    Ok(None)
                }
            }
        }
    }

    fn release_lock(&self, resource: &str, token: &str) -> StorageResult<()> {
        let key = lock_key(resource);
        if let Some(raw) = self.kv.get(&key) {
            let existing: Lock = serde_json::from_str(&raw)?;
            if existing.holder_token == token {
                self.kv.delete(&key);
            }
        }
        Ok(())
    }

    fn record_metric(&self, name: &str, value: f64) -> StorageResult<()> {
        self.kv.put(&metric_key(name), value.to_string());
        Ok(())
    }
}

#[cfg(test)]
#[path = "kv_backend_tests.rs"]
mod tests;
