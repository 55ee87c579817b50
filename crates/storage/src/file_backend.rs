// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Single-process registry backend: one JSON document, one mutex.
//!
//! Grounded on the teacher's checkpoint writer (`write_tmp` → `fsync` →
//! `rename`), simplified to a synchronous write-through since this backend
//! targets single-process deployments (§4.2) rather than the teacher's
//! background-thread WAL checkpointer.

use crate::registry::{InstanceFilter, Registry, StorageError, StorageResult};
use oj_core::{Instance, InstanceId, Job, JobId, JobStatus, Lock};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

#[derive(Debug, Default, Serialize, Deserialize)]
struct Document {
    #[serde(default)]
    instances: HashMap<String, Instance>,
    #[serde(default)]
    jobs: HashMap<String, Job>,
    /// Submission order, keyed by job id — `Job` itself carries no
    /// timestamp (§3.1), but dequeue order must break priority ties by
    /// submission time, so the backend tracks it out of band.
    #[serde(default)]
    job_seq: HashMap<String, u64>,
    #[serde(default)]
    next_seq: u64,
    #[serde(default)]
    locks: HashMap<String, Lock>,
    #[serde(default)]
    metrics: HashMap<String, f64>,
}

pub struct FileBackend {
    path: PathBuf,
    doc: Mutex<Document>,
}

impl FileBackend {
    pub fn open(path: impl Into<PathBuf>) -> StorageResult<Self> {
        let path = path.into();
        let doc = if path.exists() {
            let raw = fs::read_to_string(&path)?;
            if raw.trim().is_empty() {
                Document::default()
            } else {
                serde_json::from_str(&raw)?
            }
        } else {
            Document::default()
        };
        Ok(Self {
            path,
            doc: Mutex::new(doc),
        })
    }

    fn persist(&self, doc: &Document) -> StorageResult<()> {
        atomic_write_json(&self.path, doc)
    }
}

fn atomic_write_json<T: Serialize>(path: &Path, value: &T) -> StorageResult<()> {
    let bytes = serde_json::to_vec_pretty(value)?;
    let tmp_path = path.with_extension("tmp");
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    {
        let mut tmp = File::create(&tmp_path)?;
        tmp.write_all(&bytes)?;
        tmp.sync_all()?;
    }
    fs::rename(&tmp_path, path)?;
    Ok(())
}

impl Registry for FileBackend {
    fn put_instance(&self, instance: Instance) -> StorageResult<()> {
        let mut doc = self.doc.lock();
        doc.instances.insert(instance.instance_id.as_str().to_string(), instance);
        self.persist(&doc)
    }

    fn get_instance(&self, id: &InstanceId) -> StorageResult<Option<Instance>> {
        Ok(self.doc.lock().instances.get(id.as_str()).cloned())
    }

    fn delete_instance(&self, id: &InstanceId) -> StorageResult<()> {
        let mut doc = self.doc.lock();
        doc.instances.remove(id.as_str());
        self.persist(&doc)
    }

    fn list_instances(&self, filter: &InstanceFilter) -> StorageResult<Vec<Instance>> {
        Ok(self
            .doc
            .lock()
            .instances
            .values()
            .filter(|i| filter.matches(i))
            .cloned()
            .collect())
    }

    fn put_job(&self, job: Job) -> StorageResult<()> {
        let mut doc = self.doc.lock();
        let key = job.job_id.as_str().to_string();
        if !doc.job_seq.contains_key(&key) {
            let seq = doc.next_seq;
            doc.next_seq += 1;
            doc.job_seq.insert(key.clone(), seq);
        }
        doc.jobs.insert(key, job);
        self.persist(&doc)
    }

    fn dequeue_job(&self, now_ms: u64) -> StorageResult<Option<Job>> {
        let doc = self.doc.lock();
        let ready_id = doc
            .jobs
            .values()
            .filter(|j| j.is_ready_at(now_ms))
            .max_by_key(|j| {
                let seq = doc.job_seq.get(j.job_id.as_str()).copied().unwrap_or(0);
                (j.priority, std::cmp::Reverse(seq))
            })
            .map(|j| j.job_id.as_str().to_string());
        Ok(ready_id.and_then(|id| doc.jobs.get(&id).cloned()))
    }

    fn mark_active(&self, job_id: &JobId, assigned_to: InstanceId) -> StorageResult<()> {
        let mut doc = self.doc.lock();
        let job = doc
            .jobs
            .get_mut(job_id.as_str())
            .ok_or_else(|| StorageError::JobNotFound(job_id.to_string()))?;
        job.assign(assigned_to);
        self.persist(&doc)
    }

    fn mark_completed(&self, job_id: &JobId) -> StorageResult<()> {
        let mut doc = self.doc.lock();
        let job = doc
            .jobs
            .get_mut(job_id.as_str())
            .ok_or_else(|| StorageError::JobNotFound(job_id.to_string()))?;
        job.record_success();
        self.persist(&doc)
    }

    fn mark_failed(&self, job_id: &JobId, now_ms: u64, backoff_cap_s: u64) -> StorageResult<()> {
        let mut doc = self.doc.lock();
        let job = doc
            .jobs
            .get_mut(job_id.as_str())
            .ok_or_else(|| StorageError::JobNotFound(job_id.to_string()))?;
        job.record_failure(now_ms, backoff_cap_s);
        self.persist(&doc)
    }

    fn get_job(&self, job_id: &JobId) -> StorageResult<Option<Job>> {
        Ok(self.doc.lock().jobs.get(job_id.as_str()).cloned())
    }

    fn list_jobs(&self, status: Option<JobStatus>) -> StorageResult<Vec<Job>> {
        Ok(self
            .doc
            .lock()
            .jobs
            .values()
            .filter(|j| status.map_or(true, |s| j.status == s))
            .cloned()
            .collect())
    }

    fn acquire_lock(&self, resource: &str, ttl_ms: u64, now_ms: u64) -> StorageResult<Option<String>> {
        let mut doc = self.doc.lock();
        if let Some(existing) = doc.locks.get(resource) {
            if !existing.is_expired(now_ms) {
                return Ok(None);
            }
        }
        let token = uuid::Uuid::new_v4().to_string();
        doc.locks.insert(
            resource.to_string(),
            Lock::new(resource, token.clone(), now_ms + ttl_ms),
        );
        self.persist(&doc)?;
        Ok(Some(token))
    }

    fn release_lock(&self, resource: &str, token: &str) -> StorageResult<()> {
        let mut doc = self.doc.lock();
        if let Some(existing) = doc.locks.get(resource) {
            if existing.holder_token == token {
                doc.locks.remove(resource);
                return self.persist(&doc);
            }
        }
        Ok(())
    }

    fn record_metric(&self, name: &str, value: f64) -> StorageResult<()> {
        let mut doc = self.doc.lock();
        doc.metrics.insert(name.to_string(), value);
        self.persist(&doc)
    }
}

#[cfg(test)]
#[path = "file_backend_tests.rs"]
mod tests;
