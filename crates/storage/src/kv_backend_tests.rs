// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::kv::InMemoryKv;
use oj_core::test_support::test_instance;
use oj_core::{Priority, Role, SequentialIdGen};

fn backend() -> DistributedBackend {
    DistributedBackend::new(Arc::new(InMemoryKv::new()))
}

#[test]
fn put_and_get_instance_round_trips() {
    let backend = backend();
    let inst = test_instance("exec_1", Role::Executive, None);
    backend.put_instance(inst.clone()).unwrap();
    assert_eq!(backend.get_instance(&InstanceId::new("exec_1")).unwrap(), Some(inst));
}

#[test]
fn list_instances_scans_namespaced_keys_only() {
    let backend = backend();
    backend.put_instance(test_instance("exec_1", Role::Executive, None)).unwrap();
    backend.put_job(Job::new(&SequentialIdGen::new("job"), Priority::Low, serde_json::json!({}))).unwrap();
    let instances = backend.list_instances(&InstanceFilter::default()).unwrap();
    assert_eq!(instances.len(), 1);
}

#[test]
fn dequeue_job_picks_highest_priority_across_scan() {
    let backend = backend();
    let ids = SequentialIdGen::new("job");
    backend.put_job(Job::new(&ids, Priority::Low, serde_json::json!({}))).unwrap();
    let critical = Job::new(&ids, Priority::Critical, serde_json::json!({}));
    backend.put_job(critical.clone()).unwrap();

    let dequeued = backend.dequeue_job(0).unwrap().unwrap();
    assert_eq!(dequeued.job_id, critical.job_id);
}

#[test]
fn acquire_lock_is_exclusive_until_expiry_or_release() {
    let backend = backend();
    let token = backend.acquire_lock("workspace:/tmp/x", 1_000, 0).unwrap().unwrap();
    assert!(backend.acquire_lock("workspace:/tmp/x", 1_000, 500).unwrap().is_none());
    backend.release_lock("workspace:/tmp/x", &token).unwrap();
    assert!(backend.acquire_lock("workspace:/tmp/x", 1_000, 600).unwrap().is_some());
}

#[test]
fn acquire_lock_succeeds_after_ttl_expires() {
    let backend = backend();
    backend.acquire_lock("resource", 100, 0).unwrap();
    assert!(backend.acquire_lock("resource", 100, 99).unwrap().is_none());
    assert!(backend.acquire_lock("resource", 100, 100).unwrap().is_some());
}

#[test]
fn mark_failed_on_unknown_job_errors() {
    let backend = backend();
    let result = backend.mark_failed(&oj_core::JobId::new("ghost"), 0, 60);
    assert!(matches!(result, Err(StorageError::JobNotFound(_))));
}
