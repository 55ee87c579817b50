// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Minimal distributed key/value primitive the distributed registry backend
//! is built on. A real deployment points this at whatever KV store the
//! operator runs (etcd, Redis, FoundationDB, ...); `InMemoryKv` is the
//! in-process reference implementation used for tests and for the
//! zero-dependency "distributed mode on one box" deployment.

use parking_lot::Mutex;
use std::collections::HashMap;

/// A namespaced key/value store with atomic compare-and-set, sufficient to
/// build linearizable locks on top of (§4.2).
pub trait DistributedKv: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn put(&self, key: &str, value: String);
    fn delete(&self, key: &str);
    /// Atomically sets `key` to `new` iff its current value equals `expected`
    /// (`None` means "key must not exist"). Returns whether the swap happened.
    fn compare_and_swap(&self, key: &str, expected: Option<&str>, new: String) -> bool;
    fn scan_prefix(&self, prefix: &str) -> Vec<(String, String)>;
}

#[derive(Default)]
pub struct InMemoryKv {
    data: Mutex<HashMap<String, String>>,
}

impl InMemoryKv {
    pub fn new() -> Self {
        Self::default()
    }
}

impl DistributedKv for InMemoryKv {
    fn get(&self, key: &str) -> Option<String> {
        self.data.lock().get(key).cloned()
    }

    fn put(&self, key: &str, value: String) {
        self.data.lock().insert(key.to_string(), value);
    }

    fn delete(&self, key: &str) {
        self.data.lock().remove(key);
    }

    fn compare_and_swap(&self, key: &str, expected: Option<&str>, new: String) -> bool {
        let mut data = self.data.lock();
        let current = data.get(key).map(|s| s.as_str());
        if current != expected {
            return false;
        }
        data.insert(key.to_string(), new);
        true
    }

    fn scan_prefix(&self, prefix: &str) -> Vec<(String, String)> {
        self.data
            .lock()
            .iter()
            .filter(|(k, _)| k.starts_with(prefix))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }
}

#[cfg(test)]
#[path = "kv_tests.rs"]
mod tests;
