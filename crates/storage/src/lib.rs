// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Instance Registry (§4.2): two pluggable backends behind one `Registry`
//! trait — a single-process file backend and a distributed key/value
//! backend with compare-and-set locks.

mod file_backend;
mod kv;
mod kv_backend;
mod registry;

pub use file_backend::FileBackend;
pub use kv::{DistributedKv, InMemoryKv};
pub use kv_backend::DistributedBackend;
pub use registry::{InstanceFilter, Registry, StorageError, StorageResult};
