// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Odd Jobs Daemon library: the wire protocol and RPC dispatch surface,
//! exposed so `oj`/`oj-bridge` can encode requests without linking the
//! daemon's own `main`.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod env;
pub mod lifecycle;
pub mod protocol;
pub mod rpc;

pub use lifecycle::{Config, Daemon, LifecycleError};
pub use protocol::{
    decode, encode, read_message, read_request, write_message, write_response, ProtocolError,
    Request, Response, DEFAULT_TIMEOUT, MAX_MESSAGE_SIZE, PROTOCOL_VERSION,
};
pub use rpc::RpcCtx;
