// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Socket accept loop: one task per connection, each round-tripping a
//! [`Request`]/[`Response`] pair through [`RpcCtx::dispatch`] for the `Rpc`
//! variant and answering the rest directly.

use crate::lifecycle::Daemon;
use crate::protocol::{read_request, write_response, Request, Response, DEFAULT_TIMEOUT, PROTOCOL_VERSION};
use oj_storage::Registry;
use std::sync::Arc;
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::Notify;
use tracing::{debug, warn};

/// Accepts connections on `listener` until `shutdown` is notified, handing
/// each off to its own task.
pub async fn run(listener: UnixListener, daemon: Arc<Daemon>, shutdown: Arc<Notify>) {
    loop {
        tokio::select! {
            accepted = listener.accept() => {
                match accepted {
                    Ok((stream, _addr)) => {
                        let daemon = daemon.clone();
                        let shutdown = shutdown.clone();
                        tokio::spawn(async move {
                            if let Err(e) = handle_connection(stream, daemon, shutdown).await {
                                debug!(error = %e, "connection closed");
                            }
                        });
                    }
                    Err(e) => warn!(error = %e, "failed to accept connection"),
                }
            }
            _ = shutdown.notified() => {
                debug!("listener stopping");
                return;
            }
        }
    }
}

async fn handle_connection(
    mut stream: UnixStream,
    daemon: Arc<Daemon>,
    shutdown: Arc<Notify>,
) -> Result<(), crate::protocol::ProtocolError> {
    loop {
        let request = read_request(&mut stream, DEFAULT_TIMEOUT).await?;
        let response = match request {
            Request::Ping => Response::Pong,
            Request::Hello { .. } => Response::Hello { version: PROTOCOL_VERSION.to_string() },
            Request::Shutdown { kill } => {
                if kill {
                    kill_all_instances(&daemon).await;
                }
                shutdown.notify_waiters();
                write_response(&mut stream, &Response::ShuttingDown, DEFAULT_TIMEOUT).await?;
                return Ok(());
            }
            Request::Status => {
                let instances = daemon.ctx.registry.list_instances(&Default::default()).unwrap_or_default();
                Response::Status {
                    version: PROTOCOL_VERSION.to_string(),
                    uptime_secs: daemon.start_time.elapsed().as_secs(),
                    instance_count: instances.len(),
                }
            }
            Request::Rpc { verb, args, caller } => {
                let body = daemon.ctx.dispatch(&verb, args, caller).await;
                Response::Rpc { body }
            }
        };
        write_response(&mut stream, &response, DEFAULT_TIMEOUT).await?;
    }
}

async fn kill_all_instances(daemon: &Daemon) {
    let Ok(instances) = daemon.ctx.registry.list_instances(&Default::default()) else { return };
    for instance in instances.into_iter().filter(|i| i.parent_id.is_none()) {
        let _ = daemon.ctx.supervisor.terminate(&instance.instance_id).await;
    }
}
