// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Unix-socket listener for the admin protocol.
//!
//! Connections are handled sequentially against the single master
//! state; the mutex is the event loop's serialization point, so every
//! request observes a consistent plan.

use crate::runtime::Master;
use gp_core::Clock;
use gp_domain::PlanChannel;
use gp_wire::{read_message, write_message, ProtocolError, Request, Response};
use std::path::Path;
use std::sync::Arc;
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

/// Bind the admin socket, removing a stale file from a previous run.
pub fn bind(path: &Path) -> std::io::Result<UnixListener> {
    if path.exists() {
        std::fs::remove_file(path)?;
    }
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    UnixListener::bind(path)
}

/// Accept and serve admin connections until shutdown.
pub async fn serve<C: Clock + 'static>(
    listener: UnixListener,
    master: Arc<Mutex<Master<C>>>,
    channel: Arc<dyn PlanChannel>,
    shutdown: CancellationToken,
) {
    loop {
        tokio::select! {
            _ = shutdown.cancelled() => {
                tracing::info!("listener shutting down");
                return;
            }
            accepted = listener.accept() => {
                match accepted {
                    Ok((stream, _)) => {
                        let master = Arc::clone(&master);
                        let channel = Arc::clone(&channel);
                        let shutdown = shutdown.clone();
                        tokio::spawn(async move {
                            if let Err(e) = serve_connection(stream, master, channel, shutdown).await {
                                tracing::debug!(error = %e, "connection ended");
                            }
                        });
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "accept failed");
                    }
                }
            }
        }
    }
}

async fn serve_connection<C: Clock + 'static>(
    mut stream: UnixStream,
    master: Arc<Mutex<Master<C>>>,
    channel: Arc<dyn PlanChannel>,
    shutdown: CancellationToken,
) -> Result<(), ProtocolError> {
    loop {
        let request: Request = match read_message(&mut stream).await {
            Ok(request) => request,
            Err(ProtocolError::Closed) => return Ok(()),
            Err(e) => return Err(e),
        };
        let is_shutdown = matches!(request, Request::Shutdown);

        let response: Response = {
            let mut master = master.lock().await;
            master.handle_request(request, channel.as_ref()).await
        };
        write_message(&mut stream, &response).await?;

        if is_shutdown {
            tracing::info!("shutdown requested over admin socket");
            shutdown.cancel();
            return Ok(());
        }
    }
}

#[cfg(test)]
#[path = "listener_tests.rs"]
mod tests;
