// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! gpd: the gridplan master daemon.

use gp_core::SystemClock;
use gp_master::{listener, Master, MasterConfig, SocketChannel};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

fn usage() -> ! {
    eprintln!("usage: gpd <config.toml>");
    std::process::exit(2);
}

#[tokio::main]
async fn main() {
    let Some(config_path) = std::env::args().nth(1).map(PathBuf::from) else { usage() };

    let config = match MasterConfig::load(&config_path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("gpd: cannot load {}: {e}", config_path.display());
            std::process::exit(1);
        }
    };

    let state_dir = config.state_dir();
    if let Err(e) = std::fs::create_dir_all(state_dir.join("logs")) {
        eprintln!("gpd: cannot create state dir {}: {e}", state_dir.display());
        std::process::exit(1);
    }
    let appender = tracing_appender::rolling::daily(state_dir.join("logs"), "gpd.log");
    let (writer, _guard) = tracing_appender::non_blocking(appender);
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(writer)
        .with_ansi(false)
        .init();

    let master = match Master::open(&config, SystemClock) {
        Ok(master) => master,
        Err(e) => {
            eprintln!("gpd: cannot open master state: {e}");
            std::process::exit(1);
        }
    };
    tracing::info!(name = %config.name, "master state opened");

    let sockets: HashMap<_, _> = config
        .workstations
        .iter()
        .filter_map(|w| w.socket.clone().map(|s| (w.name.clone(), s)))
        .collect();
    let channel = Arc::new(SocketChannel::new(sockets));

    let socket_path = config.socket_path();
    let listener_socket = match listener::bind(&socket_path) {
        Ok(socket) => socket,
        Err(e) => {
            eprintln!("gpd: cannot bind {}: {e}", socket_path.display());
            std::process::exit(1);
        }
    };
    tracing::info!(socket = %socket_path.display(), "admin socket bound");

    let shutdown = CancellationToken::new();
    let serve = listener::serve(
        listener_socket,
        Arc::new(Mutex::new(master)),
        channel,
        shutdown.clone(),
    );

    tokio::select! {
        _ = serve => {}
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("interrupt received, shutting down");
            shutdown.cancel();
        }
    }

    let _ = std::fs::remove_file(&socket_path);
}
