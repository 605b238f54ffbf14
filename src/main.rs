//! Server entrypoint: load one date of record files, wire the stores, hubs,
//! and streamers together, and serve the request API plus the push feed
//! until a shutdown signal lands.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Utc;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use bluefeed::api::routes::create_router;
use bluefeed::api::AppState;
use bluefeed::config::{Config, StoreMode};
use bluefeed::cursor::CursorStore;
use bluefeed::store::{MemoryStore, RecordStore, StreamStore};
use bluefeed::ws::groups::ALL_HUBS;
use bluefeed::ws::hub::Hub;
use bluefeed::ws::streamer::Streamer;

/// How long in-flight requests and connections get to drain after the
/// shutdown signal.
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(30);

#[tokio::main]
async fn main() {
    std::process::exit(run().await);
}

async fn run() -> i32 {
    init_tracing();

    let config = match Config::from_env() {
        Ok(config) => Arc::new(config),
        Err(e) => {
            error!("failed to load config: {e:#}");
            return 1;
        }
    };

    info!(
        port = config.port,
        data_root = %config.data_root.display(),
        data_date = %config.data_date,
        store_mode = config.store_mode.as_str(),
        playback_mode = config.playback_mode.as_str(),
        cursor_scope = config.cursor_scope.as_str(),
        push_enabled = config.push_enabled,
        push_tick = ?config.push_tick,
        "configuration loaded"
    );

    let load_start = std::time::Instant::now();
    let store: Arc<dyn RecordStore> = match build_store(&config) {
        Ok(store) => store,
        Err(e) => {
            error!("failed to load data: {e:#}");
            return 1;
        }
    };
    info!(
        files = store.keys().len(),
        elapsed = ?load_start.elapsed(),
        "data loaded"
    );

    let cursors = Arc::new(CursorStore::new(config.playback_mode));
    let shutdown = CancellationToken::new();

    // Hubs and streamers only exist when push is enabled; the router mounts
    // the negotiate and upgrade endpoints off the hubs map.
    let mut hubs: HashMap<&'static str, Arc<Hub>> = HashMap::new();
    if config.push_enabled {
        for kind in ALL_HUBS {
            let hub = Hub::new(kind, &config.group_prefix);
            let hub_task = hub.clone();
            let hub_cancel = shutdown.clone();
            tokio::spawn(async move { hub_task.run(hub_cancel).await });

            let streamer = match Streamer::new(
                hub.clone(),
                store.clone(),
                cursors.clone(),
                config.push_tick,
            ) {
                Ok(streamer) => streamer,
                Err(e) => {
                    error!(hub = kind.name(), "failed to create streamer: {e:#}");
                    return 1;
                }
            };
            let streamer_cancel = shutdown.clone();
            tokio::spawn(async move { streamer.run(streamer_cancel).await });

            hubs.insert(kind.name(), hub);
        }
        info!(hubs = hubs.len(), interval = ?config.push_tick, "push feed enabled");
    }

    let state = AppState {
        config: config.clone(),
        store,
        cursors,
        hubs: Arc::new(hubs),
        shutdown: shutdown.clone(),
        loaded_at: Utc::now(),
    };
    let app = create_router(state);

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = match TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!(addr = %addr, "failed to bind listener: {e}");
            return 1;
        }
    };
    info!(addr = %addr, "server listening");

    // Signal handler feeds the same token every long-running task watches.
    let signal_cancel = shutdown.clone();
    tokio::spawn(async move {
        shutdown_signal().await;
        warn!("shutdown signal received, draining");
        signal_cancel.cancel();
    });

    let serve_cancel = shutdown.clone();
    let server = axum::serve(listener, app)
        .with_graceful_shutdown(async move { serve_cancel.cancelled().await });
    let mut server_task = tokio::spawn(async move { server.await });

    let drained = tokio::select! {
        res = &mut server_task => Some(res),
        _ = shutdown.cancelled() => None,
    };

    let result = match drained {
        Some(res) => res,
        None => match tokio::time::timeout(SHUTDOWN_TIMEOUT, server_task).await {
            Ok(res) => res,
            Err(_) => {
                error!("drain timeout exceeded");
                return 1;
            }
        },
    };

    match result {
        Ok(Ok(())) => {
            info!("server stopped");
            0
        }
        Ok(Err(e)) => {
            error!("server error: {e}");
            1
        }
        Err(e) => {
            error!("server task failed: {e}");
            1
        }
    }
}

fn build_store(config: &Config) -> Result<Arc<dyn RecordStore>> {
    let store: Arc<dyn RecordStore> = match config.store_mode {
        StoreMode::Memory => Arc::new(
            MemoryStore::open(&config.data_root, &config.data_date)
                .context("building memory store")?,
        ),
        StoreMode::Stream => Arc::new(
            StreamStore::open(&config.data_root, &config.data_date)
                .context("building stream store")?,
        ),
    };
    Ok(store)
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "bluefeed=debug,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("failed to install ctrl-c handler: {e}");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => error!("failed to install signal handler: {e}"),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
