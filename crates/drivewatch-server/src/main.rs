//! drivewatchd - drive mirror service
//!
//! Wires configuration, the SQLite store, the Graph gateway, the
//! reconciliation worker and the HTTP surface together, then serves until
//! SIGTERM/SIGINT.
//!
//! The credential gate starts in the configured initial state (disabled by
//! default): nothing mutates until an operator POSTs `/bootstrap` and the
//! credential validates.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use drivewatch_core::config::Config;
use drivewatch_core::gate::CredentialGate;
use drivewatch_core::ports::{
    ICursorRepository, IItemRepository, IProviderGateway, ISubscriptionRepository,
};
use drivewatch_graph::{GraphClient, GraphGateway};
use drivewatch_store::{DatabasePool, SqliteStateStore};
use drivewatch_sync::bootstrap::Bootstrap;
use drivewatch_sync::engine::ReconciliationEngine;
use drivewatch_sync::queue::NotificationQueue;
use drivewatch_sync::subscription::SubscriptionManager;
use drivewatch_sync::worker::ReconciliationWorker;

use drivewatch_server::{create_router, AppState};

/// Waits for SIGTERM or SIGINT and triggers the cancellation token
async fn shutdown_signal(token: CancellationToken) {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received SIGINT (Ctrl+C)"),
        _ = terminate => info!("Received SIGTERM"),
    }

    token.cancel();
}

fn config_path() -> PathBuf {
    std::env::args()
        .nth(1)
        .or_else(|| std::env::var("DRIVEWATCH_CONFIG").ok())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("drivewatch.yaml"))
}

#[tokio::main]
async fn main() -> Result<()> {
    let config_path = config_path();
    let config = Config::load_validated(&config_path)
        .with_context(|| format!("failed to load configuration from {}", config_path.display()))?;

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.logging.level.clone()));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .init();

    info!(config = %config_path.display(), "drivewatchd starting");

    // State store
    let pool = DatabasePool::connect(&config.store.dsn)
        .await
        .context("failed to open the state store")?;
    let store = Arc::new(SqliteStateStore::new(pool.pool().clone()));

    // Provider gateway
    let gateway: Arc<dyn IProviderGateway> = Arc::new(GraphGateway::new(GraphClient::new(
        config.provider.bearer.clone(),
    )));

    // Gate, engine, subscription manager
    let gate = Arc::new(CredentialGate::new(config.sync.delta_enabled));
    let engine = Arc::new(ReconciliationEngine::new(
        Arc::clone(&gateway),
        Arc::clone(&store) as Arc<dyn IItemRepository>,
        Arc::clone(&store) as Arc<dyn ICursorRepository>,
        Arc::clone(&gate),
        config.sync.emit_update_events,
    ));
    let subscriptions = Arc::new(SubscriptionManager::new(
        Arc::clone(&gateway),
        Arc::clone(&store) as Arc<dyn ISubscriptionRepository>,
        config.subscriptions.notify_url.clone(),
        config.subscriptions.secret_floor,
    ));
    let bootstrap = Arc::new(Bootstrap::new(
        Arc::clone(&gateway),
        Arc::clone(&gate),
        Arc::clone(&subscriptions),
        Arc::clone(&engine),
    ));

    // Notification queue and worker
    let (queue, jobs) = NotificationQueue::bounded(config.sync.queue_capacity);
    let worker = ReconciliationWorker::new(Arc::clone(&engine), Arc::clone(&gate), queue.clone());

    let shutdown = CancellationToken::new();

    let signal_token = shutdown.clone();
    tokio::spawn(async move {
        shutdown_signal(signal_token).await;
    });

    let worker_token = shutdown.clone();
    let worker_handle = tokio::spawn(async move {
        worker.run(jobs, worker_token).await;
    });

    // HTTP surface
    let state = AppState::new(bootstrap, subscriptions, queue);
    let router = create_router(state);

    let addr: SocketAddr = config
        .server
        .bind
        .parse()
        .context("invalid server bind address")?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!(addr = %addr, "HTTP surface listening");

    let serve_token = shutdown.clone();
    let result = axum::serve(listener, router)
        .with_graceful_shutdown(async move { serve_token.cancelled().await })
        .await;

    shutdown.cancel();
    if let Err(e) = worker_handle.await {
        error!(error = %e, "Worker task panicked");
    }

    match &result {
        Ok(()) => info!("drivewatchd shut down gracefully"),
        Err(e) => error!(error = %e, "drivewatchd exiting with error"),
    }
    result.context("HTTP server failed")
}
