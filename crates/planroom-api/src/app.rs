//! Application builder: wires services and state into an Axum app and runs it.

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::Router;
use tokio::sync::watch;
use tracing::{info, warn};

use planroom_core::config::AppConfig;
use planroom_core::error::{AppError, ErrorKind};
use planroom_core::result::AppResult;
use planroom_database::{FileRecordStore, open_store};
use planroom_service::{DownloadService, FileService, PreviewService, UploadService, VersionService};
use planroom_storage::StorageManager;

use crate::router::build_router;
use crate::state::AppState;

/// Builds the complete Axum application with all routes and middleware.
pub fn build_app(state: AppState) -> Router {
    build_router(state)
}

/// Assemble application state from an already opened store and storage.
pub fn assemble_state(
    config: AppConfig,
    store: Arc<dyn FileRecordStore>,
    storage_manager: Arc<StorageManager>,
) -> AppState {
    let file_service = Arc::new(FileService::new(
        Arc::clone(&store),
        Arc::clone(&storage_manager),
    ));
    let upload_service = Arc::new(UploadService::new(
        Arc::clone(&store),
        Arc::clone(&storage_manager),
        &config.storage,
    ));
    let version_service = Arc::new(VersionService::new(Arc::clone(&store)));
    let download_service = Arc::new(DownloadService::new(
        Arc::clone(&store),
        Arc::clone(&storage_manager),
        &config.storage,
    ));
    let preview_service = Arc::new(PreviewService::new(
        Arc::clone(&store),
        Arc::clone(&storage_manager),
        &config.preview,
    ));

    AppState {
        config: Arc::new(config),
        started_at: Instant::now(),
        store,
        storage_manager,
        file_service,
        upload_service,
        version_service,
        download_service,
        preview_service,
    }
}

/// Open the configured metadata store and storage providers and build state.
pub async fn build_state(config: AppConfig) -> AppResult<AppState> {
    // ── Step 1: Metadata store ───────────────────────────────────
    info!(backend = %config.metadata.backend, "Opening metadata store...");
    let store = open_store(&config.metadata, &config.database).await?;

    // ── Step 2: Storage providers ────────────────────────────────
    let storage_manager = Arc::new(StorageManager::from_config(&config.storage).await?);

    // ── Step 3: Services ─────────────────────────────────────────
    Ok(assemble_state(config, store, storage_manager))
}

/// Runs the Planroom server until Ctrl+C or SIGTERM.
pub async fn run_server(config: AppConfig) -> AppResult<()> {
    info!("Starting Planroom server...");

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let grace = Duration::from_secs(config.server.shutdown_grace_seconds);

    let state = build_state(config).await?;
    let app = build_app(state);

    // ── Step 4: Bind and serve ───────────────────────────────────
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Internal, format!("Failed to bind {addr}"), e))?;

    info!(address = %addr, "Planroom server listening");

    let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
    let server = async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                shutdown_signal().await;
                let _ = shutdown_tx.send(true);
            })
            .await
    };

    tokio::select! {
        result = server => {
            result.map_err(|e| AppError::with_source(ErrorKind::Internal, "Server error", e))?;
        }
        _ = async {
            if shutdown_rx.changed().await.is_ok() {
                tokio::time::sleep(grace).await;
            } else {
                std::future::pending::<()>().await;
            }
        } => {
            warn!(grace_seconds = grace.as_secs(), "Graceful shutdown timed out; dropping open connections");
        }
    }

    info!("Planroom server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
