//! Route definitions for the Planroom HTTP API.
//!
//! JSON routes are mounted under `/api`. Every other path serves the
//! static frontend, falling back to `index.html`.

use std::path::Path;
use std::time::Duration;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    middleware as axum_middleware,
    routing::{get, post, put},
};
use tower_http::services::{ServeDir, ServeFile};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use planroom_core::error::AppError;

use crate::error::ApiError;
use crate::handlers;
use crate::middleware;
use crate::state::AppState;

/// Room for multipart boundaries and text fields on top of the file itself.
const MULTIPART_OVERHEAD: u64 = 1024 * 1024;

/// Build the complete Axum router with all routes and middleware.
///
/// Receives the fully-constructed `AppState` and threads it through
/// every route via `.with_state(state)`.
pub fn build_router(state: AppState) -> Router {
    let config = &state.config;
    let body_limit = usize::try_from(
        config
            .storage
            .max_upload_size_bytes
            .saturating_add(MULTIPART_OVERHEAD),
    )
    .unwrap_or(usize::MAX);
    let request_timeout = Duration::from_secs(config.server.request_timeout_seconds);

    let api_routes = Router::new()
        .merge(file_routes().layer(TimeoutLayer::new(request_timeout)))
        .merge(transfer_routes().layer(DefaultBodyLimit::max(body_limit)))
        .route("/health", get(handlers::health::health))
        .fallback(api_not_found);

    let frontend_dir = Path::new(&config.server.frontend_dir);
    let frontend = ServeDir::new(frontend_dir)
        .fallback(ServeFile::new(frontend_dir.join("index.html")));

    Router::new()
        .nest("/api", api_routes)
        .route("/healthz", get(handlers::health::liveness))
        .fallback_service(frontend)
        .layer(middleware::compression::build_compression_layer())
        .layer(TraceLayer::new_for_http())
        .layer(middleware::cors::build_cors_layer(&config.server.cors))
        .layer(axum_middleware::from_fn(middleware::logging::request_logging))
        .with_state(state)
}

/// Listing, metadata, versions and deletion.
fn file_routes() -> Router<AppState> {
    Router::new()
        .route("/files", get(handlers::file::list_files))
        .route(
            "/files/{id}",
            get(handlers::file::get_file).delete(handlers::file::delete_file),
        )
        // The segment is a base name here, not a record ID.
        .route("/files/{id}/versions", get(handlers::file::list_versions))
        .route("/files/{id}/url", get(handlers::file::file_url))
        .route("/files/{id}/metadata", put(handlers::file::update_metadata))
        .route("/files/{id}/rollback", post(handlers::file::rollback))
        .route(
            "/files/{id}/version",
            axum::routing::delete(handlers::file::delete_version),
        )
}

/// Upload, download and preview; no request timeout.
fn transfer_routes() -> Router<AppState> {
    Router::new()
        .route("/upload", post(handlers::file::upload))
        .route("/download/{id}", get(handlers::file::download))
        .route("/preview/{id}", get(handlers::file::preview))
}

async fn api_not_found() -> ApiError {
    AppError::not_found("No such API endpoint").into()
}
