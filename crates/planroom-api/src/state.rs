//! Application state shared across all handlers and middleware.

use std::sync::Arc;
use std::time::Instant;

use planroom_core::config::AppConfig;
use planroom_database::FileRecordStore;
use planroom_service::{DownloadService, FileService, PreviewService, UploadService, VersionService};
use planroom_storage::StorageManager;

/// Application state containing all shared dependencies.
///
/// Passed to every Axum handler via `State<AppState>`.
/// All fields are `Arc`-wrapped for cheap cloning across tasks.
#[derive(Debug, Clone)]
pub struct AppState {
    // ── Configuration ────────────────────────────────────────
    /// Application configuration
    pub config: Arc<AppConfig>,
    /// Process start, for uptime reporting
    pub started_at: Instant,

    // ── Infrastructure ───────────────────────────────────────
    /// File record store (PostgreSQL or memory)
    pub store: Arc<dyn FileRecordStore>,
    /// Storage provider manager
    pub storage_manager: Arc<StorageManager>,

    // ── Services ─────────────────────────────────────────────
    /// Listing, metadata and deletion
    pub file_service: Arc<FileService>,
    /// Upload service
    pub upload_service: Arc<UploadService>,
    /// Version history and rollback
    pub version_service: Arc<VersionService>,
    /// Download streams and links
    pub download_service: Arc<DownloadService>,
    /// Thumbnails
    pub preview_service: Arc<PreviewService>,
}
