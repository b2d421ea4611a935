//! Response DTOs.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use planroom_entity::file::FileRecord;

/// Client URLs for one record.
#[derive(Debug, Clone, Serialize)]
pub struct FileUrls {
    /// Attachment download through the API.
    pub download: String,
    /// Inline preview through the API.
    pub preview: String,
}

impl FileUrls {
    /// API URLs for a record.
    pub fn for_record(record: &FileRecord) -> Self {
        Self {
            download: format!("/api/download/{}", record.id),
            preview: format!("/api/preview/{}", record.id),
        }
    }
}

/// Result of an upload.
#[derive(Debug, Clone, Serialize)]
pub struct UploadResponse {
    /// The stored record.
    pub file: FileRecord,
    /// Version that was latest before this upload.
    pub replaced_version: Option<i32>,
    /// Client URLs.
    pub urls: FileUrls,
}

/// Result of a rollback.
#[derive(Debug, Clone, Serialize)]
pub struct RollbackResponse {
    /// The record that is now latest.
    pub file: FileRecord,
    /// Version that was latest before the rollback.
    pub replaced_version: Option<i32>,
}

/// Result of a delete.
#[derive(Debug, Clone, Serialize)]
pub struct DeleteResponse {
    /// Number of records removed.
    pub deleted: usize,
    /// IDs of removed records.
    pub ids: Vec<String>,
}

/// Health of one component.
#[derive(Debug, Clone, Serialize)]
pub struct ComponentHealth {
    /// Backend name.
    pub backend: String,
    /// Whether it answered.
    pub healthy: bool,
}

/// `GET /api/health` body.
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// `ok` or `degraded`.
    pub status: String,
    /// Crate version.
    pub version: String,
    /// Current server time.
    pub timestamp: DateTime<Utc>,
    /// Seconds since start.
    pub uptime_seconds: u64,
    /// Metadata store health.
    pub metadata: ComponentHealth,
    /// Default storage provider.
    pub default_storage: String,
    /// Health per registered storage provider.
    pub storage: BTreeMap<String, bool>,
    /// Number of stored records.
    pub file_count: u64,
}
