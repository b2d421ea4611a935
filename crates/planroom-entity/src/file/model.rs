//! File record entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use planroom_core::types::FileId;

/// Uploader recorded when the client does not identify itself.
pub const ANONYMOUS_UPLOADER: &str = "anonymous";

/// One uploaded version of a document.
///
/// Records sharing a `base_name` form a version group; exactly one record
/// per group has `is_latest` set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct FileRecord {
    /// Unique record identifier.
    pub id: FileId,
    /// File name as uploaded, without any client directory.
    pub original_name: String,
    /// Version grouping key derived from the file name.
    pub base_name: String,
    /// Key of the blob within its storage provider.
    pub storage_path: String,
    /// Name of the storage provider holding the blob.
    pub storage_provider: String,
    /// MIME type of the blob.
    pub content_type: String,
    /// Blob size in bytes.
    pub size_bytes: i64,
    /// Who uploaded this version.
    pub uploaded_by: String,
    /// When this version was uploaded.
    pub uploaded_at: DateTime<Utc>,
    /// Last metadata edit or latest-flag change.
    pub updated_at: Option<DateTime<Utc>>,
    /// Free-form description.
    pub description: String,
    /// Tags.
    pub tags: Vec<String>,
    /// Whether this is the authoritative version of its group.
    pub is_latest: bool,
    /// 1-based version number within the group.
    pub version: i32,
}

impl FileRecord {
    /// Get the file extension (lowercase, without the dot), if any.
    pub fn extension(&self) -> Option<String> {
        self.original_name
            .rsplit_once('.')
            .filter(|(stem, _)| !stem.is_empty())
            .map(|(_, ext)| ext.to_lowercase())
    }

    /// Whether the blob is a raster image the preview service can thumbnail.
    pub fn is_raster_image(&self) -> bool {
        matches!(
            self.content_type.as_str(),
            "image/jpeg" | "image/png" | "image/gif" | "image/webp" | "image/bmp"
        )
    }

    /// Human readable version label ("2.0"), as shown on file cards.
    pub fn version_label(&self) -> String {
        format!("{}.0", self.version)
    }
}

/// Data required to insert a new version. The store assigns the version
/// number and latest flag.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewFileRecord {
    /// Pre-generated identifier (also embedded in the storage key).
    pub id: FileId,
    /// File name as uploaded.
    pub original_name: String,
    /// Version grouping key.
    pub base_name: String,
    /// Key of the already-written blob.
    pub storage_path: String,
    /// Provider the blob was written to.
    pub storage_provider: String,
    /// MIME type.
    pub content_type: String,
    /// Size in bytes.
    pub size_bytes: i64,
    /// Uploader.
    pub uploaded_by: String,
    /// Upload time.
    pub uploaded_at: DateTime<Utc>,
    /// Description.
    pub description: String,
    /// Tags.
    pub tags: Vec<String>,
}

impl NewFileRecord {
    /// Materialize the row the store will insert.
    pub fn into_record(self, version: i32) -> FileRecord {
        FileRecord {
            id: self.id,
            original_name: self.original_name,
            base_name: self.base_name,
            storage_path: self.storage_path,
            storage_provider: self.storage_provider,
            content_type: self.content_type,
            size_bytes: self.size_bytes,
            uploaded_by: self.uploaded_by,
            uploaded_at: self.uploaded_at,
            updated_at: None,
            description: self.description,
            tags: self.tags,
            is_latest: true,
            version,
        }
    }
}
