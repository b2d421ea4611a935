//! Version-group views and latest-flag transitions.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::model::FileRecord;

/// A latest record together with the size of its version group.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct LatestFile {
    /// The latest record.
    #[serde(flatten)]
    #[sqlx(flatten)]
    pub record: FileRecord,
    /// Number of versions sharing the record's base name.
    pub total_versions: i64,
}

/// Result of an operation that moved the latest flag.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VersionChange {
    /// The record that is now latest.
    pub record: FileRecord,
    /// Version number of the record that lost the flag, if any.
    pub replaced_version: Option<i32>,
}

/// How a single-record delete treats the latest version.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteMode {
    /// Allow deleting the latest; the highest remaining version takes over.
    PromotePrevious,
    /// Refuse to delete the latest version.
    RejectLatest,
}

/// Result of deleting one record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteOutcome {
    /// The deleted record; its blob is still to be removed.
    pub removed: FileRecord,
    /// The record promoted to latest, when the removed one was latest.
    pub promoted: Option<FileRecord>,
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use planroom_core::types::FileId;

    use super::*;
    use crate::file::NewFileRecord;

    #[test]
    fn test_latest_file_serializes_flat() {
        let record = NewFileRecord {
            id: FileId::new(),
            original_name: "A-101.pdf".to_string(),
            base_name: "A-101".to_string(),
            storage_path: "files/A-101/a.pdf".to_string(),
            storage_provider: "local".to_string(),
            content_type: "application/pdf".to_string(),
            size_bytes: 42,
            uploaded_by: "site-office".to_string(),
            uploaded_at: Utc::now(),
            description: "Ground floor".to_string(),
            tags: vec!["architectural".to_string()],
        }
        .into_record(2);

        let json = serde_json::to_value(LatestFile {
            record,
            total_versions: 2,
        })
        .expect("serialize");

        assert_eq!(json["original_name"], "A-101.pdf");
        assert_eq!(json["total_versions"], 2);
        assert_eq!(json["is_latest"], true);
    }
}
