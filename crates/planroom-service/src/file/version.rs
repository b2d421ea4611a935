//! Version history and rollback.

use std::sync::Arc;

use serde::Serialize;
use tracing::info;

use planroom_core::error::AppError;
use planroom_core::result::AppResult;
use planroom_core::types::FileId;
use planroom_database::FileRecordStore;
use planroom_entity::file::{FileRecord, VersionChange};

/// Every version of one group.
#[derive(Debug, Clone, Serialize)]
pub struct VersionHistory {
    /// Group key.
    pub base_name: String,
    /// Latest version number.
    pub latest_version: i32,
    /// Versions, highest first.
    pub versions: Vec<FileRecord>,
}

/// Manages version history.
#[derive(Clone)]
pub struct VersionService {
    /// Metadata store.
    store: Arc<dyn FileRecordStore>,
}

impl std::fmt::Debug for VersionService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VersionService").finish()
    }
}

impl VersionService {
    /// Creates a new version service.
    pub fn new(store: Arc<dyn FileRecordStore>) -> Self {
        Self { store }
    }

    /// Lists all versions of a group.
    pub async fn list_versions(&self, base_name: &str) -> AppResult<VersionHistory> {
        let versions = self.store.list_versions(base_name).await?;
        let latest_version = versions
            .iter()
            .find(|r| r.is_latest)
            .map(|r| r.version)
            .ok_or_else(|| AppError::not_found(format!("No versions found for '{base_name}'")))?;

        Ok(VersionHistory {
            base_name: base_name.to_string(),
            latest_version,
            versions,
        })
    }

    /// Make an older version the latest again. Rolling back to the current
    /// latest is a no-op with no replaced version.
    pub async fn rollback(&self, id: FileId) -> AppResult<VersionChange> {
        let change = self.store.set_latest(id).await?;
        info!(
            file_id = %id,
            base_name = %change.record.base_name,
            version = change.record.version,
            replaced = ?change.replaced_version,
            "Rolled back to version"
        );
        Ok(change)
    }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;

    use super::*;
    use crate::file::UploadParams;
    use crate::file::test_support::Fixture;

    async fn upload(fx: &Fixture) -> FileRecord {
        fx.uploads
            .upload(UploadParams {
                file_name: "E-301.pdf".to_string(),
                content_type: Some("application/pdf".to_string()),
                data: Bytes::from_static(b"%PDF"),
                description: String::new(),
                tags: vec![],
                uploaded_by: Some("electrical".to_string()),
            })
            .await
            .unwrap()
            .record
    }

    #[tokio::test]
    async fn test_history_lists_highest_first() {
        let fx = Fixture::new().await;
        upload(&fx).await;
        upload(&fx).await;
        upload(&fx).await;

        let history = fx.versions.list_versions("E-301").await.unwrap();
        assert_eq!(history.latest_version, 3);
        let numbers: Vec<i32> = history.versions.iter().map(|r| r.version).collect();
        assert_eq!(numbers, vec![3, 2, 1]);
    }

    #[tokio::test]
    async fn test_unknown_group_is_not_found() {
        let fx = Fixture::new().await;
        let err = fx.versions.list_versions("nothing").await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_rollback_moves_latest_flag() {
        let fx = Fixture::new().await;
        let v1 = upload(&fx).await;
        upload(&fx).await;

        let change = fx.versions.rollback(v1.id).await.unwrap();
        assert_eq!(change.record.version, 1);
        assert!(change.record.is_latest);
        assert_eq!(change.replaced_version, Some(2));

        let history = fx.versions.list_versions("E-301").await.unwrap();
        assert_eq!(history.latest_version, 1);
        assert_eq!(history.versions.iter().filter(|r| r.is_latest).count(), 1);

        let again = fx.versions.rollback(v1.id).await.unwrap();
        assert_eq!(again.replaced_version, None);
    }
}
