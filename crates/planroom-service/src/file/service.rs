//! File listing, metadata edits, and deletion.

use std::sync::Arc;

use tracing::{info, warn};

use planroom_core::error::AppError;
use planroom_core::result::AppResult;
use planroom_core::types::FileId;
use planroom_database::FileRecordStore;
use planroom_entity::file::{DeleteMode, FileFilter, FileRecord, LatestFile};
use planroom_storage::StorageManager;

use super::naming::normalize_tags;

/// Maximum description length, in characters.
pub const MAX_DESCRIPTION_LEN: usize = 2000;

/// Handles record listing, metadata edits and deletion.
#[derive(Clone)]
pub struct FileService {
    /// Metadata store.
    store: Arc<dyn FileRecordStore>,
    /// Storage manager, for removing blobs.
    storage: Arc<StorageManager>,
}

impl std::fmt::Debug for FileService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileService")
            .field("backend", &self.store.backend())
            .finish()
    }
}

impl FileService {
    /// Creates a new file service.
    pub fn new(store: Arc<dyn FileRecordStore>, storage: Arc<StorageManager>) -> Self {
        Self { store, storage }
    }

    /// Latest version of every group, newest upload first.
    pub async fn list(&self, filter: &FileFilter) -> AppResult<Vec<LatestFile>> {
        self.store.list_latest(filter).await
    }

    /// Gets a record by ID.
    pub async fn get(&self, id: FileId) -> AppResult<FileRecord> {
        self.store
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("File {id} not found")))
    }

    /// Update description and tags. Fields left as `None` keep their value.
    pub async fn update_metadata(
        &self,
        id: FileId,
        description: Option<String>,
        tags: Option<Vec<String>>,
    ) -> AppResult<FileRecord> {
        let description = description
            .map(|d| {
                let d = d.trim().to_string();
                if d.chars().count() > MAX_DESCRIPTION_LEN {
                    return Err(AppError::validation(format!(
                        "Description exceeds {MAX_DESCRIPTION_LEN} characters"
                    )));
                }
                Ok(d)
            })
            .transpose()?;
        let tags = tags.map(normalize_tags).transpose()?;

        let updated = self.store.update_metadata(id, description, tags).await?;
        info!(file_id = %id, "File metadata updated");
        Ok(updated)
    }

    /// Delete a record, or its whole group when `all_versions` is set.
    ///
    /// Deleting the latest version promotes the next highest one. Returns
    /// the removed records.
    pub async fn delete(&self, id: FileId, all_versions: bool) -> AppResult<Vec<FileRecord>> {
        if all_versions {
            let record = self.get(id).await?;
            let removed = self.store.delete_group(&record.base_name).await?;
            self.remove_blobs(&removed).await;
            info!(base_name = %record.base_name, count = removed.len(), "File group deleted");
            return Ok(removed);
        }

        let outcome = self.store.delete(id, DeleteMode::PromotePrevious).await?;
        self.remove_blobs(std::slice::from_ref(&outcome.removed)).await;
        info!(
            file_id = %id,
            promoted = ?outcome.promoted.as_ref().map(|p| p.version),
            "File deleted"
        );
        Ok(vec![outcome.removed])
    }

    /// Delete a single non-latest version. Deleting the latest is rejected.
    pub async fn delete_version(&self, id: FileId) -> AppResult<FileRecord> {
        let outcome = self.store.delete(id, DeleteMode::RejectLatest).await?;
        self.remove_blobs(std::slice::from_ref(&outcome.removed)).await;
        info!(file_id = %id, version = outcome.removed.version, "File version deleted");
        Ok(outcome.removed)
    }

    /// Remove blobs after their records are gone. Failures leave an orphan
    /// blob, which is logged but not reported to the caller.
    async fn remove_blobs(&self, records: &[FileRecord]) {
        for record in records {
            let result = match self.storage.get(&record.storage_provider).await {
                Ok(provider) => provider.delete(&record.storage_path).await,
                Err(e) => Err(e),
            };
            if let Err(e) = result {
                warn!(
                    file_id = %record.id,
                    path = %record.storage_path,
                    provider = %record.storage_provider,
                    error = %e,
                    "Failed to delete blob"
                );
            }
        }
    }
}
