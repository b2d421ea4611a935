//! The metadata store abstraction.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use planroom_core::config::{DatabaseConfig, MetadataBackend, MetadataConfig};
use planroom_core::result::AppResult;
use planroom_core::types::FileId;
use planroom_entity::file::{
    DeleteMode, DeleteOutcome, FileFilter, FileRecord, LatestFile, NewFileRecord, VersionChange,
};

use crate::connection::DatabasePool;
use crate::migration::run_migrations;
use crate::repositories::{FileRecordRepository, MemoryFileRecordRepository};

/// Persistence for file records and their version groups.
///
/// Every operation that touches `is_latest` runs atomically with respect
/// to other operations on the same base name, so each non-empty group
/// always has exactly one latest record.
#[async_trait]
pub trait FileRecordStore: Send + Sync + std::fmt::Debug + 'static {
    /// Backend name reported by the health endpoint.
    fn backend(&self) -> &str;

    /// Check whether the store is reachable.
    async fn health_check(&self) -> AppResult<bool>;

    /// Total number of records across all groups.
    async fn count(&self) -> AppResult<u64>;

    /// Find a record by ID.
    async fn find_by_id(&self, id: FileId) -> AppResult<Option<FileRecord>>;

    /// Latest record of every group matching `filter`, newest upload first.
    async fn list_latest(&self, filter: &FileFilter) -> AppResult<Vec<LatestFile>>;

    /// Every record of a group, highest version first.
    async fn list_versions(&self, base_name: &str) -> AppResult<Vec<FileRecord>>;

    /// Insert a new version as latest, demoting the previous latest.
    async fn insert_version(&self, new: NewFileRecord) -> AppResult<VersionChange>;

    /// Make the given record the latest of its group.
    async fn set_latest(&self, id: FileId) -> AppResult<VersionChange>;

    /// Set the description and/or tags of a record in one write. `None`
    /// leaves the stored value untouched.
    async fn update_metadata(
        &self,
        id: FileId,
        description: Option<String>,
        tags: Option<Vec<String>>,
    ) -> AppResult<FileRecord>;

    /// Delete one record.
    async fn delete(&self, id: FileId, mode: DeleteMode) -> AppResult<DeleteOutcome>;

    /// Delete every record of a group and return them.
    async fn delete_group(&self, base_name: &str) -> AppResult<Vec<FileRecord>>;
}

/// Open the configured metadata store.
pub async fn open_store(
    metadata: &MetadataConfig,
    database: &DatabaseConfig,
) -> AppResult<Arc<dyn FileRecordStore>> {
    match metadata.backend {
        MetadataBackend::Postgres => {
            let pool = DatabasePool::connect(database).await?;
            if metadata.auto_migrate {
                run_migrations(pool.pool()).await?;
            }
            Ok(Arc::new(FileRecordRepository::new(pool.into_pool())))
        }
        MetadataBackend::Memory => {
            info!("Using in-memory metadata store; records are not persisted");
            Ok(Arc::new(MemoryFileRecordRepository::new()))
        }
    }
}
