//! Shared fixture for service tests: memory store plus memory blobs.

use std::sync::Arc;

use planroom_core::config::{PreviewConfig, StorageConfig};
use planroom_database::{FileRecordStore, MemoryFileRecordRepository};
use planroom_storage::StorageManager;
use planroom_storage::providers::MemoryStorageProvider;

use super::{DownloadService, FileService, PreviewService, UploadService, VersionService};

pub(crate) struct Fixture {
    pub store: Arc<MemoryFileRecordRepository>,
    pub blobs: Arc<MemoryStorageProvider>,
    pub uploads: UploadService,
    pub files: FileService,
    pub versions: VersionService,
    pub downloads: DownloadService,
    pub previews: PreviewService,
}

impl Fixture {
    pub async fn new() -> Self {
        Self::with_config(StorageConfig::default()).await
    }

    pub async fn with_config(config: StorageConfig) -> Self {
        let store = Arc::new(MemoryFileRecordRepository::new());
        let blobs = Arc::new(MemoryStorageProvider::new());
        let storage = Arc::new(StorageManager::new());
        storage.register("memory", blobs.clone(), true).await;

        let dyn_store: Arc<dyn FileRecordStore> = store.clone();
        Self {
            uploads: UploadService::new(dyn_store.clone(), storage.clone(), &config),
            files: FileService::new(dyn_store.clone(), storage.clone()),
            versions: VersionService::new(dyn_store.clone()),
            downloads: DownloadService::new(dyn_store.clone(), storage.clone(), &config),
            previews: PreviewService::new(dyn_store, storage, &PreviewConfig::default()),
            store,
            blobs,
        }
    }
}
