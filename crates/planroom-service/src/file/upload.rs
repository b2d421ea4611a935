//! File upload service: validates, stores the blob, records a new version.

use std::sync::Arc;

use bytes::Bytes;
use chrono::Utc;
use tracing::{info, warn};

use planroom_core::config::StorageConfig;
use planroom_core::result::AppResult;
use planroom_core::types::FileId;
use planroom_database::FileRecordStore;
use planroom_entity::file::{ANONYMOUS_UPLOADER, NewFileRecord, VersionChange};
use planroom_storage::StorageManager;

use super::naming::{client_file_name, derive_base_name, normalize_tags, split_extension, storage_key};
use super::policy::UploadPolicy;

/// Handles single-request uploads.
#[derive(Clone)]
pub struct UploadService {
    /// Metadata store.
    store: Arc<dyn FileRecordStore>,
    /// Storage manager.
    storage: Arc<StorageManager>,
    /// Acceptance rules.
    policy: UploadPolicy,
    /// Prefix for every storage key.
    key_prefix: String,
}

impl std::fmt::Debug for UploadService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UploadService")
            .field("key_prefix", &self.key_prefix)
            .finish()
    }
}

/// One uploaded file with its form metadata.
#[derive(Debug, Clone)]
pub struct UploadParams {
    /// File name as sent by the client.
    pub file_name: String,
    /// Declared MIME type, if any.
    pub content_type: Option<String>,
    /// File contents.
    pub data: Bytes,
    /// Description.
    pub description: String,
    /// Tags, not yet normalized.
    pub tags: Vec<String>,
    /// Uploader; anonymous when absent or blank.
    pub uploaded_by: Option<String>,
}

impl UploadService {
    /// Creates a new upload service.
    pub fn new(
        store: Arc<dyn FileRecordStore>,
        storage: Arc<StorageManager>,
        config: &StorageConfig,
    ) -> Self {
        Self {
            store,
            storage,
            policy: UploadPolicy::from_config(config),
            key_prefix: config.key_prefix.clone(),
        }
    }

    /// Acceptance rules in effect.
    pub fn policy(&self) -> &UploadPolicy {
        &self.policy
    }

    /// Store a file as the newest version of its group.
    ///
    /// The blob is written before the record. If recording fails the blob
    /// is removed again so no orphan is left behind.
    pub async fn upload(&self, params: UploadParams) -> AppResult<VersionChange> {
        let original_name = client_file_name(&params.file_name)?;
        let content_type = self.policy.check(
            &original_name,
            params.content_type.as_deref(),
            params.data.len() as u64,
        )?;
        let base_name = derive_base_name(&original_name)?;
        let tags = normalize_tags(&params.tags)?;
        let uploaded_by = params
            .uploaded_by
            .as_deref()
            .map(str::trim)
            .filter(|u| !u.is_empty())
            .unwrap_or(ANONYMOUS_UPLOADER)
            .to_string();

        let id = FileId::new();
        let now = Utc::now();
        let (_, extension) = split_extension(&original_name);
        let key = storage_key(&self.key_prefix, &base_name, id, now, extension);
        let size = params.data.len() as i64;

        let (provider_name, provider) = self.storage.get_default().await?;
        provider.write(&key, params.data, &content_type).await?;

        let new = NewFileRecord {
            id,
            original_name,
            base_name,
            storage_path: key.clone(),
            storage_provider: provider_name.clone(),
            content_type,
            size_bytes: size,
            uploaded_by,
            uploaded_at: now,
            description: params.description.trim().to_string(),
            tags,
        };

        let change = match self.store.insert_version(new).await {
            Ok(change) => change,
            Err(e) => {
                if let Err(cleanup) = provider.delete(&key).await {
                    warn!(path = %key, error = %cleanup, "Failed to remove blob after record insert failed");
                }
                return Err(e);
            }
        };

        info!(
            file_id = %change.record.id,
            base_name = %change.record.base_name,
            version = change.record.version,
            provider = %provider_name,
            size = size,
            "File uploaded"
        );

        Ok(change)
    }
}
