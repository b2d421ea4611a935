//! In-memory file record repository.
//!
//! All mutations take the single write lock, which makes every latest-flag
//! transition atomic. Suitable for development and tests.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use planroom_core::error::AppError;
use planroom_core::result::AppResult;
use planroom_core::types::FileId;
use planroom_entity::file::{
    DeleteMode, DeleteOutcome, FileFilter, FileRecord, LatestFile, NewFileRecord, VersionChange,
};

use crate::store::FileRecordStore;

/// Repository for file records held in process memory.
#[derive(Debug, Default)]
pub struct MemoryFileRecordRepository {
    records: RwLock<HashMap<FileId, FileRecord>>,
}

impl MemoryFileRecordRepository {
    /// Create an empty repository.
    pub fn new() -> Self {
        Self::default()
    }
}

fn group<'a>(
    records: &'a HashMap<FileId, FileRecord>,
    base_name: &'a str,
) -> impl Iterator<Item = &'a FileRecord> + 'a {
    records.values().filter(move |r| r.base_name == base_name)
}

/// Clear the latest flag in a group, returning the demoted version.
fn demote_latest(records: &mut HashMap<FileId, FileRecord>, base_name: &str) -> Option<i32> {
    let mut replaced = None;
    for record in records
        .values_mut()
        .filter(|r| r.base_name == base_name && r.is_latest)
    {
        record.is_latest = false;
        record.updated_at = Some(Utc::now());
        replaced = Some(record.version);
    }
    replaced
}

fn not_found(id: FileId) -> AppError {
    AppError::not_found(format!("File {id} not found"))
}

#[async_trait]
impl FileRecordStore for MemoryFileRecordRepository {
    fn backend(&self) -> &str {
        "memory"
    }

    async fn health_check(&self) -> AppResult<bool> {
        Ok(true)
    }

    async fn count(&self) -> AppResult<u64> {
        Ok(self.records.read().await.len() as u64)
    }

    async fn find_by_id(&self, id: FileId) -> AppResult<Option<FileRecord>> {
        Ok(self.records.read().await.get(&id).cloned())
    }

    async fn list_latest(&self, filter: &FileFilter) -> AppResult<Vec<LatestFile>> {
        let records = self.records.read().await;
        let mut latest: Vec<LatestFile> = records
            .values()
            .filter(|r| r.is_latest && filter.matches(r))
            .map(|r| LatestFile {
                record: r.clone(),
                total_versions: group(&records, &r.base_name).count() as i64,
            })
            .collect();
        latest.sort_by(|a, b| b.record.uploaded_at.cmp(&a.record.uploaded_at));
        Ok(latest)
    }

    async fn list_versions(&self, base_name: &str) -> AppResult<Vec<FileRecord>> {
        let records = self.records.read().await;
        let mut versions: Vec<FileRecord> = group(&records, base_name).cloned().collect();
        versions.sort_by(|a, b| b.version.cmp(&a.version));
        Ok(versions)
    }

    async fn insert_version(&self, new: NewFileRecord) -> AppResult<VersionChange> {
        let mut records = self.records.write().await;
        if records.contains_key(&new.id) {
            return Err(AppError::conflict(format!("File {} already exists", new.id)));
        }

        let next_version = group(&records, &new.base_name)
            .map(|r| r.version)
            .max()
            .unwrap_or(0)
            + 1;
        let replaced_version = demote_latest(&mut records, &new.base_name);

        let record = new.into_record(next_version);
        records.insert(record.id, record.clone());
        Ok(VersionChange {
            record,
            replaced_version,
        })
    }

    async fn set_latest(&self, id: FileId) -> AppResult<VersionChange> {
        let mut records = self.records.write().await;
        let target = records.get(&id).cloned().ok_or_else(|| not_found(id))?;
        if target.is_latest {
            return Ok(VersionChange {
                record: target,
                replaced_version: None,
            });
        }

        let replaced_version = demote_latest(&mut records, &target.base_name);
        let record = records.get_mut(&id).ok_or_else(|| not_found(id))?;
        record.is_latest = true;
        record.updated_at = Some(Utc::now());
        Ok(VersionChange {
            record: record.clone(),
            replaced_version,
        })
    }

    async fn update_metadata(
        &self,
        id: FileId,
        description: Option<String>,
        tags: Option<Vec<String>>,
    ) -> AppResult<FileRecord> {
        let mut records = self.records.write().await;
        let record = records.get_mut(&id).ok_or_else(|| not_found(id))?;
        if let Some(description) = description {
            record.description = description;
        }
        if let Some(tags) = tags {
            record.tags = tags;
        }
        record.updated_at = Some(Utc::now());
        Ok(record.clone())
    }

    async fn delete(&self, id: FileId, mode: DeleteMode) -> AppResult<DeleteOutcome> {
        let mut records = self.records.write().await;
        let target = records.get(&id).ok_or_else(|| not_found(id))?;
        if target.is_latest && mode == DeleteMode::RejectLatest {
            return Err(AppError::validation("Cannot delete the latest version"));
        }

        let removed = records.remove(&id).ok_or_else(|| not_found(id))?;
        let promoted = if removed.is_latest {
            let successor = group(&records, &removed.base_name)
                .max_by_key(|r| r.version)
                .map(|r| r.id);
            successor.and_then(|next| {
                records.get_mut(&next).map(|r| {
                    r.is_latest = true;
                    r.updated_at = Some(Utc::now());
                    r.clone()
                })
            })
        } else {
            None
        };

        Ok(DeleteOutcome { removed, promoted })
    }

    async fn delete_group(&self, base_name: &str) -> AppResult<Vec<FileRecord>> {
        let mut records = self.records.write().await;
        let ids: Vec<FileId> = group(&records, base_name).map(|r| r.id).collect();
        let mut removed: Vec<FileRecord> = ids.iter().filter_map(|id| records.remove(id)).collect();
        removed.sort_by(|a, b| b.version.cmp(&a.version));
        Ok(removed)
    }
}
