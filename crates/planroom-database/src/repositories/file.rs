//! PostgreSQL file record repository.
//!
//! Group-changing operations run in one transaction holding
//! `pg_advisory_xact_lock(hashtext(base_name))`, so concurrent uploads or
//! rollbacks of the same document are serialized. The partial unique index
//! `file_records_one_latest_idx` backs the single-latest invariant.

use async_trait::async_trait;
use sqlx::{PgPool, Postgres, Transaction};

use planroom_core::error::{AppError, ErrorKind};
use planroom_core::result::AppResult;
use planroom_core::types::FileId;
use planroom_entity::file::{
    DeleteMode, DeleteOutcome, FileFilter, FileRecord, LatestFile, NewFileRecord, VersionChange,
};

use crate::store::FileRecordStore;

const UNIQUE_VIOLATION: &str = "23505";

/// Repository for file records backed by PostgreSQL.
#[derive(Debug, Clone)]
pub struct FileRecordRepository {
    pool: PgPool,
}

impl FileRecordRepository {
    /// Create a new file record repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn begin(&self) -> AppResult<Transaction<'static, Postgres>> {
        self.pool
            .begin()
            .await
            .map_err(|e| db_error("Failed to begin transaction", e))
    }

    /// Base name of a record; never changes after insert, so it can be read
    /// before taking the group lock.
    async fn base_name_of(&self, id: FileId) -> AppResult<String> {
        sqlx::query_scalar::<_, String>("SELECT base_name FROM file_records WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| db_error("Failed to find file", e))?
            .ok_or_else(|| AppError::not_found(format!("File {id} not found")))
    }
}

/// Serialize writers of one version group until the transaction ends.
async fn lock_group(tx: &mut Transaction<'_, Postgres>, base_name: &str) -> AppResult<()> {
    sqlx::query("SELECT pg_advisory_xact_lock(hashtext($1))")
        .bind(base_name)
        .execute(&mut **tx)
        .await
        .map_err(|e| db_error("Failed to lock version group", e))?;
    Ok(())
}

async fn lock_record(tx: &mut Transaction<'_, Postgres>, id: FileId) -> AppResult<FileRecord> {
    sqlx::query_as::<_, FileRecord>("SELECT * FROM file_records WHERE id = $1 FOR UPDATE")
        .bind(id)
        .fetch_optional(&mut **tx)
        .await
        .map_err(|e| db_error("Failed to find file", e))?
        .ok_or_else(|| AppError::not_found(format!("File {id} not found")))
}

async fn demote_latest(tx: &mut Transaction<'_, Postgres>, base_name: &str) -> AppResult<Option<i32>> {
    sqlx::query_scalar::<_, i32>(
        "UPDATE file_records SET is_latest = FALSE, updated_at = NOW() \
         WHERE base_name = $1 AND is_latest RETURNING version",
    )
    .bind(base_name)
    .fetch_optional(&mut **tx)
    .await
    .map_err(|e| db_error("Failed to demote latest version", e))
}

async fn commit(tx: Transaction<'_, Postgres>) -> AppResult<()> {
    tx.commit()
        .await
        .map_err(|e| db_error("Failed to commit transaction", e))
}

fn db_error(message: &str, err: sqlx::Error) -> AppError {
    let unique = err
        .as_database_error()
        .and_then(|d| d.code())
        .is_some_and(|code| code == UNIQUE_VIOLATION);
    if unique {
        return AppError::with_source(
            ErrorKind::Conflict,
            format!("{message}: concurrent version change"),
            err,
        );
    }
    AppError::with_source(ErrorKind::Database, message.to_string(), err)
}

fn like_pattern(term: &str) -> String {
    let escaped = term
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{escaped}%")
}

#[async_trait]
impl FileRecordStore for FileRecordRepository {
    fn backend(&self) -> &str {
        "postgres"
    }

    async fn health_check(&self) -> AppResult<bool> {
        sqlx::query_scalar::<_, i32>("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .map(|v| v == 1)
            .map_err(|e| db_error("Health check failed", e))
    }

    async fn count(&self) -> AppResult<u64> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM file_records")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| db_error("Failed to count files", e))?;
        Ok(total.max(0) as u64)
    }

    async fn find_by_id(&self, id: FileId) -> AppResult<Option<FileRecord>> {
        sqlx::query_as::<_, FileRecord>("SELECT * FROM file_records WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| db_error("Failed to find file", e))
    }

    async fn list_latest(&self, filter: &FileFilter) -> AppResult<Vec<LatestFile>> {
        sqlx::query_as::<_, LatestFile>(
            "SELECT f.*, \
                    (SELECT COUNT(*) FROM file_records v WHERE v.base_name = f.base_name) AS total_versions \
             FROM file_records f \
             WHERE f.is_latest \
               AND ($1::text IS NULL \
                    OR f.original_name ILIKE $1 ESCAPE '\\' \
                    OR f.description ILIKE $1 ESCAPE '\\') \
               AND ($2::text IS NULL OR $2 = ANY(f.tags)) \
             ORDER BY f.uploaded_at DESC",
        )
        .bind(filter.search_term().map(like_pattern))
        .bind(filter.tag_term())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("Failed to list files", e))
    }

    async fn list_versions(&self, base_name: &str) -> AppResult<Vec<FileRecord>> {
        sqlx::query_as::<_, FileRecord>(
            "SELECT * FROM file_records WHERE base_name = $1 ORDER BY version DESC",
        )
        .bind(base_name)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("Failed to list versions", e))
    }

    async fn insert_version(&self, new: NewFileRecord) -> AppResult<VersionChange> {
        let mut tx = self.begin().await?;
        lock_group(&mut tx, &new.base_name).await?;

        let replaced_version = demote_latest(&mut tx, &new.base_name).await?;

        let next_version: i32 = sqlx::query_scalar(
            "SELECT COALESCE(MAX(version), 0) + 1 FROM file_records WHERE base_name = $1",
        )
        .bind(&new.base_name)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| db_error("Failed to compute next version", e))?;

        let record = sqlx::query_as::<_, FileRecord>(
            "INSERT INTO file_records (id, original_name, base_name, storage_path, storage_provider, \
             content_type, size_bytes, uploaded_by, uploaded_at, description, tags, is_latest, version) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, TRUE, $12) RETURNING *",
        )
        .bind(new.id)
        .bind(&new.original_name)
        .bind(&new.base_name)
        .bind(&new.storage_path)
        .bind(&new.storage_provider)
        .bind(&new.content_type)
        .bind(new.size_bytes)
        .bind(&new.uploaded_by)
        .bind(new.uploaded_at)
        .bind(&new.description)
        .bind(&new.tags)
        .bind(next_version)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| db_error("Failed to insert file record", e))?;

        commit(tx).await?;
        Ok(VersionChange {
            record,
            replaced_version,
        })
    }

    async fn set_latest(&self, id: FileId) -> AppResult<VersionChange> {
        let base_name = self.base_name_of(id).await?;
        let mut tx = self.begin().await?;
        lock_group(&mut tx, &base_name).await?;

        let target = lock_record(&mut tx, id).await?;
        if target.is_latest {
            commit(tx).await?;
            return Ok(VersionChange {
                record: target,
                replaced_version: None,
            });
        }

        let replaced_version = demote_latest(&mut tx, &base_name).await?;
        let record = sqlx::query_as::<_, FileRecord>(
            "UPDATE file_records SET is_latest = TRUE, updated_at = NOW() WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| db_error("Failed to promote version", e))?;

        commit(tx).await?;
        Ok(VersionChange {
            record,
            replaced_version,
        })
    }

    async fn update_metadata(
        &self,
        id: FileId,
        description: Option<String>,
        tags: Option<Vec<String>>,
    ) -> AppResult<FileRecord> {
        sqlx::query_as::<_, FileRecord>(
            "UPDATE file_records \
             SET description = COALESCE($2, description), tags = COALESCE($3, tags), \
                 updated_at = NOW() \
             WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(description)
        .bind(tags)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("Failed to update file metadata", e))?
        .ok_or_else(|| AppError::not_found(format!("File {id} not found")))
    }

    async fn delete(&self, id: FileId, mode: DeleteMode) -> AppResult<DeleteOutcome> {
        let base_name = self.base_name_of(id).await?;
        let mut tx = self.begin().await?;
        lock_group(&mut tx, &base_name).await?;

        let target = lock_record(&mut tx, id).await?;
        if target.is_latest && mode == DeleteMode::RejectLatest {
            return Err(AppError::validation("Cannot delete the latest version"));
        }

        sqlx::query("DELETE FROM file_records WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(|e| db_error("Failed to delete file record", e))?;

        let promoted = if target.is_latest {
            sqlx::query_as::<_, FileRecord>(
                "UPDATE file_records SET is_latest = TRUE, updated_at = NOW() \
                 WHERE id = (SELECT id FROM file_records WHERE base_name = $1 \
                             ORDER BY version DESC LIMIT 1) \
                 RETURNING *",
            )
            .bind(&base_name)
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| db_error("Failed to promote previous version", e))?
        } else {
            None
        };

        commit(tx).await?;
        Ok(DeleteOutcome {
            removed: target,
            promoted,
        })
    }

    async fn delete_group(&self, base_name: &str) -> AppResult<Vec<FileRecord>> {
        let mut tx = self.begin().await?;
        lock_group(&mut tx, base_name).await?;

        let removed = sqlx::query_as::<_, FileRecord>(
            "DELETE FROM file_records WHERE base_name = $1 RETURNING *",
        )
        .bind(base_name)
        .fetch_all(&mut *tx)
        .await
        .map_err(|e| db_error("Failed to delete version group", e))?;

        commit(tx).await?;
        Ok(removed)
    }
}
