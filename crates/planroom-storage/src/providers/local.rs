//! Local filesystem storage provider.

use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::StreamExt;
use tokio::fs;
use tokio_util::io::ReaderStream;
use tracing::debug;

use planroom_core::error::{AppError, ErrorKind};
use planroom_core::result::AppResult;
use planroom_core::traits::storage::{ByteStream, StorageProvider};

/// Local filesystem storage provider.
#[derive(Debug, Clone)]
pub struct LocalStorageProvider {
    /// Root directory for all stored blobs.
    root: PathBuf,
}

impl LocalStorageProvider {
    /// Create a new local storage provider rooted at the given path.
    pub async fn new(root_path: &str) -> AppResult<Self> {
        let root = PathBuf::from(root_path);
        fs::create_dir_all(&root).await.map_err(|e| {
            AppError::with_source(
                ErrorKind::Storage,
                format!("Failed to create storage root: {}", root.display()),
                e,
            )
        })?;
        Ok(Self { root })
    }

    /// Resolve a storage key to a path within the root.
    ///
    /// Keys are relative; `..`, absolute paths, and drive prefixes are rejected.
    fn resolve(&self, path: &str) -> AppResult<PathBuf> {
        let relative = Path::new(path);
        let escapes = relative.components().any(|c| {
            matches!(
                c,
                Component::ParentDir | Component::RootDir | Component::Prefix(_)
            )
        });
        if path.is_empty() || escapes {
            return Err(AppError::validation(format!("Invalid storage path: {path}")));
        }
        Ok(self.root.join(relative))
    }

    /// Ensure the parent directory of a path exists.
    async fn ensure_parent(&self, path: &Path) -> AppResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await.map_err(|e| {
                AppError::with_source(
                    ErrorKind::Storage,
                    format!("Failed to create parent directory: {}", parent.display()),
                    e,
                )
            })?;
        }
        Ok(())
    }
}

fn open_error(path: &str, action: &str, e: std::io::Error) -> AppError {
    if e.kind() == std::io::ErrorKind::NotFound {
        AppError::not_found(format!("Blob not found: {path}"))
    } else {
        AppError::with_source(ErrorKind::Storage, format!("Failed to {action} blob: {path}"), e)
    }
}

#[async_trait]
impl StorageProvider for LocalStorageProvider {
    fn provider_type(&self) -> &str {
        "local"
    }

    async fn health_check(&self) -> AppResult<bool> {
        Ok(fs::metadata(&self.root)
            .await
            .map(|m| m.is_dir())
            .unwrap_or(false))
    }

    async fn read(&self, path: &str) -> AppResult<ByteStream> {
        let full_path = self.resolve(path)?;
        let file = fs::File::open(&full_path)
            .await
            .map_err(|e| open_error(path, "open", e))?;

        let stream = ReaderStream::new(file);
        Ok(Box::pin(stream.map(|r| r.map(Bytes::from))))
    }

    async fn read_bytes(&self, path: &str) -> AppResult<Bytes> {
        let full_path = self.resolve(path)?;
        let data = fs::read(&full_path)
            .await
            .map_err(|e| open_error(path, "read", e))?;
        Ok(Bytes::from(data))
    }

    async fn write(&self, path: &str, data: Bytes, _content_type: &str) -> AppResult<()> {
        let full_path = self.resolve(path)?;
        self.ensure_parent(&full_path).await?;

        // Write to a sibling temp file and rename so readers never see a partial blob.
        let tmp_path = full_path.with_extension(format!("{}.part", uuid::Uuid::new_v4()));
        fs::write(&tmp_path, &data).await.map_err(|e| {
            AppError::with_source(ErrorKind::Storage, format!("Failed to write blob: {path}"), e)
        })?;
        if let Err(e) = fs::rename(&tmp_path, &full_path).await {
            let _ = fs::remove_file(&tmp_path).await;
            return Err(AppError::with_source(
                ErrorKind::Storage,
                format!("Failed to commit blob: {path}"),
                e,
            ));
        }

        debug!(path, bytes = data.len(), "Wrote blob");
        Ok(())
    }

    async fn delete(&self, path: &str) -> AppResult<()> {
        let full_path = self.resolve(path)?;
        match fs::remove_file(&full_path).await {
            Ok(()) => {
                debug!(path, "Deleted blob");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(AppError::with_source(
                ErrorKind::Storage,
                format!("Failed to delete blob: {path}"),
                e,
            )),
        }
    }

    async fn exists(&self, path: &str) -> AppResult<bool> {
        let full_path = self.resolve(path)?;
        Ok(fs::try_exists(&full_path).await.unwrap_or(false))
    }
}

#[cfg(test)]
mod tests {
    use futures::TryStreamExt;

    use super::*;

    async fn provider() -> (tempfile::TempDir, LocalStorageProvider) {
        let dir = tempfile::tempdir().unwrap();
        let provider = LocalStorageProvider::new(dir.path().to_str().unwrap())
            .await
            .unwrap();
        (dir, provider)
    }

    #[tokio::test]
    async fn test_write_read_delete() {
        let (_dir, provider) = provider().await;

        let data = Bytes::from("hello world");
        provider
            .write("files/plan/1_1700000000000.txt", data.clone(), "text/plain")
            .await
            .unwrap();

        assert!(provider.exists("files/plan/1_1700000000000.txt").await.unwrap());

        let read_back = provider
            .read_bytes("files/plan/1_1700000000000.txt")
            .await
            .unwrap();
        assert_eq!(read_back, data);

        provider.delete("files/plan/1_1700000000000.txt").await.unwrap();
        assert!(!provider.exists("files/plan/1_1700000000000.txt").await.unwrap());
    }

    #[tokio::test]
    async fn test_read_streams_whole_blob() {
        let (_dir, provider) = provider().await;
        let data = Bytes::from(vec![7u8; 100_000]);
        provider
            .write("big.bin", data.clone(), "application/octet-stream")
            .await
            .unwrap();

        let chunks: Vec<Bytes> = provider.read("big.bin").await.unwrap().try_collect().await.unwrap();
        let total: usize = chunks.iter().map(Bytes::len).sum();
        assert_eq!(total, data.len());
    }

    #[tokio::test]
    async fn test_missing_blob_is_not_found() {
        let (_dir, provider) = provider().await;
        let err = provider.read_bytes("nope.pdf").await.unwrap_err();
        assert!(err.is_not_found());
        assert!(provider.read("nope.pdf").await.is_err());
    }

    #[tokio::test]
    async fn test_delete_missing_is_ok() {
        let (_dir, provider) = provider().await;
        provider.delete("files/never-written.pdf").await.unwrap();
    }

    #[tokio::test]
    async fn test_rejects_escaping_paths() {
        let (_dir, provider) = provider().await;
        for bad in ["../secret", "files/../../etc/passwd", "/etc/passwd", ""] {
            let err = provider
                .write(bad, Bytes::from("x"), "text/plain")
                .await
                .unwrap_err();
            assert_eq!(err.kind, ErrorKind::Validation, "path {bad:?}");
        }
    }

    #[tokio::test]
    async fn test_no_urls() {
        let (_dir, provider) = provider().await;
        assert!(provider.public_url("a.pdf").is_none());
        let url = provider
            .download_url("a.pdf", std::time::Duration::from_secs(60))
            .await
            .unwrap();
        assert!(url.is_none());
    }
}
