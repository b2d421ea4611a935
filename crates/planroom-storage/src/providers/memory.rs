//! In-memory storage provider, for development and tests.

use async_trait::async_trait;
use bytes::Bytes;
use dashmap::DashMap;
use tracing::debug;

use planroom_core::error::AppError;
use planroom_core::result::AppResult;
use planroom_core::traits::storage::{ByteStream, StorageProvider};

/// Storage provider that keeps blobs in a concurrent map.
#[derive(Debug, Default)]
pub struct MemoryStorageProvider {
    blobs: DashMap<String, Bytes>,
}

impl MemoryStorageProvider {
    /// Create an empty provider.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored blobs.
    pub fn len(&self) -> usize {
        self.blobs.len()
    }

    /// Whether no blobs are stored.
    pub fn is_empty(&self) -> bool {
        self.blobs.is_empty()
    }
}

#[async_trait]
impl StorageProvider for MemoryStorageProvider {
    fn provider_type(&self) -> &str {
        "memory"
    }

    async fn health_check(&self) -> AppResult<bool> {
        Ok(true)
    }

    async fn read(&self, path: &str) -> AppResult<ByteStream> {
        let data = self.read_bytes(path).await?;
        Ok(Box::pin(futures::stream::once(async move {
            Ok::<_, std::io::Error>(data)
        })))
    }

    async fn read_bytes(&self, path: &str) -> AppResult<Bytes> {
        self.blobs
            .get(path)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| AppError::not_found(format!("Blob not found: {path}")))
    }

    async fn write(&self, path: &str, data: Bytes, _content_type: &str) -> AppResult<()> {
        debug!(path, bytes = data.len(), "Stored blob in memory");
        self.blobs.insert(path.to_string(), data);
        Ok(())
    }

    async fn delete(&self, path: &str) -> AppResult<()> {
        self.blobs.remove(path);
        Ok(())
    }

    async fn exists(&self, path: &str) -> AppResult<bool> {
        Ok(self.blobs.contains_key(path))
    }
}

#[cfg(test)]
mod tests {
    use futures::TryStreamExt;

    use super::*;

    #[tokio::test]
    async fn test_round_trip_and_delete() {
        let provider = MemoryStorageProvider::new();
        provider
            .write("files/a/1.pdf", Bytes::from_static(b"%PDF"), "application/pdf")
            .await
            .unwrap();
        assert_eq!(provider.len(), 1);

        let streamed: Vec<Bytes> = provider
            .read("files/a/1.pdf")
            .await
            .unwrap()
            .try_collect()
            .await
            .unwrap();
        assert_eq!(streamed, vec![Bytes::from_static(b"%PDF")]);

        provider.delete("files/a/1.pdf").await.unwrap();
        provider.delete("files/a/1.pdf").await.unwrap();
        assert!(provider.is_empty());
        assert!(provider.read_bytes("files/a/1.pdf").await.unwrap_err().is_not_found());
    }
}
