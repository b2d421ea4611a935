//! Storage provider trait for pluggable blob storage backends.

use std::pin::Pin;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;

use crate::result::AppResult;

/// A byte stream type used for reading file contents.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, std::io::Error>> + Send>>;

/// Trait for blob storage backends.
///
/// Implementations exist for the local filesystem, process memory,
/// Supabase Storage, and Firebase Storage. The trait is defined here
/// in `planroom-core` and implemented in `planroom-storage`.
///
/// Paths are provider-relative keys using `/` as separator, as produced
/// by the upload service (`files/{base}/{id}_{millis}.ext`).
#[async_trait]
pub trait StorageProvider: Send + Sync + std::fmt::Debug + 'static {
    /// Return the provider type name (e.g., "local", "supabase").
    fn provider_type(&self) -> &str;

    /// Check whether the provider is healthy and reachable.
    async fn health_check(&self) -> AppResult<bool>;

    /// Read a blob and return its byte stream.
    async fn read(&self, path: &str) -> AppResult<ByteStream>;

    /// Read a blob into memory.
    async fn read_bytes(&self, path: &str) -> AppResult<Bytes>;

    /// Write bytes to the given path. Existing objects are not overwritten
    /// by remote providers; keys are unique per upload.
    async fn write(&self, path: &str, data: Bytes, content_type: &str) -> AppResult<()>;

    /// Delete the blob at the given path. Deleting a missing blob succeeds.
    async fn delete(&self, path: &str) -> AppResult<()>;

    /// Check whether a blob exists at the given path.
    async fn exists(&self, path: &str) -> AppResult<bool>;

    /// Permanent public URL, if the backend serves objects publicly.
    fn public_url(&self, _path: &str) -> Option<String> {
        None
    }

    /// A URL the client can fetch the blob from directly, valid for at
    /// least `ttl` when the backend signs URLs. `None` means the bytes
    /// must be proxied through the API.
    async fn download_url(&self, path: &str, _ttl: Duration) -> AppResult<Option<String>> {
        Ok(self.public_url(path))
    }
}
