//! File download service: streams blobs or hands out provider URLs.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tracing::debug;

use planroom_core::config::StorageConfig;
use planroom_core::error::AppError;
use planroom_core::result::AppResult;
use planroom_core::traits::storage::ByteStream;
use planroom_core::types::FileId;
use planroom_database::FileRecordStore;
use planroom_entity::file::FileRecord;
use planroom_storage::StorageManager;

/// How the browser should treat the response body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Save as a file.
    Attachment,
    /// Display in the browser.
    Inline,
}

/// Types a browser may render inline. Everything else is sent as an attachment.
pub const INLINE_TYPES: &[&str] = &[
    "application/pdf",
    "image/jpeg",
    "image/png",
    "image/gif",
    "image/webp",
    "text/plain",
];

impl Disposition {
    /// The disposition actually used for a stored content type.
    pub fn for_content_type(self, content_type: &str) -> Self {
        match self {
            Self::Inline if INLINE_TYPES.contains(&content_type) => Self::Inline,
            _ => Self::Attachment,
        }
    }

    /// Header keyword.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Attachment => "attachment",
            Self::Inline => "inline",
        }
    }
}

/// What the handler should send back.
pub enum DownloadTarget {
    /// Redirect the client to a provider URL.
    Redirect(String),
    /// Proxy the blob through the API.
    Stream {
        /// Blob contents.
        stream: ByteStream,
        /// MIME type for Content-Type.
        content_type: String,
        /// Suggested filename for Content-Disposition.
        filename: String,
        /// Content length.
        size: i64,
        /// Disposition after the inline check.
        disposition: Disposition,
    },
}

impl std::fmt::Debug for DownloadTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Redirect(url) => f.debug_tuple("Redirect").field(url).finish(),
            Self::Stream {
                content_type,
                filename,
                size,
                disposition,
                ..
            } => f
                .debug_struct("Stream")
                .field("content_type", content_type)
                .field("filename", filename)
                .field("size", size)
                .field("disposition", disposition)
                .finish(),
        }
    }
}

/// A URL the client can fetch a file from.
#[derive(Debug, Clone, Serialize)]
pub struct DownloadLink {
    /// Absolute provider URL, or the API download path.
    pub url: String,
    /// Lifetime of a signed URL; `None` for permanent URLs.
    pub expires_in_seconds: Option<u64>,
}

/// Handles file downloads and link generation.
#[derive(Clone)]
pub struct DownloadService {
    /// Metadata store.
    store: Arc<dyn FileRecordStore>,
    /// Storage manager.
    storage: Arc<StorageManager>,
    /// Signed URL lifetime.
    url_ttl: Duration,
    /// Redirect to provider URLs instead of proxying.
    redirect: bool,
}

impl std::fmt::Debug for DownloadService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DownloadService")
            .field("redirect", &self.redirect)
            .finish()
    }
}

impl DownloadService {
    /// Creates a new download service.
    pub fn new(
        store: Arc<dyn FileRecordStore>,
        storage: Arc<StorageManager>,
        config: &StorageConfig,
    ) -> Self {
        Self {
            store,
            storage,
            url_ttl: Duration::from_secs(config.signed_url_ttl_seconds),
            redirect: config.redirect_downloads,
        }
    }

    async fn record(&self, id: FileId) -> AppResult<FileRecord> {
        self.store
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("File {id} not found")))
    }

    /// Open a file for download or inline preview.
    pub async fn open(&self, id: FileId, disposition: Disposition) -> AppResult<DownloadTarget> {
        let record = self.record(id).await?;
        let provider = self.storage.get(&record.storage_provider).await?;

        if self.redirect {
            if let Some(url) = provider
                .download_url(&record.storage_path, self.url_ttl)
                .await?
            {
                debug!(file_id = %id, "Redirecting download to provider URL");
                return Ok(DownloadTarget::Redirect(url));
            }
        }

        let stream = provider.read(&record.storage_path).await?;
        let disposition = disposition.for_content_type(&record.content_type);
        debug!(
            file_id = %id,
            disposition = disposition.as_str(),
            size = record.size_bytes,
            "Streaming file"
        );
        Ok(DownloadTarget::Stream {
            stream,
            content_type: record.content_type,
            filename: record.original_name,
            size: record.size_bytes,
            disposition,
        })
    }

    /// A URL the client can fetch the file from. Providers that cannot
    /// issue URLs fall back to the API download path.
    pub async fn link(&self, id: FileId) -> AppResult<DownloadLink> {
        let record = self.record(id).await?;
        let provider = self.storage.get(&record.storage_provider).await?;

        if let Some(url) = provider
            .download_url(&record.storage_path, self.url_ttl)
            .await?
        {
            let permanent = provider.public_url(&record.storage_path).as_deref() == Some(url.as_str());
            return Ok(DownloadLink {
                url,
                expires_in_seconds: (!permanent).then_some(self.url_ttl.as_secs()),
            });
        }

        Ok(DownloadLink {
            url: api_download_path(id),
            expires_in_seconds: None,
        })
    }
}

/// API path that proxies a file's bytes.
pub fn api_download_path(id: FileId) -> String {
    format!("/api/download/{id}")
}
