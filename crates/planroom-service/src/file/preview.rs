//! Thumbnail generation for raster images.

use std::io::Cursor;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use image::ImageFormat;
use moka::future::Cache;
use tracing::debug;

use planroom_core::config::PreviewConfig;
use planroom_core::error::{AppError, ErrorKind};
use planroom_core::result::AppResult;
use planroom_core::types::FileId;
use planroom_database::FileRecordStore;
use planroom_storage::StorageManager;

/// Smallest thumbnail edge.
pub const MIN_THUMBNAIL_SIZE: u32 = 16;
/// Edge used when the client does not ask for a size.
pub const DEFAULT_THUMBNAIL_SIZE: u32 = 256;

/// Generates and caches PNG thumbnails.
#[derive(Clone)]
pub struct PreviewService {
    /// Metadata store.
    store: Arc<dyn FileRecordStore>,
    /// Storage manager.
    storage: Arc<StorageManager>,
    /// Generated thumbnails keyed by file and edge size.
    cache: Cache<(FileId, u32), Bytes>,
    /// Largest edge a client may ask for.
    max_size: u32,
}

impl std::fmt::Debug for PreviewService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PreviewService")
            .field("max_size", &self.max_size)
            .field("cached", &self.cache.entry_count())
            .finish()
    }
}

impl PreviewService {
    /// Creates a new preview service.
    pub fn new(
        store: Arc<dyn FileRecordStore>,
        storage: Arc<StorageManager>,
        config: &PreviewConfig,
    ) -> Self {
        let cache = Cache::builder()
            .max_capacity(config.cache_capacity)
            .time_to_live(Duration::from_secs(config.cache_ttl_seconds))
            .build();
        Self {
            store,
            storage,
            cache,
            max_size: config.max_thumbnail_size.max(MIN_THUMBNAIL_SIZE),
        }
    }

    /// Clamp a requested edge size to the supported range.
    pub fn clamp_size(&self, requested: Option<u32>) -> u32 {
        requested
            .unwrap_or(DEFAULT_THUMBNAIL_SIZE)
            .clamp(MIN_THUMBNAIL_SIZE, self.max_size)
    }

    /// PNG thumbnail of a raster image, fitting within `size`x`size`.
    pub async fn thumbnail(&self, id: FileId, size: Option<u32>) -> AppResult<Bytes> {
        let size = self.clamp_size(size);

        // The record must still exist; cached entries outlive deletes.
        let record = self
            .store
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("File {id} not found")))?;
        if !record.is_raster_image() {
            return Err(AppError::validation(format!(
                "No thumbnail available for {}",
                record.content_type
            )));
        }
        if let Some(cached) = self.cache.get(&(id, size)).await {
            return Ok(cached);
        }

        let provider = self.storage.get(&record.storage_provider).await?;
        let source = provider.read_bytes(&record.storage_path).await?;

        let png = tokio::task::spawn_blocking(move || render_thumbnail(&source, size))
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Internal, "Thumbnail task failed", e))??;

        debug!(file_id = %id, size, bytes = png.len(), "Thumbnail generated");
        self.cache.insert((id, size), png.clone()).await;
        Ok(png)
    }
}

fn render_thumbnail(source: &[u8], size: u32) -> AppResult<Bytes> {
    let image = image::load_from_memory(source).map_err(|e| {
        AppError::with_source(ErrorKind::Validation, "Image could not be decoded", e)
    })?;
    let thumb = image.thumbnail(size, size);

    let mut out = Cursor::new(Vec::new());
    thumb
        .write_to(&mut out, ImageFormat::Png)
        .map_err(|e| AppError::with_source(ErrorKind::Internal, "Failed to encode thumbnail", e))?;
    Ok(Bytes::from(out.into_inner()))
}

#[cfg(test)]
mod tests {
    use image::{ImageBuffer, Rgb};

    use super::*;
    use crate::file::UploadParams;
    use crate::file::test_support::Fixture;

    fn png(width: u32, height: u32) -> Bytes {
        let img = ImageBuffer::from_fn(width, height, |x, _| Rgb([(x % 255) as u8, 80, 160]));
        let mut out = Cursor::new(Vec::new());
        img.write_to(&mut out, ImageFormat::Png).unwrap();
        Bytes::from(out.into_inner())
    }

    async fn upload(fx: &Fixture, name: &str, content_type: &str, data: Bytes) -> FileId {
        fx.uploads
            .upload(UploadParams {
                file_name: name.to_string(),
                content_type: Some(content_type.to_string()),
                data,
                description: String::new(),
                tags: vec![],
                uploaded_by: None,
            })
            .await
            .unwrap()
            .record
            .id
    }

    #[tokio::test]
    async fn test_thumbnail_fits_requested_size() {
        let fx = Fixture::new().await;
        let id = upload(&fx, "site.png", "image/png", png(400, 200)).await;

        let thumb = fx.previews.thumbnail(id, Some(100)).await.unwrap();
        let decoded = image::load_from_memory(&thumb).unwrap();
        assert_eq!(decoded.width(), 100);
        assert_eq!(decoded.height(), 50);

        let again = fx.previews.thumbnail(id, Some(100)).await.unwrap();
        assert_eq!(thumb, again);
    }

    #[tokio::test]
    async fn test_deleted_file_has_no_thumbnail() {
        let fx = Fixture::new().await;
        let id = upload(&fx, "site.png", "image/png", png(64, 64)).await;
        fx.previews.thumbnail(id, Some(32)).await.unwrap();

        fx.files.delete(id, false).await.unwrap();

        let err = fx.previews.thumbnail(id, Some(32)).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_size_is_clamped() {
        let fx = Fixture::new().await;
        assert_eq!(fx.previews.clamp_size(None), DEFAULT_THUMBNAIL_SIZE);
        assert_eq!(fx.previews.clamp_size(Some(1)), MIN_THUMBNAIL_SIZE);
        assert_eq!(fx.previews.clamp_size(Some(100_000)), 1024);
    }

    #[tokio::test]
    async fn test_non_image_is_rejected() {
        let fx = Fixture::new().await;
        let id = upload(&fx, "A-101.pdf", "application/pdf", Bytes::from_static(b"%PDF")).await;
        let err = fx.previews.thumbnail(id, None).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Validation);
    }

    #[tokio::test]
    async fn test_corrupt_image_is_rejected() {
        let fx = Fixture::new().await;
        let id = upload(&fx, "broken.png", "image/png", Bytes::from_static(b"garbage")).await;
        let err = fx.previews.thumbnail(id, None).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Validation);
    }
}
