//! Preview and thumbnail configuration.

use serde::{Deserialize, Serialize};

/// Thumbnail generation settings for `GET /api/preview/{id}?size=`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreviewConfig {
    /// Largest edge length a client may request, in pixels.
    #[serde(default = "default_max_size")]
    pub max_thumbnail_size: u32,
    /// Maximum number of cached thumbnails.
    #[serde(default = "default_cache_capacity")]
    pub cache_capacity: u64,
    /// Thumbnail cache time-to-live in seconds.
    #[serde(default = "default_cache_ttl")]
    pub cache_ttl_seconds: u64,
}

impl Default for PreviewConfig {
    fn default() -> Self {
        Self {
            max_thumbnail_size: default_max_size(),
            cache_capacity: default_cache_capacity(),
            cache_ttl_seconds: default_cache_ttl(),
        }
    }
}

fn default_max_size() -> u32 {
    1024
}

fn default_cache_capacity() -> u64 {
    512
}

fn default_cache_ttl() -> u64 {
    600
}
