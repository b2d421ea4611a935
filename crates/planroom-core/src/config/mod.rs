//! Application configuration schemas.
//!
//! All configuration structs are deserialized from TOML files via the
//! `config` crate. Each sub-module represents a logical configuration
//! section. Every section carries serde defaults so the server can start
//! with no configuration files at all.

pub mod app;
pub mod database;
pub mod logging;
pub mod preview;
pub mod storage;

use serde::{Deserialize, Serialize};

pub use self::app::{CorsConfig, ServerConfig};
pub use self::database::{DatabaseConfig, MetadataBackend, MetadataConfig};
pub use self::logging::LoggingConfig;
pub use self::preview::PreviewConfig;
pub use self::storage::{
    FirebaseStorageConfig, LocalStorageConfig, StorageConfig, SupabaseStorageConfig,
};

use crate::error::AppError;

/// Prefix for environment variable overrides (`PLANROOM__SERVER__PORT=9000`).
pub const ENV_PREFIX: &str = "PLANROOM";

/// Root application configuration.
///
/// This struct is the top-level deserialization target for the merged
/// TOML configuration files (default.toml + environment overlay).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// HTTP server settings.
    pub server: ServerConfig,
    /// Which metadata store backs file records.
    pub metadata: MetadataConfig,
    /// Database connection settings (used by the `postgres` metadata backend).
    pub database: DatabaseConfig,
    /// Blob storage and upload policy settings.
    pub storage: StorageConfig,
    /// Thumbnail generation settings.
    pub preview: PreviewConfig,
    /// Logging settings.
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration from TOML files.
    ///
    /// Merges the default configuration with an environment-specific overlay
    /// and environment variables prefixed with `PLANROOM__`.
    pub fn load(env: &str) -> Result<Self, AppError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{env}")).required(false))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| AppError::configuration(format!("Failed to build config: {e}")))?;

        let loaded: Self = config
            .try_deserialize()
            .map_err(|e| AppError::configuration(format!("Failed to deserialize config: {e}")))?;

        loaded.validate()?;
        Ok(loaded)
    }

    /// Check cross-section consistency that serde defaults cannot express.
    pub fn validate(&self) -> Result<(), AppError> {
        if self.metadata.backend == MetadataBackend::Postgres && self.database.url.is_empty() {
            return Err(AppError::configuration(
                "database.url is required when metadata.backend = \"postgres\"",
            ));
        }
        if self.storage.max_upload_size_bytes == 0 {
            return Err(AppError::configuration(
                "storage.max_upload_size_bytes must be greater than zero",
            ));
        }
        if self.storage.supabase.enabled
            && (self.storage.supabase.url.is_empty() || self.storage.supabase.api_key.is_empty())
        {
            return Err(AppError::configuration(
                "storage.supabase requires url and api_key when enabled",
            ));
        }
        if self.storage.firebase.enabled && self.storage.firebase.bucket.is_empty() {
            return Err(AppError::configuration(
                "storage.firebase.bucket is required when enabled",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_usable_without_files() {
        let config: AppConfig = serde_json::from_str("{}").expect("defaults");
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.metadata.backend, MetadataBackend::Memory);
        assert_eq!(config.storage.default_provider, "local");
        assert_eq!(config.storage.max_upload_size_bytes, 500 * 1024 * 1024);
        assert_eq!(config.storage.supabase.bucket, "construction-files");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_postgres_backend_requires_url() {
        let mut config = AppConfig::default();
        config.metadata.backend = MetadataBackend::Postgres;
        assert!(config.validate().is_err());

        config.database.url = "postgres://planroom@localhost/planroom".to_string();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_section_keeps_other_defaults() {
        let config: AppConfig =
            serde_json::from_str(r#"{"storage": {"default_provider": "memory"}}"#)
                .expect("partial");
        assert_eq!(config.storage.default_provider, "memory");
        assert!(config.storage.allowed_extensions.contains(&".dwg".to_string()));
        assert_eq!(config.storage.signed_url_ttl_seconds, 3600);
    }

    #[test]
    fn test_enabled_supabase_needs_credentials() {
        let mut config = AppConfig::default();
        config.storage.supabase.enabled = true;
        assert!(config.validate().is_err());
    }
}
