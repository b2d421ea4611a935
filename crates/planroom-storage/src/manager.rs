//! Storage manager: routes operations to the provider that holds a blob.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::info;

use planroom_core::config::StorageConfig;
use planroom_core::error::AppError;
use planroom_core::result::AppResult;
use planroom_core::traits::storage::StorageProvider;

use crate::providers::MemoryStorageProvider;

/// Central storage manager that holds references to all registered providers.
#[derive(Debug, Clone)]
pub struct StorageManager {
    /// Map of provider name → provider instance.
    providers: Arc<RwLock<HashMap<String, Arc<dyn StorageProvider>>>>,
    /// Provider new uploads are written to.
    default_name: Arc<RwLock<Option<String>>>,
}

impl StorageManager {
    /// Create a new empty storage manager.
    pub fn new() -> Self {
        Self {
            providers: Arc::new(RwLock::new(HashMap::new())),
            default_name: Arc::new(RwLock::new(None)),
        }
    }

    /// Build a manager with every provider enabled in configuration.
    ///
    /// The local provider is always registered so records written to disk
    /// stay readable after the default provider changes.
    pub async fn from_config(config: &StorageConfig) -> AppResult<Self> {
        let manager = Self::new();

        #[cfg(feature = "local")]
        {
            let local =
                crate::providers::LocalStorageProvider::new(&config.local.root_path).await?;
            manager.register("local", Arc::new(local), false).await;
        }

        if config.default_provider == "memory" {
            manager
                .register("memory", Arc::new(MemoryStorageProvider::new()), false)
                .await;
        }

        #[cfg(feature = "supabase")]
        if config.supabase.enabled {
            let supabase = crate::providers::SupabaseStorageProvider::new(&config.supabase)?;
            manager.register("supabase", Arc::new(supabase), false).await;
        }

        #[cfg(feature = "firebase")]
        if config.firebase.enabled {
            let firebase = crate::providers::FirebaseStorageProvider::new(&config.firebase).await?;
            manager.register("firebase", Arc::new(firebase), false).await;
        }

        manager.set_default(&config.default_provider).await?;
        info!(
            default = %config.default_provider,
            providers = ?manager.names().await,
            "Storage providers registered"
        );
        Ok(manager)
    }

    /// Register a storage provider under a name.
    pub async fn register(&self, name: &str, provider: Arc<dyn StorageProvider>, is_default: bool) {
        let mut providers = self.providers.write().await;
        providers.insert(name.to_string(), provider);
        if is_default {
            let mut default = self.default_name.write().await;
            *default = Some(name.to_string());
        }
    }

    /// Make an already registered provider the default.
    pub async fn set_default(&self, name: &str) -> AppResult<()> {
        if !self.providers.read().await.contains_key(name) {
            return Err(AppError::configuration(format!(
                "Default storage provider '{name}' is not enabled"
            )));
        }
        *self.default_name.write().await = Some(name.to_string());
        Ok(())
    }

    /// Get a provider by name.
    pub async fn get(&self, name: &str) -> AppResult<Arc<dyn StorageProvider>> {
        let providers = self.providers.read().await;
        providers.get(name).cloned().ok_or_else(|| {
            AppError::service_unavailable(format!("Storage provider '{name}' is not configured"))
        })
    }

    /// Get the default storage provider and its name.
    pub async fn get_default(&self) -> AppResult<(String, Arc<dyn StorageProvider>)> {
        let default_name = {
            let default = self.default_name.read().await;
            default
                .clone()
                .ok_or_else(|| AppError::configuration("No default storage configured"))?
        };
        let provider = self.get(&default_name).await?;
        Ok((default_name, provider))
    }

    /// List all registered provider names, sorted.
    pub async fn names(&self) -> Vec<String> {
        let providers = self.providers.read().await;
        let mut names: Vec<String> = providers.keys().cloned().collect();
        names.sort();
        names
    }

    /// Check health of all registered providers.
    pub async fn health_check_all(&self) -> HashMap<String, bool> {
        let providers: Vec<(String, Arc<dyn StorageProvider>)> = {
            let providers = self.providers.read().await;
            providers
                .iter()
                .map(|(name, p)| (name.clone(), p.clone()))
                .collect()
        };
        let mut results = HashMap::new();
        for (name, provider) in providers {
            let healthy = provider.health_check().await.unwrap_or(false);
            results.insert(name, healthy);
        }
        results
    }
}

impl Default for StorageManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_register_and_default() {
        let manager = StorageManager::new();
        assert!(manager.get_default().await.is_err());

        manager
            .register("memory", Arc::new(MemoryStorageProvider::new()), true)
            .await;
        let (name, provider) = manager.get_default().await.unwrap();
        assert_eq!(name, "memory");
        assert_eq!(provider.provider_type(), "memory");
        assert!(manager.get("supabase").await.is_err());
    }

    #[tokio::test]
    async fn test_from_config_memory_default() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = StorageConfig::default();
        config.default_provider = "memory".to_string();
        config.local.root_path = dir.path().join("blobs").to_string_lossy().to_string();

        let manager = StorageManager::from_config(&config).await.unwrap();
        assert_eq!(manager.get_default().await.unwrap().0, "memory");
        assert!(manager.names().await.contains(&"local".to_string()));

        let health = manager.health_check_all().await;
        assert_eq!(health.get("memory"), Some(&true));
        assert_eq!(health.get("local"), Some(&true));
    }

    #[tokio::test]
    async fn test_from_config_rejects_disabled_default() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = StorageConfig::default();
        config.default_provider = "supabase".to_string();
        config.local.root_path = dir.path().to_string_lossy().to_string();

        let err = StorageManager::from_config(&config).await.unwrap_err();
        assert_eq!(err.kind, planroom_core::error::ErrorKind::Configuration);
    }
}
