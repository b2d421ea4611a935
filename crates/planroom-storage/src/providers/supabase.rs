//! Supabase Storage provider (REST API).

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::Deserialize;
use tracing::{debug, warn};

use planroom_core::config::SupabaseStorageConfig;
use planroom_core::error::{AppError, ErrorKind};
use planroom_core::result::AppResult;
use planroom_core::traits::storage::{ByteStream, StorageProvider};

use super::{encode_key_path, response_stream, status_error, transport_error};

const PROVIDER: &str = "supabase";

/// Storage provider backed by a Supabase Storage bucket.
pub struct SupabaseStorageProvider {
    client: Client,
    base_url: String,
    api_key: String,
    bucket: String,
    public_bucket: bool,
}

impl std::fmt::Debug for SupabaseStorageProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SupabaseStorageProvider")
            .field("base_url", &self.base_url)
            .field("bucket", &self.bucket)
            .field("public_bucket", &self.public_bucket)
            .finish()
    }
}

#[derive(Debug, Deserialize)]
struct SignedUrlResponse {
    #[serde(rename = "signedURL")]
    signed_url: String,
}

impl SupabaseStorageProvider {
    /// Create a provider from configuration.
    pub fn new(config: &SupabaseStorageConfig) -> AppResult<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| {
                AppError::with_source(ErrorKind::Configuration, "Failed to build HTTP client", e)
            })?;

        Ok(Self {
            client,
            base_url: config.url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            bucket: config.bucket.clone(),
            public_bucket: config.public_bucket,
        })
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
    }

    fn object_url(&self, key: &str) -> String {
        format!(
            "{}/storage/v1/object/{}/{}",
            self.base_url,
            self.bucket,
            encode_key_path(key)
        )
    }

    fn sign_url(&self, key: &str) -> String {
        format!(
            "{}/storage/v1/object/sign/{}/{}",
            self.base_url,
            self.bucket,
            encode_key_path(key)
        )
    }

    /// Turn the relative `signedURL` returned by the API into an absolute URL.
    fn absolute_signed_url(&self, signed: &str) -> String {
        if signed.starts_with("http://") || signed.starts_with("https://") {
            return signed.to_string();
        }
        let path = if signed.starts_with('/') {
            signed.to_string()
        } else {
            format!("/{signed}")
        };
        format!("{}/storage/v1{}", self.base_url, path)
    }
}

#[async_trait]
impl StorageProvider for SupabaseStorageProvider {
    fn provider_type(&self) -> &str {
        PROVIDER
    }

    async fn health_check(&self) -> AppResult<bool> {
        let url = format!("{}/storage/v1/bucket/{}", self.base_url, self.bucket);
        let response = self
            .authorized(self.client.get(url))
            .send()
            .await
            .map_err(|e| transport_error(PROVIDER, e))?;
        Ok(response.status().is_success())
    }

    async fn read(&self, path: &str) -> AppResult<ByteStream> {
        let response = self
            .authorized(self.client.get(self.object_url(path)))
            .send()
            .await
            .map_err(|e| transport_error(PROVIDER, e))?;
        if !response.status().is_success() {
            return Err(status_error(PROVIDER, "download", path, response).await);
        }
        Ok(response_stream(response))
    }

    async fn read_bytes(&self, path: &str) -> AppResult<Bytes> {
        let response = self
            .authorized(self.client.get(self.object_url(path)))
            .send()
            .await
            .map_err(|e| transport_error(PROVIDER, e))?;
        if !response.status().is_success() {
            return Err(status_error(PROVIDER, "download", path, response).await);
        }
        response.bytes().await.map_err(|e| transport_error(PROVIDER, e))
    }

    async fn write(&self, path: &str, data: Bytes, content_type: &str) -> AppResult<()> {
        let size = data.len();
        let response = self
            .authorized(self.client.post(self.object_url(path)))
            .header(CONTENT_TYPE, content_type)
            .header("x-upsert", "false")
            .header("cache-control", "max-age=3600")
            .body(data)
            .send()
            .await
            .map_err(|e| transport_error(PROVIDER, e))?;
        if !response.status().is_success() {
            return Err(status_error(PROVIDER, "upload", path, response).await);
        }
        debug!(path, bytes = size, bucket = %self.bucket, "Uploaded blob to Supabase");
        Ok(())
    }

    async fn delete(&self, path: &str) -> AppResult<()> {
        let url = format!("{}/storage/v1/object/{}", self.base_url, self.bucket);
        let response = self
            .authorized(self.client.delete(url))
            .json(&serde_json::json!({ "prefixes": [path] }))
            .send()
            .await
            .map_err(|e| transport_error(PROVIDER, e))?;
        match response.status() {
            s if s.is_success() => Ok(()),
            StatusCode::NOT_FOUND => Ok(()),
            _ => Err(status_error(PROVIDER, "delete", path, response).await),
        }
    }

    async fn exists(&self, path: &str) -> AppResult<bool> {
        let response = self
            .authorized(self.client.head(self.object_url(path)))
            .send()
            .await
            .map_err(|e| transport_error(PROVIDER, e))?;
        let status = response.status();
        if status.is_success() {
            return Ok(true);
        }
        // Missing objects come back as 400 or 404 depending on the API version.
        if status == StatusCode::NOT_FOUND || status == StatusCode::BAD_REQUEST {
            return Ok(false);
        }
        Err(status_error(PROVIDER, "stat", path, response).await)
    }

    fn public_url(&self, path: &str) -> Option<String> {
        self.public_bucket.then(|| {
            format!(
                "{}/storage/v1/object/public/{}/{}",
                self.base_url,
                self.bucket,
                encode_key_path(path)
            )
        })
    }

    async fn download_url(&self, path: &str, ttl: Duration) -> AppResult<Option<String>> {
        let response = self
            .authorized(self.client.post(self.sign_url(path)))
            .json(&serde_json::json!({ "expiresIn": ttl.as_secs().max(1) }))
            .send()
            .await
            .map_err(|e| transport_error(PROVIDER, e))?;
        if !response.status().is_success() {
            let err = status_error(PROVIDER, "sign", path, response).await;
            if let Some(public) = self.public_url(path) {
                warn!(path, error = %err, "Signing failed; falling back to public URL");
                return Ok(Some(public));
            }
            return Err(err);
        }
        let signed: SignedUrlResponse = response
            .json()
            .await
            .map_err(|e| transport_error(PROVIDER, e))?;
        Ok(Some(self.absolute_signed_url(&signed.signed_url)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider(public: bool) -> SupabaseStorageProvider {
        SupabaseStorageProvider::new(&SupabaseStorageConfig {
            enabled: true,
            url: "https://demo.supabase.co/".to_string(),
            api_key: "service-key".to_string(),
            bucket: "construction-files".to_string(),
            public_bucket: public,
        })
        .unwrap()
    }

    #[test]
    fn test_object_url_encodes_segments() {
        let p = provider(false);
        assert_eq!(
            p.object_url("files/Site Plan/abc_1.pdf"),
            "https://demo.supabase.co/storage/v1/object/construction-files/files/Site%20Plan/abc_1.pdf"
        );
    }

    #[test]
    fn test_public_url_only_for_public_bucket() {
        assert!(provider(false).public_url("files/a.pdf").is_none());
        assert_eq!(
            provider(true).public_url("files/a.pdf").as_deref(),
            Some("https://demo.supabase.co/storage/v1/object/public/construction-files/files/a.pdf")
        );
    }

    #[test]
    fn test_signed_url_is_made_absolute() {
        let p = provider(false);
        assert_eq!(
            p.absolute_signed_url("/object/sign/construction-files/files/a.pdf?token=t"),
            "https://demo.supabase.co/storage/v1/object/sign/construction-files/files/a.pdf?token=t"
        );
        assert_eq!(
            p.absolute_signed_url("https://cdn.example.com/a.pdf?token=t"),
            "https://cdn.example.com/a.pdf?token=t"
        );
    }

    #[test]
    fn test_debug_hides_key() {
        let rendered = format!("{:?}", provider(false));
        assert!(!rendered.contains("service-key"));
    }
}
