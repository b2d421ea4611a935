//! Firebase Storage provider.
//!
//! Firebase Storage buckets are Google Cloud Storage buckets, so this
//! provider talks to the GCS JSON API. Objects get a
//! `firebaseStorageDownloadTokens` metadata entry so the Firebase download
//! endpoint can serve them without credentials.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use bytes::Bytes;
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use planroom_core::config::FirebaseStorageConfig;
use planroom_core::error::{AppError, ErrorKind};
use planroom_core::result::AppResult;
use planroom_core::traits::storage::{ByteStream, StorageProvider};

use super::{encode_key_path, response_stream, status_error, transport_error};

const PROVIDER: &str = "firebase";
const STORAGE_SCOPE: &str = "https://www.googleapis.com/auth/devstorage.read_write";
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const DOWNLOAD_TOKEN_KEY: &str = "firebaseStorageDownloadTokens";
/// Refresh cached access tokens this long before they expire.
const TOKEN_REFRESH_MARGIN: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, Deserialize)]
struct ServiceAccountKey {
    client_email: String,
    private_key: String,
    #[serde(default = "default_token_uri")]
    token_uri: String,
}

fn default_token_uri() -> String {
    "https://oauth2.googleapis.com/token".to_string()
}

#[derive(Debug, Serialize)]
struct TokenClaims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_expires_in")]
    expires_in: u64,
}

fn default_expires_in() -> u64 {
    3600
}

#[derive(Debug, Default, Deserialize)]
struct ObjectResource {
    #[serde(default)]
    metadata: HashMap<String, String>,
}

enum Credentials {
    /// No authorization header (storage emulator).
    Anonymous,
    /// Pre-issued OAuth access token.
    Static(String),
    /// Service-account key exchanged for short-lived access tokens.
    ServiceAccount(ServiceAccountKey),
}

struct CachedToken {
    value: String,
    expires_at: Instant,
}

/// Storage provider backed by a Firebase Storage bucket.
pub struct FirebaseStorageProvider {
    client: Client,
    bucket: String,
    api_base: String,
    download_base: String,
    make_public: bool,
    credentials: Credentials,
    token: Mutex<Option<CachedToken>>,
}

impl std::fmt::Debug for FirebaseStorageProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let auth = match &self.credentials {
            Credentials::Anonymous => "anonymous",
            Credentials::Static(_) => "access_token",
            Credentials::ServiceAccount(_) => "service_account",
        };
        f.debug_struct("FirebaseStorageProvider")
            .field("bucket", &self.bucket)
            .field("api_base", &self.api_base)
            .field("make_public", &self.make_public)
            .field("auth", &auth)
            .finish()
    }
}

impl FirebaseStorageProvider {
    /// Create a provider from configuration, loading the service-account key if set.
    pub async fn new(config: &FirebaseStorageConfig) -> AppResult<Self> {
        let credentials = if !config.service_account_path.is_empty() {
            let raw = tokio::fs::read_to_string(&config.service_account_path)
                .await
                .map_err(|e| {
                    AppError::with_source(
                        ErrorKind::Configuration,
                        format!(
                            "Failed to read service account key: {}",
                            config.service_account_path
                        ),
                        e,
                    )
                })?;
            let key: ServiceAccountKey = serde_json::from_str(&raw).map_err(|e| {
                AppError::with_source(ErrorKind::Configuration, "Invalid service account key", e)
            })?;
            info!(client_email = %key.client_email, "Using Firebase service account");
            Credentials::ServiceAccount(key)
        } else if !config.access_token.is_empty() {
            Credentials::Static(config.access_token.clone())
        } else {
            Credentials::Anonymous
        };

        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| {
                AppError::with_source(ErrorKind::Configuration, "Failed to build HTTP client", e)
            })?;

        Ok(Self {
            client,
            bucket: config.bucket.clone(),
            api_base: config.api_base.trim_end_matches('/').to_string(),
            download_base: config.download_base.trim_end_matches('/').to_string(),
            make_public: config.make_public,
            credentials,
            token: Mutex::new(None),
        })
    }

    fn object_url(&self, key: &str) -> String {
        format!(
            "{}/storage/v1/b/{}/o/{}",
            self.api_base,
            self.bucket,
            urlencoding::encode(key)
        )
    }

    fn upload_url(&self, key: &str) -> String {
        let mut url = format!(
            "{}/upload/storage/v1/b/{}/o?uploadType=media&name={}",
            self.api_base,
            self.bucket,
            urlencoding::encode(key)
        );
        if self.make_public {
            url.push_str("&predefinedAcl=publicRead");
        }
        url
    }

    fn token_download_url(&self, key: &str, token: &str) -> String {
        format!(
            "{}/v0/b/{}/o/{}?alt=media&token={}",
            self.download_base,
            self.bucket,
            urlencoding::encode(key),
            urlencoding::encode(token)
        )
    }

    async fn access_token(&self) -> AppResult<Option<String>> {
        let key = match &self.credentials {
            Credentials::Anonymous => return Ok(None),
            Credentials::Static(token) => return Ok(Some(token.clone())),
            Credentials::ServiceAccount(key) => key,
        };

        let mut cached = self.token.lock().await;
        if let Some(token) = cached.as_ref() {
            if token.expires_at > Instant::now() + TOKEN_REFRESH_MARGIN {
                return Ok(Some(token.value.clone()));
            }
        }

        let fresh = self.exchange_service_account(key).await?;
        let value = fresh.value.clone();
        *cached = Some(fresh);
        Ok(Some(value))
    }

    async fn exchange_service_account(&self, key: &ServiceAccountKey) -> AppResult<CachedToken> {
        let now = chrono::Utc::now().timestamp();
        let claims = TokenClaims {
            iss: &key.client_email,
            scope: STORAGE_SCOPE,
            aud: &key.token_uri,
            iat: now,
            exp: now + 3600,
        };
        let signing_key = EncodingKey::from_rsa_pem(key.private_key.as_bytes()).map_err(|e| {
            AppError::with_source(ErrorKind::Configuration, "Invalid service account private key", e)
        })?;
        let assertion = jsonwebtoken::encode(&Header::new(Algorithm::RS256), &claims, &signing_key)
            .map_err(|e| {
                AppError::with_source(ErrorKind::Internal, "Failed to sign token request", e)
            })?;

        let form = format!(
            "grant_type={}&assertion={}",
            urlencoding::encode(JWT_BEARER_GRANT),
            urlencoding::encode(&assertion)
        );
        let response = self
            .client
            .post(&key.token_uri)
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(form)
            .send()
            .await
            .map_err(|e| transport_error(PROVIDER, e))?;
        if !response.status().is_success() {
            return Err(status_error(PROVIDER, "token exchange", &key.token_uri, response).await);
        }
        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| transport_error(PROVIDER, e))?;

        debug!(expires_in = token.expires_in, "Obtained Firebase access token");
        Ok(CachedToken {
            value: token.access_token,
            expires_at: Instant::now() + Duration::from_secs(token.expires_in),
        })
    }

    async fn authorized(&self, request: RequestBuilder) -> AppResult<RequestBuilder> {
        Ok(match self.access_token().await? {
            Some(token) => request.bearer_auth(token),
            None => request,
        })
    }

    async fn object_resource(&self, key: &str) -> AppResult<Option<ObjectResource>> {
        let response = self
            .authorized(self.client.get(self.object_url(key)))
            .await?
            .send()
            .await
            .map_err(|e| transport_error(PROVIDER, e))?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(status_error(PROVIDER, "stat", key, response).await);
        }
        response
            .json()
            .await
            .map(Some)
            .map_err(|e| transport_error(PROVIDER, e))
    }

    async fn set_download_token(&self, key: &str) -> AppResult<()> {
        let download_token = uuid::Uuid::new_v4().to_string();
        let response = self
            .authorized(self.client.patch(self.object_url(key)))
            .await?
            .json(&serde_json::json!({ "metadata": { DOWNLOAD_TOKEN_KEY: download_token } }))
            .send()
            .await
            .map_err(|e| transport_error(PROVIDER, e))?;
        if !response.status().is_success() {
            return Err(status_error(PROVIDER, "set metadata", key, response).await);
        }
        Ok(())
    }

    async fn media_response(&self, key: &str) -> AppResult<reqwest::Response> {
        let url = format!("{}?alt=media", self.object_url(key));
        let response = self
            .authorized(self.client.get(url))
            .await?
            .send()
            .await
            .map_err(|e| transport_error(PROVIDER, e))?;
        if !response.status().is_success() {
            return Err(status_error(PROVIDER, "download", key, response).await);
        }
        Ok(response)
    }
}

#[async_trait]
impl StorageProvider for FirebaseStorageProvider {
    fn provider_type(&self) -> &str {
        PROVIDER
    }

    async fn health_check(&self) -> AppResult<bool> {
        let url = format!("{}/storage/v1/b/{}", self.api_base, self.bucket);
        let response = self
            .authorized(self.client.get(url))
            .await?
            .send()
            .await
            .map_err(|e| transport_error(PROVIDER, e))?;
        Ok(response.status().is_success())
    }

    async fn read(&self, path: &str) -> AppResult<ByteStream> {
        let response = self.media_response(path).await?;
        Ok(response_stream(response))
    }

    async fn read_bytes(&self, path: &str) -> AppResult<Bytes> {
        self.media_response(path)
            .await?
            .bytes()
            .await
            .map_err(|e| transport_error(PROVIDER, e))
    }

    async fn write(&self, path: &str, data: Bytes, content_type: &str) -> AppResult<()> {
        let size = data.len();
        let response = self
            .authorized(self.client.post(self.upload_url(path)))
            .await?
            .header(CONTENT_TYPE, content_type)
            .body(data)
            .send()
            .await
            .map_err(|e| transport_error(PROVIDER, e))?;
        if !response.status().is_success() {
            return Err(status_error(PROVIDER, "upload", path, response).await);
        }

        if let Err(e) = self.set_download_token(path).await {
            if let Err(cleanup) = self.delete(path).await {
                warn!(path, error = %cleanup, "Failed to remove blob after metadata update failed");
            }
            return Err(e);
        }

        debug!(path, bytes = size, bucket = %self.bucket, "Uploaded blob to Firebase Storage");
        Ok(())
    }

    async fn delete(&self, path: &str) -> AppResult<()> {
        let response = self
            .authorized(self.client.delete(self.object_url(path)))
            .await?
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
        Ok(self.object_resource(path).await?.is_some())
    }

    fn public_url(&self, path: &str) -> Option<String> {
        self.make_public
            .then(|| format!("{}/{}/{}", self.api_base, self.bucket, encode_key_path(path)))
    }

    /// Public URL for public buckets; otherwise the Firebase token URL, which
    /// stays valid until the token is revoked, so `ttl` does not apply.
    async fn download_url(&self, path: &str, _ttl: Duration) -> AppResult<Option<String>> {
        if let Some(url) = self.public_url(path) {
            return Ok(Some(url));
        }
        let resource = self
            .object_resource(path)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Blob not found: {path}")))?;
        let token = resource
            .metadata
            .get(DOWNLOAD_TOKEN_KEY)
            .and_then(|tokens| tokens.split(',').map(str::trim).find(|t| !t.is_empty()))
            .map(|token| self.token_download_url(path, token));
        Ok(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn provider(make_public: bool) -> FirebaseStorageProvider {
        FirebaseStorageProvider::new(&FirebaseStorageConfig {
            enabled: true,
            bucket: "planroom-demo.appspot.com".to_string(),
            access_token: "ya29.token".to_string(),
            make_public,
            ..FirebaseStorageConfig::default()
        })
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn test_object_urls_encode_whole_key() {
        let p = provider(true).await;
        assert_eq!(
            p.object_url("files/A-101/x_1.pdf"),
            "https://storage.googleapis.com/storage/v1/b/planroom-demo.appspot.com/o/files%2FA-101%2Fx_1.pdf"
        );
        assert_eq!(
            p.upload_url("files/A-101/x_1.pdf"),
            "https://storage.googleapis.com/upload/storage/v1/b/planroom-demo.appspot.com/o?uploadType=media&name=files%2FA-101%2Fx_1.pdf&predefinedAcl=publicRead"
        );
    }

    #[tokio::test]
    async fn test_public_url_keeps_slashes() {
        let p = provider(true).await;
        assert_eq!(
            p.public_url("files/A-101/x_1.pdf").as_deref(),
            Some("https://storage.googleapis.com/planroom-demo.appspot.com/files/A-101/x_1.pdf")
        );
        assert!(provider(false).await.public_url("files/a.pdf").is_none());
    }

    #[tokio::test]
    async fn test_failed_metadata_update_removes_blob() {
        let mut server = mockito::Server::new_async().await;
        let upload = server
            .mock("POST", mockito::Matcher::Regex("^/upload/storage/v1/b/bkt/o".to_string()))
            .with_status(200)
            .with_body("{}")
            .create_async()
            .await;
        let patch = server
            .mock("PATCH", mockito::Matcher::Regex("^/storage/v1/b/bkt/o/".to_string()))
            .with_status(500)
            .create_async()
            .await;
        let cleanup = server
            .mock("DELETE", mockito::Matcher::Regex("^/storage/v1/b/bkt/o/".to_string()))
            .with_status(204)
            .expect(1)
            .create_async()
            .await;

        let p = FirebaseStorageProvider::new(&FirebaseStorageConfig {
            enabled: true,
            bucket: "bkt".to_string(),
            access_token: "token".to_string(),
            make_public: false,
            api_base: server.url(),
            ..FirebaseStorageConfig::default()
        })
        .await
        .unwrap();

        let result = p
            .write("files/a/x_1.pdf", Bytes::from_static(b"%PDF"), "application/pdf")
            .await;
        assert!(result.is_err());
        upload.assert_async().await;
        patch.assert_async().await;
        cleanup.assert_async().await;
    }

    #[tokio::test]
    async fn test_token_download_url() {
        let p = provider(false).await;
        assert_eq!(
            p.token_download_url("files/a b.pdf", "tok-1"),
            "https://firebasestorage.googleapis.com/v0/b/planroom-demo.appspot.com/o/files%2Fa%20b.pdf?alt=media&token=tok-1"
        );
    }

    #[tokio::test]
    async fn test_static_token_is_used_directly() {
        let p = provider(false).await;
        assert_eq!(p.access_token().await.unwrap().as_deref(), Some("ya29.token"));
        assert!(!format!("{p:?}").contains("ya29"));
    }

    #[tokio::test]
    async fn test_missing_service_account_file_is_config_error() {
        let err = FirebaseStorageProvider::new(&FirebaseStorageConfig {
            enabled: true,
            bucket: "b".to_string(),
            service_account_path: "/definitely/not/here.json".to_string(),
            ..FirebaseStorageConfig::default()
        })
        .await
        .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Configuration);
    }
}
