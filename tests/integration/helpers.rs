//! Shared test helpers for integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use axum::Router;
use axum::body::{Body, Bytes};
use axum::http::{HeaderMap, Request, StatusCode, header};
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

use planroom_api::{assemble_state, build_app};
use planroom_core::config::AppConfig;
use planroom_database::{FileRecordStore, MemoryFileRecordRepository};
use planroom_storage::StorageManager;
use planroom_storage::providers::MemoryStorageProvider;

const BOUNDARY: &str = "planroom-test-boundary";

/// Markup served for non-API paths.
pub const INDEX_HTML: &str = "<!doctype html><title>Planroom test</title>";

/// Test application context
pub struct TestApp {
    /// The Axum router for making test requests
    pub router: Router,
    /// Metadata store behind the router
    pub store: Arc<MemoryFileRecordRepository>,
    /// Blob storage behind the router
    pub blobs: Arc<MemoryStorageProvider>,
    /// Static frontend directory, removed on drop
    _frontend: TempDir,
}

impl TestApp {
    /// Create a new test application with default configuration
    pub async fn new() -> Self {
        Self::with_config(AppConfig::default()).await
    }

    /// Create a test application backed by the memory store and memory blobs
    pub async fn with_config(mut config: AppConfig) -> Self {
        let frontend = tempfile::tempdir().expect("Failed to create frontend dir");
        std::fs::write(frontend.path().join("index.html"), INDEX_HTML)
            .expect("Failed to write index.html");
        config.server.frontend_dir = frontend.path().to_string_lossy().to_string();
        config.storage.default_provider = "memory".to_string();

        let store = Arc::new(MemoryFileRecordRepository::new());
        let blobs = Arc::new(MemoryStorageProvider::new());
        let storage = Arc::new(StorageManager::new());
        storage.register("memory", blobs.clone(), true).await;

        let dyn_store: Arc<dyn FileRecordStore> = store.clone();
        let state = assemble_state(config, dyn_store, storage);

        Self {
            router: build_app(state),
            store,
            blobs,
            _frontend: frontend,
        }
    }

    /// Make an HTTP request with an optional JSON body
    pub async fn request(&self, method: &str, path: &str, body: Option<Value>) -> TestResponse {
        let mut req = Request::builder().method(method).uri(path);
        let body = match body {
            Some(json) => {
                req = req.header(header::CONTENT_TYPE, "application/json");
                Body::from(serde_json::to_vec(&json).expect("Failed to serialize body"))
            }
            None => Body::empty(),
        };
        self.send(req.body(body).expect("Failed to build request")).await
    }

    /// Send a raw body with the given content type
    pub async fn request_raw(
        &self,
        method: &str,
        path: &str,
        content_type: &str,
        body: &'static [u8],
    ) -> TestResponse {
        let req = Request::builder()
            .method(method)
            .uri(path)
            .header(header::CONTENT_TYPE, content_type)
            .body(Body::from(body))
            .expect("Failed to build request");
        self.send(req).await
    }

    /// POST a multipart upload with one file part and extra text fields
    pub async fn upload(
        &self,
        file_name: &str,
        content_type: &str,
        data: &[u8],
        fields: &[(&str, &str)],
    ) -> TestResponse {
        let mut body = Vec::new();
        for (name, value) in fields {
            body.extend_from_slice(
                format!(
                    "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
                )
                .as_bytes(),
            );
        }
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{file_name}\"\r\nContent-Type: {content_type}\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(data);
        body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

        self.multipart(body).await
    }

    /// POST a prepared multipart body to the upload endpoint
    pub async fn multipart(&self, body: Vec<u8>) -> TestResponse {
        let req = Request::builder()
            .method("POST")
            .uri("/api/upload")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .expect("Failed to build request");
        self.send(req).await
    }

    async fn send(&self, req: Request<Body>) -> TestResponse {
        let response = self
            .router
            .clone()
            .oneshot(req)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let headers = response.headers().clone();
        let bytes = axum::body::to_bytes(response.into_body(), 64 * 1024 * 1024)
            .await
            .expect("Failed to read body");

        TestResponse {
            status,
            headers,
            bytes,
        }
    }
}

/// Prepared multipart body without a file part
pub fn multipart_fields_only(fields: &[(&str, &str)]) -> Vec<u8> {
    let mut body = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

/// Response from a test request
#[derive(Debug)]
pub struct TestResponse {
    /// HTTP status code
    pub status: StatusCode,
    /// Response headers
    pub headers: HeaderMap,
    /// Raw body
    pub bytes: Bytes,
}

impl TestResponse {
    /// Body parsed as JSON, `Null` when it is not JSON
    pub fn json(&self) -> Value {
        serde_json::from_slice(&self.bytes).unwrap_or(Value::Null)
    }

    /// The `data` member of a success envelope
    pub fn data(&self) -> Value {
        self.json()["data"].clone()
    }

    /// A header as a string
    pub fn header(&self, name: header::HeaderName) -> Option<String> {
        self.headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    }
}
