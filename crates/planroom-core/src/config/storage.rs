//! Storage provider and upload policy configuration.

use serde::{Deserialize, Serialize};

/// Top-level storage configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Provider new uploads are written to: `local`, `memory`, `supabase`, or `firebase`.
    #[serde(default = "default_provider")]
    pub default_provider: String,
    /// Maximum upload size in bytes (default 500 MiB).
    #[serde(default = "default_max_upload")]
    pub max_upload_size_bytes: u64,
    /// MIME types accepted on upload.
    #[serde(default = "default_allowed_mime_types")]
    pub allowed_mime_types: Vec<String>,
    /// File extensions (with leading dot) accepted regardless of declared MIME type.
    #[serde(default = "default_allowed_extensions")]
    pub allowed_extensions: Vec<String>,
    /// Prefix for every storage key.
    #[serde(default = "default_key_prefix")]
    pub key_prefix: String,
    /// Lifetime of signed download URLs in seconds.
    #[serde(default = "default_signed_url_ttl")]
    pub signed_url_ttl_seconds: u64,
    /// Redirect downloads to provider URLs instead of proxying the bytes.
    #[serde(default)]
    pub redirect_downloads: bool,
    /// Local filesystem storage configuration.
    #[serde(default)]
    pub local: LocalStorageConfig,
    /// Supabase Storage configuration.
    #[serde(default)]
    pub supabase: SupabaseStorageConfig,
    /// Firebase Storage configuration.
    #[serde(default)]
    pub firebase: FirebaseStorageConfig,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            default_provider: default_provider(),
            max_upload_size_bytes: default_max_upload(),
            allowed_mime_types: default_allowed_mime_types(),
            allowed_extensions: default_allowed_extensions(),
            key_prefix: default_key_prefix(),
            signed_url_ttl_seconds: default_signed_url_ttl(),
            redirect_downloads: false,
            local: LocalStorageConfig::default(),
            supabase: SupabaseStorageConfig::default(),
            firebase: FirebaseStorageConfig::default(),
        }
    }
}

/// Local filesystem storage configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocalStorageConfig {
    /// Root path for local file storage.
    #[serde(default = "default_local_root")]
    pub root_path: String,
}

impl Default for LocalStorageConfig {
    fn default() -> Self {
        Self {
            root_path: default_local_root(),
        }
    }
}

/// Supabase Storage configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SupabaseStorageConfig {
    /// Whether the Supabase provider is registered.
    #[serde(default)]
    pub enabled: bool,
    /// Project URL, e.g. `https://xyz.supabase.co`.
    #[serde(default)]
    pub url: String,
    /// Service role or anon key.
    #[serde(default, skip_serializing)]
    pub api_key: String,
    /// Storage bucket name.
    #[serde(default = "default_supabase_bucket")]
    pub bucket: String,
    /// Whether the bucket serves public object URLs.
    #[serde(default)]
    pub public_bucket: bool,
}

impl Default for SupabaseStorageConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            url: String::new(),
            api_key: String::new(),
            bucket: default_supabase_bucket(),
            public_bucket: false,
        }
    }
}

/// Firebase Storage (Google Cloud Storage) configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FirebaseStorageConfig {
    /// Whether the Firebase provider is registered.
    #[serde(default)]
    pub enabled: bool,
    /// Bucket name, e.g. `my-project.appspot.com`.
    #[serde(default)]
    pub bucket: String,
    /// Path to a service-account JSON key.
    #[serde(default)]
    pub service_account_path: String,
    /// Static OAuth access token, used when no service account is configured.
    #[serde(default, skip_serializing)]
    pub access_token: String,
    /// Upload objects with a public-read ACL and hand out public URLs.
    #[serde(default = "default_true")]
    pub make_public: bool,
    /// JSON API base URL (override for the storage emulator).
    #[serde(default = "default_gcs_api_base")]
    pub api_base: String,
    /// Firebase download endpoint base URL.
    #[serde(default = "default_firebase_download_base")]
    pub download_base: String,
}

impl Default for FirebaseStorageConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            bucket: String::new(),
            service_account_path: String::new(),
            access_token: String::new(),
            make_public: true,
            api_base: default_gcs_api_base(),
            download_base: default_firebase_download_base(),
        }
    }
}

fn default_provider() -> String {
    "local".to_string()
}

fn default_max_upload() -> u64 {
    500 * 1024 * 1024 // 500 MiB
}

fn default_allowed_mime_types() -> Vec<String> {
    [
        "application/pdf",
        "image/jpeg",
        "image/png",
        "image/gif",
        "image/webp",
        "application/zip",
        "application/x-zip-compressed",
        "application/msword",
        "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        "application/vnd.ms-excel",
        "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        "text/plain",
        "application/acad",
        "image/vnd.dwg",
        "image/vnd.dxf",
        "application/dxf",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

fn default_allowed_extensions() -> Vec<String> {
    [
        ".pdf", ".jpg", ".jpeg", ".png", ".gif", ".webp", ".zip", ".doc", ".docx", ".xls", ".xlsx",
        ".txt", ".dwg", ".dxf",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

fn default_key_prefix() -> String {
    "files".to_string()
}

fn default_signed_url_ttl() -> u64 {
    3600
}

fn default_local_root() -> String {
    "./data/uploads".to_string()
}

fn default_supabase_bucket() -> String {
    "construction-files".to_string()
}

fn default_true() -> bool {
    true
}

fn default_gcs_api_base() -> String {
    "https://storage.googleapis.com".to_string()
}

fn default_firebase_download_base() -> String {
    "https://firebasestorage.googleapis.com".to_string()
}
