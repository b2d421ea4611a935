//! Upload acceptance policy: size limit and file type allow-lists.

use planroom_core::config::StorageConfig;
use planroom_core::error::AppError;
use planroom_core::result::AppResult;
use planroom_storage::mime::mime_from_path;

use super::naming::extension_of;

/// Content type browsers send when they do not know the file type.
const UNDECLARED: &str = "application/octet-stream";

/// Decides whether an uploaded file is accepted and what content type it gets.
#[derive(Debug, Clone)]
pub struct UploadPolicy {
    max_size_bytes: u64,
    allowed_mime_types: Vec<String>,
    allowed_extensions: Vec<String>,
}

impl UploadPolicy {
    /// Build the policy from storage configuration.
    pub fn from_config(config: &StorageConfig) -> Self {
        Self {
            max_size_bytes: config.max_upload_size_bytes,
            allowed_mime_types: config
                .allowed_mime_types
                .iter()
                .map(|m| m.trim().to_lowercase())
                .collect(),
            allowed_extensions: config
                .allowed_extensions
                .iter()
                .map(|e| {
                    let e = e.trim().to_lowercase();
                    if e.starts_with('.') { e } else { format!(".{e}") }
                })
                .collect(),
        }
    }

    /// Maximum accepted upload size in bytes.
    pub fn max_size_bytes(&self) -> u64 {
        self.max_size_bytes
    }

    /// Validate a file and return the content type to store.
    ///
    /// A file is accepted when its declared MIME type or its extension is
    /// allowed. `application/octet-stream` counts as undeclared, so only the
    /// extension can admit such a file. The declared type is stored only when
    /// it is itself allowed; otherwise the type is guessed from the extension.
    pub fn check(&self, file_name: &str, declared: Option<&str>, size: u64) -> AppResult<String> {
        if size == 0 {
            return Err(AppError::validation("Uploaded file is empty"));
        }
        if size > self.max_size_bytes {
            return Err(AppError::payload_too_large(format!(
                "File exceeds maximum upload size of {} bytes",
                self.max_size_bytes
            )));
        }

        let declared = declared
            .map(|m| essence(m).to_lowercase())
            .filter(|m| !m.is_empty() && m != UNDECLARED);
        let extension = extension_of(file_name);

        let mime_allowed = declared
            .as_deref()
            .is_some_and(|m| self.allowed_mime_types.iter().any(|a| a == m));
        let extension_allowed = extension
            .as_deref()
            .is_some_and(|e| self.allowed_extensions.iter().any(|a| a == e));

        if !mime_allowed && !extension_allowed {
            return Err(AppError::unsupported_media_type(format!(
                "File type not allowed: {} ({})",
                extension.as_deref().unwrap_or("no extension"),
                declared.as_deref().unwrap_or(UNDECLARED)
            )));
        }

        Ok(declared
            .filter(|_| mime_allowed)
            .or_else(|| mime_from_path(file_name))
            .unwrap_or_else(|| UNDECLARED.to_string()))
    }
}

/// Strip parameters such as `; charset=utf-8`.
fn essence(mime: &str) -> &str {
    mime.split(';').next().unwrap_or_default().trim()
}
