//! File naming rules: base names for version grouping, storage keys, tags.

use chrono::{DateTime, Utc};

use planroom_core::error::AppError;
use planroom_core::result::AppResult;
use planroom_core::types::FileId;

/// Maximum number of tags on one record.
pub const MAX_TAGS: usize = 50;
/// Maximum length of a single tag, in characters.
pub const MAX_TAG_LEN: usize = 64;

/// Strip any directory a client sent along with the file name.
///
/// Browsers on Windows have been known to send `C:\fakepath\plan.pdf`.
pub fn client_file_name(raw: &str) -> AppResult<String> {
    let name = raw.rsplit(['/', '\\']).next().unwrap_or_default().trim();
    if name.is_empty() || name == "." || name == ".." {
        return Err(AppError::validation("File name is required"));
    }
    Ok(name.to_string())
}

/// Split a file name into stem and extension (with dot). A leading dot does
/// not start an extension, so `.env` has none; a trailing dot is an empty
/// extension, so `plan.` has stem `plan`.
pub fn split_extension(name: &str) -> (&str, Option<&str>) {
    match name.rfind('.') {
        Some(idx) if idx > 0 => (&name[..idx], Some(&name[idx..])),
        _ => (name, None),
    }
}

/// Derive the version-grouping key from an uploaded file name.
///
/// The last extension is removed: `plan.v2.pdf` groups as `plan.v2`.
pub fn derive_base_name(file_name: &str) -> AppResult<String> {
    let name = client_file_name(file_name)?;
    let (stem, _) = split_extension(&name);
    Ok(stem.to_string())
}

/// Lowercased extension with dot, e.g. `.dwg`.
pub fn extension_of(file_name: &str) -> Option<String> {
    split_extension(file_name).1.map(str::to_lowercase)
}

/// Make a base name safe to use as a single storage key segment.
fn key_segment(base_name: &str) -> String {
    let safe: String = base_name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect();
    if safe.is_empty() || safe.chars().all(|c| c == '.') {
        "_".to_string()
    } else {
        safe
    }
}

/// Build the storage key for a new version:
/// `{prefix}/{safe_base}/{id}_{millis}{.ext}`.
pub fn storage_key(
    prefix: &str,
    base_name: &str,
    id: FileId,
    uploaded_at: DateTime<Utc>,
    extension: Option<&str>,
) -> String {
    let mut key = String::new();
    let prefix = prefix.trim_matches('/');
    if !prefix.is_empty() {
        key.push_str(&key_segment(prefix));
        key.push('/');
    }
    key.push_str(&key_segment(base_name));
    key.push('/');
    key.push_str(&format!("{id}_{}", uploaded_at.timestamp_millis()));
    if let Some(ext) = extension.map(|e| e.trim_start_matches('.')).filter(|e| !e.is_empty()) {
        key.push('.');
        key.push_str(&key_segment(ext).to_lowercase());
    }
    key
}

/// Normalize tags: trim, drop empties and duplicates, enforce limits.
pub fn normalize_tags<I, S>(tags: I) -> AppResult<Vec<String>>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut out: Vec<String> = Vec::new();
    for tag in tags {
        let tag = tag.as_ref().trim();
        if tag.is_empty() || out.iter().any(|t| t == tag) {
            continue;
        }
        if tag.chars().count() > MAX_TAG_LEN {
            return Err(AppError::validation(format!(
                "Tag '{tag}' exceeds {MAX_TAG_LEN} characters"
            )));
        }
        out.push(tag.to_string());
    }
    if out.len() > MAX_TAGS {
        return Err(AppError::validation(format!(
            "At most {MAX_TAGS} tags are allowed"
        )));
    }
    Ok(out)
}

/// Parse a comma-separated tag string as sent by the upload form.
pub fn parse_tags(csv: &str) -> AppResult<Vec<String>> {
    normalize_tags(csv.split(','))
}
