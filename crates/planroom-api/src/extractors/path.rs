//! Typed path parameter helpers.

use axum::extract::{FromRequestParts, Path};
use axum::http::request::Parts;
use uuid::Uuid;

use planroom_core::error::AppError;
use planroom_core::types::FileId;

use crate::error::ApiError;

/// Parses a file ID from a path segment.
pub fn parse_file_id(s: &str) -> Result<FileId, AppError> {
    Uuid::parse_str(s)
        .map(FileId::from_uuid)
        .map_err(|_| AppError::validation(format!("Invalid file id: {s}")))
}

/// `{id}` path segment parsed as a [`FileId`], rejected with a JSON 400.
#[derive(Debug, Clone, Copy)]
pub struct FileIdPath(pub FileId);

impl<S> FromRequestParts<S> for FileIdPath
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(raw) = Path::<String>::from_request_parts(parts, state)
            .await
            .map_err(|e| AppError::validation(e.body_text()))?;
        Ok(Self(parse_file_id(&raw)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_file_id() {
        let id = Uuid::new_v4();
        assert_eq!(parse_file_id(&id.to_string()).unwrap().into_uuid(), id);
        assert!(parse_file_id("A-101").is_err());
    }
}
