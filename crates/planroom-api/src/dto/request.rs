//! Request DTOs with validation.

use serde::Deserialize;
use validator::Validate;

use planroom_core::error::AppError;
use planroom_core::result::AppResult;
use planroom_entity::file::FileFilter;

/// Query string of `GET /api/files`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListQuery {
    /// Search in file names and descriptions.
    pub q: Option<String>,
    /// Exact tag.
    pub tag: Option<String>,
}

impl From<ListQuery> for FileFilter {
    fn from(query: ListQuery) -> Self {
        FileFilter {
            search: query.q,
            tag: query.tag,
        }
    }
}

/// Query string of `DELETE /api/files/{id}`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DeleteQuery {
    /// Remove every version of the group.
    #[serde(default)]
    pub all_versions: bool,
}

/// Query string of `GET /api/preview/{id}`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PreviewQuery {
    /// Thumbnail edge length; the original is streamed when absent.
    pub size: Option<u32>,
}

/// Tags as a JSON array or a comma-separated string.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum TagsInput {
    /// `["a", "b"]`
    List(Vec<String>),
    /// `"a, b"`
    Csv(String),
}

impl TagsInput {
    /// Split into raw tags; normalization happens in the service.
    pub fn into_vec(self) -> Vec<String> {
        match self {
            Self::List(tags) => tags,
            Self::Csv(csv) => csv.split(',').map(str::to_string).collect(),
        }
    }
}

/// Body of `PUT /api/files/{id}/metadata`.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct UpdateMetadataRequest {
    /// New description.
    #[validate(length(max = 2000, message = "Description is too long"))]
    pub description: Option<String>,
    /// New tags.
    pub tags: Option<TagsInput>,
}

impl UpdateMetadataRequest {
    /// Validate and split into description and tags.
    pub fn into_parts(self) -> AppResult<(Option<String>, Option<Vec<String>>)> {
        self.validate()
            .map_err(|e| AppError::validation(e.to_string()))?;
        Ok((self.description, self.tags.map(TagsInput::into_vec)))
    }
}
