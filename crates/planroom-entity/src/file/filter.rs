//! Listing filters.

use serde::{Deserialize, Serialize};

/// Filter for the latest-per-group listing.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FileFilter {
    /// Case-insensitive substring matched against name and description.
    #[serde(default)]
    pub search: Option<String>,
    /// Exact tag match.
    #[serde(default)]
    pub tag: Option<String>,
}

impl FileFilter {
    /// Trimmed search term, `None` when blank.
    pub fn search_term(&self) -> Option<&str> {
        self.search.as_deref().map(str::trim).filter(|s| !s.is_empty())
    }

    /// Trimmed tag, `None` when blank.
    pub fn tag_term(&self) -> Option<&str> {
        self.tag.as_deref().map(str::trim).filter(|s| !s.is_empty())
    }

    /// In-process evaluation, used by the memory store.
    pub fn matches(&self, record: &super::FileRecord) -> bool {
        if let Some(term) = self.search_term() {
            let term = term.to_lowercase();
            let hit = record.original_name.to_lowercase().contains(&term)
                || record.description.to_lowercase().contains(&term);
            if !hit {
                return false;
            }
        }
        if let Some(tag) = self.tag_term() {
            if !record.tags.iter().any(|t| t == tag) {
                return false;
            }
        }
        true
    }
}
