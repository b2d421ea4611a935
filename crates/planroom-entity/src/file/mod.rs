//! File record entities.

pub mod filter;
pub mod model;
pub mod version;

pub use filter::FileFilter;
pub use model::{ANONYMOUS_UPLOADER, FileRecord, NewFileRecord};
pub use version::{DeleteMode, DeleteOutcome, LatestFile, VersionChange};
