//! # planroom-service
//!
//! Business logic service layer for Planroom. Each service orchestrates
//! the metadata store and storage providers to implement one use case:
//! uploading versions, listing and editing records, rolling back,
//! downloading, and previewing.
//!
//! Services follow constructor injection. All dependencies are provided
//! at construction time via `Arc` references.

pub mod file;

pub use file::{DownloadService, FileService, PreviewService, UploadService, VersionService};
