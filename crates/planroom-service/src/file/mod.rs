//! File services: upload, listing and metadata, versions, download, preview.

pub mod download;
pub mod naming;
pub mod policy;
pub mod preview;
pub mod service;
pub mod upload;
pub mod version;

pub use download::{DownloadLink, DownloadService, DownloadTarget, Disposition};
pub use policy::UploadPolicy;
pub use preview::PreviewService;
pub use service::FileService;
pub use upload::{UploadParams, UploadService};
pub use version::{VersionHistory, VersionService};

#[cfg(test)]
pub(crate) mod test_support;
