//! # planroom-storage
//!
//! Blob storage provider implementations for Planroom: local filesystem,
//! process memory, Supabase Storage, and Firebase Storage. The
//! [`StorageManager`] routes each file record to the provider that holds
//! its blob.

pub mod manager;
pub mod mime;
pub mod providers;

pub use manager::StorageManager;
