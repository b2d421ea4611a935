//! # planroom-database
//!
//! Metadata storage for file records: the [`FileRecordStore`] trait,
//! its PostgreSQL implementation, an in-memory implementation, and
//! connection and migration management.

pub mod connection;
pub mod migration;
pub mod repositories;
pub mod store;

pub use connection::DatabasePool;
pub use repositories::{FileRecordRepository, MemoryFileRecordRepository};
pub use store::{FileRecordStore, open_store};
