//! Core traits defined in `planroom-core` and implemented by other crates.

pub mod storage;

pub use storage::{ByteStream, StorageProvider};
