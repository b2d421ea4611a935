//! File record store implementations.

pub mod file;
pub mod memory;

pub use file::FileRecordRepository;
pub use memory::MemoryFileRecordRepository;
