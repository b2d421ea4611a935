//! # planroom-core
//!
//! Core crate for Planroom. Contains the storage provider trait,
//! configuration schemas, typed identifiers, response envelopes,
//! and the unified error system.
//!
//! This crate has **no** internal dependencies on other Planroom crates.

pub mod config;
pub mod error;
pub mod result;
pub mod traits;
pub mod types;

pub use error::AppError;
pub use result::AppResult;
