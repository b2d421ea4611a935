//! Convenience result type alias for Planroom.

use crate::error::AppError;

/// A specialized `Result` type for Planroom operations.
pub type AppResult<T> = Result<T, AppError>;
