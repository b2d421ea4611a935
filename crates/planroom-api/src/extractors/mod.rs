//! Custom extractors.

pub mod path;
pub mod query;

pub use path::FileIdPath;
pub use query::ApiQuery;
