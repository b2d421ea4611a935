//! # planroom-api
//!
//! HTTP API layer for Planroom built on Axum.
//!
//! Provides the REST endpoints for uploading, listing, versioning,
//! downloading and previewing documents, the static frontend fallback,
//! middleware (CORS, request logging, compression), and error mapping.

pub mod app;
pub mod dto;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod middleware;
pub mod router;
pub mod state;

pub use app::{assemble_state, build_app, build_state, run_server};
pub use error::ApiError;
pub use state::AppState;
