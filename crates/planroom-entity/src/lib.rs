//! # planroom-entity
//!
//! Domain entity models for Planroom. Database entities derive
//! `Debug`, `Clone`, `Serialize`, `Deserialize`, and `sqlx::FromRow`.

pub mod file;
