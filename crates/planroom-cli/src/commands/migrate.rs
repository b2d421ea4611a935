//! Database migration command.

use planroom_core::config::MetadataBackend;
use planroom_core::error::AppError;
use planroom_database::DatabasePool;
use planroom_database::connection::mask_password;
use planroom_database::migration::run_migrations;

use crate::output;

/// Execute the migrate command
pub async fn execute(env: &str) -> Result<(), AppError> {
    let config = super::load_config(env)?;

    if config.metadata.backend != MetadataBackend::Postgres {
        output::print_warning("Metadata backend is not postgres; nothing to migrate.");
        return Ok(());
    }

    println!(
        "Running database migrations on {}...",
        mask_password(&config.database.url)
    );
    let pool = DatabasePool::connect(&config.database).await?;
    run_migrations(pool.pool()).await?;
    pool.close().await;
    output::print_success("All migrations applied successfully.");
    Ok(())
}
