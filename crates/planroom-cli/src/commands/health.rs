//! Health check command.

use serde::Serialize;
use tabled::Tabled;

use planroom_core::error::AppError;

use crate::output::{self, OutputFormat};

/// One checked component
#[derive(Debug, Serialize, Tabled)]
struct HealthRow {
    /// Component kind
    component: String,
    /// Backend name
    backend: String,
    /// Health
    healthy: bool,
}

/// Execute the health command
pub async fn execute(env: &str, format: OutputFormat) -> Result<(), AppError> {
    let state = super::open_state(env).await?;

    let mut rows = vec![HealthRow {
        component: "metadata".to_string(),
        backend: state.store.backend().to_string(),
        healthy: state.store.health_check().await.unwrap_or(false),
    }];
    let mut storage: Vec<(String, bool)> = state
        .storage_manager
        .health_check_all()
        .await
        .into_iter()
        .collect();
    storage.sort();
    rows.extend(storage.into_iter().map(|(backend, healthy)| HealthRow {
        component: "storage".to_string(),
        backend,
        healthy,
    }));

    output::print_list(&rows, format);

    if rows.iter().all(|r| r.healthy) {
        Ok(())
    } else {
        Err(AppError::service_unavailable("One or more components are unhealthy"))
    }
}
