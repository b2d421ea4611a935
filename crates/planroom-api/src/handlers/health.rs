//! Health check handlers.

use axum::Json;
use axum::extract::State;
use chrono::Utc;

use planroom_core::types::ApiResponse;

use crate::dto::response::{ComponentHealth, HealthResponse};
use crate::state::AppState;

/// GET /healthz
pub async fn liveness() -> &'static str {
    "OK"
}

/// GET /api/health
pub async fn health(State(state): State<AppState>) -> Json<ApiResponse<HealthResponse>> {
    let storage = state.storage_manager.health_check_all().await;
    let metadata_healthy = state.store.health_check().await.unwrap_or(false);
    let file_count = state.store.count().await.unwrap_or_default();
    let default_storage = state
        .storage_manager
        .get_default()
        .await
        .map(|(name, _)| name)
        .unwrap_or_default();

    let all_healthy = metadata_healthy && storage.values().all(|healthy| *healthy);

    Json(ApiResponse::ok(HealthResponse {
        status: if all_healthy { "ok" } else { "degraded" }.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: Utc::now(),
        uptime_seconds: state.started_at.elapsed().as_secs(),
        metadata: ComponentHealth {
            backend: state.store.backend().to_string(),
            healthy: metadata_healthy,
        },
        default_storage,
        storage: storage.into_iter().collect(),
        file_count,
    }))
}
