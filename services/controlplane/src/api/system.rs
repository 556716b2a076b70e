//! System/health API handlers.
//!
//! # Purpose and responsibility
//! Provides a lightweight health endpoint for probes.
//!
//! # Key invariants and assumptions
//! - Health checks must be fast and side-effect free.
use crate::api::error::{ApiError, api_internal};
use crate::api::types::HealthStatus;
use crate::app::AppState;
use axum::Json;
use axum::extract::State;

#[utoipa::path(
    get,
    path = "/v1/system/health",
    tag = "system",
    responses(
        (status = 200, description = "Control plane health", body = HealthStatus)
    )
)]
/// Return control-plane health status.
///
/// # What it does
/// Probes the permission store and reports its backend and durability.
///
/// # Errors
/// - Returns 500 if the store health check fails.
pub(crate) async fn system_health(
    State(state): State<AppState>,
) -> Result<Json<HealthStatus>, ApiError> {
    let store = state.engine.store();
    if let Err(err) = store.health_check().await {
        return Err(api_internal("storage unavailable", &err));
    }
    Ok(Json(HealthStatus {
        status: "ok".to_string(),
        backend: store.backend_name().to_string(),
        durable: store.is_durable(),
    }))
}
