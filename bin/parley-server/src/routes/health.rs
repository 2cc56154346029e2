//! Liveness probe covering the inference endpoint and the datastore.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use parley_core::KeyMessageStore;
use tracing::warn;
use utoipa::OpenApi;

use crate::schemas::health::{ConnectionStatus, HealthResponse, HealthStatus};
use crate::state::AppState;

#[derive(OpenApi)]
#[openapi(
    paths(get_health),
    components(schemas(HealthResponse, HealthStatus, ConnectionStatus))
)]
pub struct HealthApi;

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/health", get(get_health))
}

/// Liveness probe.
///
/// Both probes run concurrently.  Overall status is `healthy` only when the
/// inference endpoint answered its version request and the datastore
/// answered a round-trip.
#[utoipa::path(
    get,
    path = "/health",
    tag = "health",
    responses(
        (status = 200, description = "Inference endpoint and datastore reachable", body = HealthResponse),
        (status = 500, description = "At least one dependency unreachable", body = HealthResponse),
    )
)]
pub async fn get_health(State(state): State<Arc<AppState>>) -> (StatusCode, Json<HealthResponse>) {
    let (version, database_up) = tokio::join!(state.inference.version(), state.store.check_health());

    let (version, error) = match version {
        Ok(v) => (Some(v), None),
        Err(e) => {
            warn!(url = %state.inference.version_url(), error = %e, "inference endpoint health check failed");
            (None, Some(e.to_string()))
        }
    };
    let ollama_up = version.is_some();
    let error = match (error, database_up) {
        (None, false) => Some("database unreachable".to_owned()),
        (error, _) => error,
    };

    let healthy = ollama_up && database_up;
    let body = HealthResponse {
        status: if healthy { HealthStatus::Healthy } else { HealthStatus::Unhealthy },
        ollama: ollama_up.into(),
        database: database_up.into(),
        url: state.inference.version_url().to_owned(),
        version,
        error,
    };
    let status = if healthy {
        StatusCode::OK
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    };
    (status, Json(body))
}

// ── Tests ──────────────────────────────────────────────────────────────────────
