//! Unified server error type.
//!
//! Handlers return `Result<T, ServerError>`; [`IntoResponse`] turns the error
//! into a `{"error": "..."}` JSON body with the matching status code.  Store
//! and inference failures are logged in full and the cause is included in the
//! message returned to the caller.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use parley_core::{InferenceError, StoreError};
use serde_json::json;
use thiserror::Error;
use tracing::{error, warn};

/// Body text returned when the pre-flight datastore check fails.
pub const DATABASE_NOT_AVAILABLE: &str = "Database not available";

#[derive(Debug, Error)]
pub enum ServerError {
    /// A required input was missing or malformed.
    #[error("{0}")]
    BadRequest(String),

    /// The request body is larger than the server accepts.
    #[error("request body exceeds {0} bytes")]
    PayloadTooLarge(usize),

    /// The datastore did not answer the pre-flight health check.
    #[error("Database not available")]
    StoreUnavailable,

    /// A store operation failed after the datastore was reachable.
    #[error("{context}: {source}")]
    Store {
        context: &'static str,
        #[source]
        source: StoreError,
    },

    /// The inference endpoint could not produce a reply.
    #[error("inference failed: {0}")]
    Upstream(#[from] InferenceError),
}

impl ServerError {
    pub fn store(context: &'static str) -> impl FnOnce(StoreError) -> Self {
        move |source| ServerError::Store { context, source }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let (status, client_message) = match &self {
            ServerError::BadRequest(m) => (StatusCode::BAD_REQUEST, m.clone()),
            ServerError::PayloadTooLarge(_) => (StatusCode::PAYLOAD_TOO_LARGE, self.to_string()),
            ServerError::StoreUnavailable => {
                warn!("datastore failed pre-flight health check");
                (StatusCode::SERVICE_UNAVAILABLE, DATABASE_NOT_AVAILABLE.to_owned())
            }
            ServerError::Store { source, .. } => {
                error!(error = %self, "store operation failed");
                let status = if source.is_unavailable() {
                    StatusCode::SERVICE_UNAVAILABLE
                } else {
                    StatusCode::INTERNAL_SERVER_ERROR
                };
                (status, self.to_string())
            }
            ServerError::Upstream(e) => {
                error!(error = %e, "inference call failed");
                (StatusCode::INTERNAL_SERVER_ERROR, e.apology().to_owned())
            }
        };
        (status, Json(json!({ "error": client_message }))).into_response()
    }
}
