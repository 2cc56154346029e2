//! Plain request/response chat (`POST /api/chat`).

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use parley_core::context::build_prompt;
use tracing::{debug, info};
use utoipa::OpenApi;

use crate::error::ServerError;
use crate::schemas::chat::{ChatRequest, ChatResponse, ErrorResponse};
use crate::state::AppState;

pub const MESSAGE_REQUIRED: &str = "Message is required";

#[derive(OpenApi)]
#[openapi(
    paths(chat),
    components(schemas(ChatRequest, ChatResponse, ErrorResponse))
)]
pub struct ChatApi;

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/chat", post(chat))
}

/// Send a message and wait for the generated reply.
#[utoipa::path(
    post,
    path = "/api/chat",
    tag = "chat",
    request_body = ChatRequest,
    responses(
        (status = 200, description = "Reply generated", body = ChatResponse),
        (status = 400, description = "Message missing", body = ErrorResponse),
        (status = 500, description = "Inference endpoint failed", body = ErrorResponse),
    )
)]
pub async fn chat(
    State(state): State<Arc<AppState>>,
    body: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<ChatResponse>, ServerError> {
    let req = match body {
        Ok(Json(req)) => req,
        Err(rejection) => {
            debug!(error = %rejection, "unreadable chat body");
            ChatRequest::default()
        }
    };
    let message = req
        .message
        .filter(|m| !m.trim().is_empty())
        .ok_or_else(|| ServerError::BadRequest(MESSAGE_REQUIRED.to_owned()))?;

    let prompt = build_prompt(state.store.as_ref(), req.user_id.as_deref(), &message).await;
    let response = state.inference.try_generate(&prompt).await?;
    info!(output_len = response.len(), "chat reply generated");
    Ok(Json(ChatResponse { response }))
}

// ── Tests ──────────────────────────────────────────────────────────────────────
