use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Request body for `POST /api/chat`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    /// The message to send to the chatbot.
    #[schema(example = "Hello, how are you?")]
    pub message: Option<String>,
    /// When set, the user's stored key messages are added as context.
    #[serde(default)]
    pub user_id: Option<String>,
}

/// Response body for `POST /api/chat`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ChatResponse {
    /// The generated reply.
    pub response: String,
}

/// `{"error": "..."}` returned by every failing endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
}
