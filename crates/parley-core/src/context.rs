//! Folds a user's flagged messages into the prompt sent for generation.
//!
//! Context is best-effort: any lookup failure falls back to the raw message.

use tracing::{debug, warn};

use crate::store::{FlaggedMessage, KeyMessageStore};

/// Most recent flagged messages included in one prompt.
pub const MAX_CONTEXT_MESSAGES: usize = 10;

const CONTEXT_PREAMBLE: &str = "You are a helpful assistant. The user has previously shared the following important information with you:";

const CONTEXT_INSTRUCTION: &str = "Use this information to personalize your answer when it is relevant, but do not mention that you were given these notes.";

/// Build the prompt for `raw` sent by `user_id`.
///
/// Returns `raw` unchanged when there is no user id, when the lookup fails or
/// when the user has nothing stored.
pub async fn build_prompt<S: KeyMessageStore>(store: &S, user_id: Option<&str>, raw: &str) -> String {
    let Some(user_id) = user_id.filter(|id| !id.is_empty()) else {
        return raw.to_owned();
    };

    let history = match store.list_by_user(user_id).await {
        Ok(history) => history,
        Err(e) => {
            warn!(user_id, error = %e, "context lookup failed; sending message without context");
            return raw.to_owned();
        }
    };

    if history.is_empty() {
        return raw.to_owned();
    }
    debug!(user_id, stored = history.len(), "adding stored messages as context");
    render_prompt(&history, raw)
}

/// `history` must already be newest first.
pub fn render_prompt(history: &[FlaggedMessage], raw: &str) -> String {
    let bullets = history
        .iter()
        .take(MAX_CONTEXT_MESSAGES)
        .map(|m| format!("- {}", m.text))
        .collect::<Vec<_>>()
        .join("\n");
    format!("{CONTEXT_PREAMBLE}\n{bullets}\n\n{CONTEXT_INSTRUCTION}\n\nUser message: {raw}")
}
