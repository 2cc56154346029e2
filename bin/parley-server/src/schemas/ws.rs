//! Frames exchanged on the `/ws` channel.
//!
//! Inbound: `{"event": "user-message", "data": {"message": "...", "userId": "..."}}`.
//! Outbound: `{"event": "bot-message", "kind": "...", "payload": "..."}`.

use parley_core::{BotEvent, UserMessage};
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

pub const USER_MESSAGE_EVENT: &str = "user-message";
pub const BOT_MESSAGE_EVENT: &str = "bot-message";

#[derive(Debug, Serialize)]
pub struct OutboundFrame<'a> {
    pub event: &'static str,
    #[serde(flatten)]
    pub body: &'a BotEvent,
}

impl<'a> From<&'a BotEvent> for OutboundFrame<'a> {
    fn from(body: &'a BotEvent) -> Self {
        Self {
            event: BOT_MESSAGE_EVENT,
            body,
        }
    }
}

/// Decode one text frame.
///
/// Text that is not a JSON object is taken as a bare message without a user
/// id.  A `user-message` envelope carries either `{message, userId}` or a
/// plain string as `data`.  Blank messages, other events and malformed
/// envelopes yield `None`.
pub fn parse_inbound(text: &str) -> Option<UserMessage> {
    let mut envelope = match serde_json::from_str::<Value>(text) {
        Ok(Value::Object(map)) => map,
        _ => return bare(text),
    };

    match envelope.get("event").and_then(Value::as_str) {
        Some(USER_MESSAGE_EVENT) => {}
        Some(event) => {
            debug!(event, "ignoring unknown inbound event");
            return None;
        }
        None => {
            debug!("dropping inbound object without an event name");
            return None;
        }
    }

    match envelope.remove("data") {
        Some(Value::String(message)) => bare(&message),
        Some(data @ Value::Object(_)) => match serde_json::from_value::<UserMessage>(data) {
            Ok(inbound) => Some(inbound),
            Err(e) => {
                debug!(error = %e, "dropping malformed user-message envelope");
                None
            }
        },
        _ => {
            debug!("dropping user-message envelope without usable data");
            None
        }
    }
}

fn bare(text: &str) -> Option<UserMessage> {
    if text.trim().is_empty() {
        return None;
    }
    Some(UserMessage {
        message: text.to_owned(),
        user_id: None,
    })
}
