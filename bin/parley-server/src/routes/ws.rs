//! Real-time chat channel (`GET /ws`).
//!
//! Each upgraded socket drives one [`Session`].  Inbound frames are handled
//! in order on the reader side; a writer task drains the session outbox into
//! the socket.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use futures::{SinkExt, StreamExt};
use parley_core::{BotEvent, Session};
use tokio::sync::mpsc;
use tracing::{debug, info_span, warn, Instrument};

use crate::schemas::ws::{parse_inbound, OutboundFrame};
use crate::state::AppState;

/// Pending outbound events per connection before the session waits.
const OUTBOX_CAPACITY: usize = 32;

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/ws", get(ws_handler))
}

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| run_session(socket, state))
}

async fn run_session(socket: WebSocket, state: Arc<AppState>) {
    let (outbox, events) = mpsc::channel(OUTBOX_CAPACITY);
    let mut session = Session::new(Arc::clone(&state.store), Arc::clone(&state.inference), outbox);
    let span = info_span!("session", session_id = %session.id());

    async move {
        let (sender, mut receiver) = socket.split();
        let writer = tokio::spawn(write_events(sender, events).in_current_span());

        session.on_connect().await;
        while let Some(frame) = receiver.next().await {
            match frame {
                Ok(Message::Text(text)) => {
                    if let Some(inbound) = parse_inbound(text.as_str()) {
                        session.on_user_message(inbound).await;
                    }
                }
                Ok(Message::Close(_)) => break,
                Ok(_) => {}
                Err(e) => {
                    debug!(error = %e, "socket read failed");
                    break;
                }
            }
        }
        session.on_disconnect();

        // Dropping the session closes the outbox, which ends the writer.
        drop(session);
        if let Err(e) = writer.await {
            warn!(error = %e, "session writer task failed");
        }
    }
    .instrument(span)
    .await
}

async fn write_events(
    mut sender: futures::stream::SplitSink<WebSocket, Message>,
    mut events: mpsc::Receiver<BotEvent>,
) {
    while let Some(event) = events.recv().await {
        let frame = match serde_json::to_string(&OutboundFrame::from(&event)) {
            Ok(frame) => frame,
            Err(e) => {
                warn!(error = %e, "failed to encode outbound event");
                continue;
            }
        };
        if let Err(e) = sender.send(Message::Text(frame.into())).await {
            debug!(error = %e, "socket write failed");
            break;
        }
    }
    let _ = sender.close().await;
}

// ── Tests ──────────────────────────────────────────────────────────────────────
