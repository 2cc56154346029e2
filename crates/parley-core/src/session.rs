//! Per-connection session handler.
//!
//! A [`Session`] moves through `Connected → Idle ⇄ Processing → Disconnected`.
//! Outbound notices and replies are pushed onto an `mpsc` outbox as tagged
//! [`BotEvent`]s; the transport drains the outbox and writes frames.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::context::build_prompt;
use crate::inference::TextGenerator;
use crate::retention::should_retain;
use crate::store::KeyMessageStore;

pub const WELCOME_MESSAGE: &str = "Welcome! I'm your chatbot assistant. How can I help you today?";

pub const SAVE_ACK_MESSAGE: &str = "I've saved your message because it contains the word \"key\".";

pub const SAVE_ERROR_MESSAGE: &str = "Sorry, I couldn't save your message right now.";

pub const STORE_UNAVAILABLE_MESSAGE: &str =
    "The database is not available right now, so your message was not saved.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Connected,
    Idle,
    Processing,
    Disconnected,
}

/// What an outbound event carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BotEventKind {
    Welcome,
    SaveAck,
    SaveError,
    StoreUnavailable,
    Response,
}

/// One outbound event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BotEvent {
    pub kind: BotEventKind,
    pub payload: String,
}

impl BotEvent {
    pub fn new(kind: BotEventKind, payload: impl Into<String>) -> Self {
        Self {
            kind,
            payload: payload.into(),
        }
    }
}

/// Inbound `user-message` data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserMessage {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
}

/// State and collaborators for one live connection.
pub struct Session<S, G> {
    id: Uuid,
    state: SessionState,
    store: Arc<S>,
    generator: Arc<G>,
    outbox: mpsc::Sender<BotEvent>,
}

impl<S: KeyMessageStore, G: TextGenerator> Session<S, G> {
    pub fn new(store: Arc<S>, generator: Arc<G>, outbox: mpsc::Sender<BotEvent>) -> Self {
        Self {
            id: Uuid::new_v4(),
            state: SessionState::Connected,
            store,
            generator,
            outbox,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Greet the client and become idle.  Only valid once, right after connect.
    pub async fn on_connect(&mut self) {
        if self.state != SessionState::Connected {
            debug!(session_id = %self.id, state = ?self.state, "ignoring duplicate connect");
            return;
        }
        info!(session_id = %self.id, "client connected");
        if self.emit(BotEventKind::Welcome, WELCOME_MESSAGE).await {
            self.state = SessionState::Idle;
        }
    }

    /// Handle one inbound message.  Returns `false` when the session was not
    /// idle and the message was dropped.
    pub async fn on_user_message(&mut self, inbound: UserMessage) -> bool {
        if self.state != SessionState::Idle {
            debug!(session_id = %self.id, state = ?self.state, "dropping message; session not idle");
            return false;
        }
        self.state = SessionState::Processing;
        let UserMessage { message, user_id } = inbound;
        let user_id = user_id.filter(|id| !id.is_empty());
        info!(session_id = %self.id, user_id = ?user_id, len = message.len(), "user message");

        if should_retain(&message) {
            match user_id.as_deref() {
                Some(uid) => self.persist(uid, &message).await,
                None => debug!(session_id = %self.id, "retained message has no user id; not saving"),
            }
            if self.state == SessionState::Disconnected {
                debug!(session_id = %self.id, "client left while saving; skipping reply");
                return true;
            }
        }

        let prompt = build_prompt(self.store.as_ref(), user_id.as_deref(), &message).await;
        let reply = self.generator.generate(&prompt).await;
        if self.emit(BotEventKind::Response, reply).await && self.state == SessionState::Processing {
            self.state = SessionState::Idle;
        }
        true
    }

    /// Terminal; later events are ignored.
    pub fn on_disconnect(&mut self) {
        if self.state != SessionState::Disconnected {
            info!(session_id = %self.id, "client disconnected");
            self.state = SessionState::Disconnected;
        }
    }

    async fn persist(&mut self, user_id: &str, message: &str) {
        if !self.store.check_health().await {
            warn!(session_id = %self.id, "datastore unavailable; message not saved");
            self.emit(BotEventKind::StoreUnavailable, STORE_UNAVAILABLE_MESSAGE).await;
            return;
        }
        match self.store.save(user_id, message).await {
            Ok(saved) => {
                info!(session_id = %self.id, id = saved.id, user_id, "key message saved");
                self.emit(BotEventKind::SaveAck, SAVE_ACK_MESSAGE).await;
            }
            Err(e) => {
                warn!(session_id = %self.id, user_id, error = %e, "failed to save key message");
                self.emit(BotEventKind::SaveError, SAVE_ERROR_MESSAGE).await;
            }
        }
    }

    /// Push an event; a closed outbox means the client is gone.
    async fn emit(&mut self, kind: BotEventKind, payload: impl Into<String>) -> bool {
        if self.outbox.send(BotEvent::new(kind, payload)).await.is_err() {
            debug!(session_id = %self.id, "outbox closed");
            self.on_disconnect();
            return false;
        }
        true
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────────
