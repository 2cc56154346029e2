//! parley-core – everything the relay does that is not HTTP plumbing.
//!
//! - [`retention`] decides which user messages are worth keeping.
//! - [`store`] persists those messages (SQLite via `sqlx`).
//! - [`context`] folds a user's kept messages back into a prompt.
//! - [`inference`] talks to the Ollama-compatible generation endpoint.
//! - [`session`] is the per-connection state machine tying the above together.

pub mod context;
pub mod error;
pub mod inference;
pub mod retention;
pub mod session;
pub mod store;

pub use error::{InferenceError, StoreError};
pub use inference::{InferenceClient, TextGenerator};
pub use session::{BotEvent, BotEventKind, Session, SessionState, UserMessage};
pub use store::{DailyCount, FlaggedMessage, KeyMessageStore, MessageTotals, PoolSettings, SqliteStore};
