pub mod chat;
pub mod health;
pub mod key_messages;
pub mod ws;
