//! Flagged-message persistence.
//!
//! [`KeyMessageStore`] is the interface the session handler, the context
//! assembler and the HTTP surface talk to.  [`sqlite::SqliteStore`] is the
//! only implementation; it owns its connection pool, which is created by the
//! caller and handed in rather than living in a global.
//!
//! Trait methods use `impl Future` in their signatures so no `async-trait`
//! crate is required.

pub mod sqlite;

pub use sqlite::{PoolSettings, SqliteStore};

use std::future::Future;

use chrono::{DateTime, Utc};

use crate::error::StoreError;

/// A single row in the `key_messages` table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlaggedMessage {
    pub id: i64,
    pub user_id: String,
    pub text: String,
    pub created_at: DateTime<Utc>,
    /// Equal to `created_at`; rows are never updated.
    pub updated_at: DateTime<Utc>,
}

/// Number of flagged messages on one UTC day.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DailyCount {
    /// `YYYY-MM-DD`.
    pub day: String,
    pub count: i64,
    /// Distinct users who had a message flagged on `day`.
    pub unique_users: i64,
}

/// Whole-table aggregate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MessageTotals {
    pub total_messages: i64,
    pub unique_users: i64,
}

/// Every operation is a single attempt; errors are returned to the caller as-is.
pub trait KeyMessageStore: Send + Sync + 'static {
    /// Insert one message and return the stored row.
    fn save(
        &self,
        user_id: &str,
        text: &str,
    ) -> impl Future<Output = Result<FlaggedMessage, StoreError>> + Send;

    /// Messages of one user, newest first.
    fn list_by_user(
        &self,
        user_id: &str,
    ) -> impl Future<Output = Result<Vec<FlaggedMessage>, StoreError>> + Send;

    /// Every stored message, newest first.
    fn list_all(&self) -> impl Future<Output = Result<Vec<FlaggedMessage>, StoreError>> + Send;

    /// Messages whose text contains `term` (case-insensitive), newest first.
    fn search(
        &self,
        term: &str,
    ) -> impl Future<Output = Result<Vec<FlaggedMessage>, StoreError>> + Send;

    /// Delete every message of `user_id`; returns the number of rows removed.
    fn purge_user(&self, user_id: &str) -> impl Future<Output = Result<u64, StoreError>> + Send;

    /// Per-day counts for the seven most recent days that have data, newest first.
    fn daily_stats(&self) -> impl Future<Output = Result<Vec<DailyCount>, StoreError>> + Send;

    fn totals(&self) -> impl Future<Output = Result<MessageTotals, StoreError>> + Send;

    /// Cheap round-trip; `true` iff the datastore answered within a short timeout.
    fn check_health(&self) -> impl Future<Output = bool> + Send;
}
