//! SQLite implementation of [`KeyMessageStore`].
//!
//! Migrations are embedded with `sqlx::migrate!("./migrations")`, resolved
//! relative to this crate's manifest at compile time, and run by
//! [`SqliteStore::connect`].
//!
//! Timestamps are stored as fixed-width RFC 3339 strings (microsecond
//! precision, `Z` suffix) so lexical order is chronological order.  Every
//! "newest first" query breaks ties on `id DESC`.
//!
//! Search matches against `message_folded`, a copy of the text lowercased
//! with Unicode rules at insert time; SQLite's own `LOWER` only folds ASCII.
//!
//! The runtime-checked `sqlx::query` form is used so that no `DATABASE_URL`
//! is needed at compile time.

use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use tracing::{debug, warn};

use super::{DailyCount, FlaggedMessage, KeyMessageStore, MessageTotals};
use crate::error::StoreError;

/// Upper bound on the health-check round-trip.
const HEALTH_TIMEOUT: Duration = Duration::from_secs(2);

/// How many distinct days [`KeyMessageStore::daily_stats`] reports.
const STATS_DAYS: i64 = 7;

const MESSAGE_COLUMNS: &str = "id, user_id, message, created_at, updated_at";

type MessageRow = (i64, String, String, String, String);

/// Connection-pool sizing.
#[derive(Debug, Clone)]
pub struct PoolSettings {
    pub max_connections: u32,
    /// How long to wait for a free connection before giving up.
    pub acquire_timeout: Duration,
    /// Idle connections are closed after this long; `None` keeps them open.
    pub idle_timeout: Option<Duration>,
}

impl Default for PoolSettings {
    fn default() -> Self {
        Self {
            max_connections: 20,
            acquire_timeout: Duration::from_millis(2_000),
            idle_timeout: Some(Duration::from_millis(30_000)),
        }
    }
}

/// SQLite-backed flagged-message store.
#[derive(Clone, Debug)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Open (or create) the database at `url`, build the pool and run pending
    /// migrations.
    ///
    /// `url` is a sqlx SQLite URL such as `"sqlite://parley.db"` or
    /// `"sqlite::memory:"`.  An in-memory database lives only as long as its
    /// connection, so pair it with `max_connections = 1` and no idle timeout.
    pub async fn connect(url: &str, settings: &PoolSettings) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str(url)
            .map_err(StoreError::Unavailable)?
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(settings.max_connections)
            .acquire_timeout(settings.acquire_timeout)
            .idle_timeout(settings.idle_timeout)
            .connect_with(options)
            .await
            .map_err(StoreError::Unavailable)?;
        let store = Self::from_pool(pool);
        store.migrate().await?;
        Ok(store)
    }

    /// Wrap an existing pool.  Migrations are not run.
    pub fn from_pool(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Apply the embedded migrations.
    pub async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }

    /// Close every pooled connection.  Later calls fail as unavailable.
    pub async fn close(&self) {
        self.pool.close().await;
    }

    async fn insert_at(
        &self,
        user_id: &str,
        text: &str,
        at: DateTime<Utc>,
    ) -> Result<FlaggedMessage, StoreError> {
        let stamp = format_timestamp(at);
        let row: MessageRow = sqlx::query_as(&format!(
            "INSERT INTO key_messages (user_id, message, message_folded, created_at, updated_at) \
             VALUES (?1, ?2, ?3, ?4, ?4) RETURNING {MESSAGE_COLUMNS}"
        ))
        .bind(user_id)
        .bind(text)
        .bind(text.to_lowercase())
        .bind(&stamp)
        .fetch_one(&self.pool)
        .await
        .map_err(StoreError::on_write)?;
        Ok(into_message(row))
    }
}

impl KeyMessageStore for SqliteStore {
    async fn save(&self, user_id: &str, text: &str) -> Result<FlaggedMessage, StoreError> {
        let saved = self.insert_at(user_id, text, Utc::now()).await?;
        debug!(id = saved.id, user_id = %saved.user_id, "key message saved");
        Ok(saved)
    }

    async fn list_by_user(&self, user_id: &str) -> Result<Vec<FlaggedMessage>, StoreError> {
        let rows: Vec<MessageRow> = sqlx::query_as(&format!(
            "SELECT {MESSAGE_COLUMNS} FROM key_messages \
             WHERE user_id = ?1 ORDER BY created_at DESC, id DESC"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(StoreError::on_read)?;
        Ok(rows.into_iter().map(into_message).collect())
    }

    async fn list_all(&self) -> Result<Vec<FlaggedMessage>, StoreError> {
        let rows: Vec<MessageRow> = sqlx::query_as(&format!(
            "SELECT {MESSAGE_COLUMNS} FROM key_messages ORDER BY created_at DESC, id DESC"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(StoreError::on_read)?;
        Ok(rows.into_iter().map(into_message).collect())
    }

    async fn search(&self, term: &str) -> Result<Vec<FlaggedMessage>, StoreError> {
        let rows: Vec<MessageRow> = sqlx::query_as(&format!(
            "SELECT {MESSAGE_COLUMNS} FROM key_messages \
             WHERE message_folded LIKE ?1 ESCAPE '\\' \
             ORDER BY created_at DESC, id DESC"
        ))
        .bind(like_pattern(&term.to_lowercase()))
        .fetch_all(&self.pool)
        .await
        .map_err(StoreError::on_read)?;
        Ok(rows.into_iter().map(into_message).collect())
    }

    async fn purge_user(&self, user_id: &str) -> Result<u64, StoreError> {
        let result = sqlx::query("DELETE FROM key_messages WHERE user_id = ?1")
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(StoreError::on_write)?;
        Ok(result.rows_affected())
    }

    async fn daily_stats(&self) -> Result<Vec<DailyCount>, StoreError> {
        let rows: Vec<(String, i64, i64)> = sqlx::query_as(
            "SELECT substr(created_at, 1, 10) AS day, COUNT(*), COUNT(DISTINCT user_id) \
             FROM key_messages GROUP BY day ORDER BY day DESC LIMIT ?1",
        )
        .bind(STATS_DAYS)
        .fetch_all(&self.pool)
        .await
        .map_err(StoreError::on_read)?;
        Ok(rows
            .into_iter()
            .map(|(day, count, unique_users)| DailyCount {
                day,
                count,
                unique_users,
            })
            .collect())
    }

    async fn totals(&self) -> Result<MessageTotals, StoreError> {
        let (total_messages, unique_users): (i64, i64) =
            sqlx::query_as("SELECT COUNT(*), COUNT(DISTINCT user_id) FROM key_messages")
                .fetch_one(&self.pool)
                .await
                .map_err(StoreError::on_read)?;
        Ok(MessageTotals {
            total_messages,
            unique_users,
        })
    }

    async fn check_health(&self) -> bool {
        match tokio::time::timeout(HEALTH_TIMEOUT, sqlx::query("SELECT 1").execute(&self.pool))
            .await
        {
            Ok(Ok(_)) => true,
            Ok(Err(e)) => {
                warn!(error = %e, "datastore health check failed");
                false
            }
            Err(_) => {
                warn!(timeout_ms = HEALTH_TIMEOUT.as_millis() as u64, "datastore health check timed out");
                false
            }
        }
    }
}

// ── private helpers ──────────────────────────────────────────────────────────

fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_timestamp(raw: &str, column: &str) -> DateTime<Utc> {
    raw.parse().unwrap_or_else(|e: chrono::ParseError| {
        warn!(raw = %raw, column, error = %e, "failed to parse key message timestamp; using now");
        Utc::now()
    })
}

fn into_message((id, user_id, text, created_at, updated_at): MessageRow) -> FlaggedMessage {
    FlaggedMessage {
        id,
        user_id,
        text,
        created_at: parse_timestamp(&created_at, "created_at"),
        updated_at: parse_timestamp(&updated_at, "updated_at"),
    }
}

/// `%term%` with LIKE wildcards in `term` escaped by `\`.
fn like_pattern(term: &str) -> String {
    let mut pattern = String::with_capacity(term.len() + 2);
    pattern.push('%');
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

// ── Tests ──────────────────────────────────────────────────────────────────────

#[cfg(test)]
pub(crate) mod test {
    use super::*;
    use chrono::TimeZone;

    pub(crate) async fn memory_store() -> SqliteStore {
        let settings = PoolSettings {
            max_connections: 1,
            acquire_timeout: Duration::from_secs(2),
            idle_timeout: None,
        };
        SqliteStore::connect("sqlite::memory:", &settings)
            .await
            .expect("in-memory store")
    }

    fn day(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 12, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn save_assigns_id_and_timestamps() {
        let store = memory_store().await;
        let saved = store.save("alice", "my key is 123").await.unwrap();
        assert!(saved.id > 0);
        assert_eq!(saved.user_id, "alice");
        assert_eq!(saved.text, "my key is 123");
        assert_eq!(saved.created_at, saved.updated_at);
    }

    #[tokio::test]
    async fn latest_save_is_listed_first() {
        let store = memory_store().await;
        store.save("alice", "first key").await.unwrap();
        store.save("bob", "bob's key").await.unwrap();
        let latest = store.save("alice", "second key").await.unwrap();

        let listed = store.list_by_user("alice").await.unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0], latest);
        assert_eq!(listed[1].text, "first key");
    }

    #[tokio::test]
    async fn list_all_is_newest_first() {
        let store = memory_store().await;
        store.insert_at("a", "old key", day(2025, 1, 1)).await.unwrap();
        store.insert_at("b", "new key", day(2025, 1, 3)).await.unwrap();
        store.insert_at("c", "mid key", day(2025, 1, 2)).await.unwrap();

        let texts: Vec<_> = store
            .list_all()
            .await
            .unwrap()
            .into_iter()
            .map(|m| m.text)
            .collect();
        assert_eq!(texts, ["new key", "mid key", "old key"]);
    }

    #[tokio::test]
    async fn search_is_case_insensitive_substring() {
        let store = memory_store().await;
        store.save("a", "The KEY to the door").await.unwrap();
        store.save("b", "api key rotation").await.unwrap();
        store.save("c", "keyboard").await.unwrap();

        let hits = store.search("key to").await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].user_id, "a");

        let hits = store.search("KEY").await.unwrap();
        assert_eq!(hits.len(), 3);
        assert_eq!(hits[0].user_id, "c");
    }

    #[tokio::test]
    async fn search_folds_non_ascii_case() {
        let store = memory_store().await;
        store.save("a", "ÄRGER mit dem Key").await.unwrap();
        store.save("b", "Straße key").await.unwrap();

        for term in ["ÄRGER", "ärger", "Ärger"] {
            let hits = store.search(term).await.unwrap();
            assert_eq!(hits.len(), 1, "term {term}");
            assert_eq!(hits[0].text, "ÄRGER mit dem Key");
        }
        assert_eq!(store.search("STRAßE").await.unwrap()[0].user_id, "b");
    }

    #[tokio::test]
    async fn search_treats_wildcards_literally() {
        let store = memory_store().await;
        store.save("a", "key is 100% safe").await.unwrap();
        store.save("b", "key is 100 safe").await.unwrap();
        store.save("c", "key_name").await.unwrap();
        store.save("d", "keyname").await.unwrap();

        let hits = store.search("100%").await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].user_id, "a");

        let hits = store.search("y_n").await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].user_id, "c");
    }

    #[tokio::test]
    async fn purge_removes_only_that_user() {
        let store = memory_store().await;
        store.save("alice", "key one").await.unwrap();
        store.save("alice", "key two").await.unwrap();
        store.save("bob", "key three").await.unwrap();

        assert_eq!(store.purge_user("alice").await.unwrap(), 2);
        assert!(store.list_by_user("alice").await.unwrap().is_empty());
        assert_eq!(store.list_by_user("bob").await.unwrap().len(), 1);
        assert_eq!(store.purge_user("alice").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn daily_stats_are_scoped_per_day() {
        let store = memory_store().await;
        store.insert_at("a", "key", day(2025, 3, 1)).await.unwrap();
        store.insert_at("a", "key", day(2025, 3, 1)).await.unwrap();
        store.insert_at("b", "key", day(2025, 3, 1)).await.unwrap();
        store.insert_at("c", "key", day(2025, 3, 4)).await.unwrap();

        let stats = store.daily_stats().await.unwrap();
        assert_eq!(
            stats,
            vec![
                DailyCount { day: "2025-03-04".into(), count: 1, unique_users: 1 },
                DailyCount { day: "2025-03-01".into(), count: 3, unique_users: 2 },
            ]
        );

        let totals = store.totals().await.unwrap();
        assert_eq!(totals, MessageTotals { total_messages: 4, unique_users: 3 });
    }

    #[tokio::test]
    async fn daily_stats_keep_seven_most_recent_days() {
        let store = memory_store().await;
        for d in 1..=10 {
            store.insert_at("a", "key", day(2025, 4, d)).await.unwrap();
        }
        let stats = store.daily_stats().await.unwrap();
        assert_eq!(stats.len(), 7);
        assert_eq!(stats[0].day, "2025-04-10");
        assert_eq!(stats[6].day, "2025-04-04");
    }

    #[tokio::test]
    async fn health_fails_once_closed() {
        let store = memory_store().await;
        assert!(store.check_health().await);
        store.close().await;
        assert!(!store.check_health().await);
        let err = store.save("a", "key").await.unwrap_err();
        assert!(err.is_unavailable());
    }

    #[test]
    fn like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("a%b_c\\"), "%a\\%b\\_c\\\\%");
        assert_eq!(like_pattern("plain"), "%plain%");
    }
}
