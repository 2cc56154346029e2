use parley_core::{DailyCount, FlaggedMessage, MessageTotals};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// A stored key message.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct KeyMessage {
    pub id: i64,
    pub user_id: String,
    pub message: String,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct KeyMessagesResponse {
    pub key_messages: Vec<KeyMessage>,
}

/// Key messages flagged on one UTC day.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DailyStat {
    /// `YYYY-MM-DD`.
    pub day: String,
    pub count: i64,
    /// Distinct users on that day only.
    pub unique_users: i64,
}

/// Whole-table counts.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StatsTotals {
    pub total_messages: i64,
    pub unique_users: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct StatsResponse {
    /// Seven most recent days with data, newest first.
    pub stats: Vec<DailyStat>,
    pub totals: StatsTotals,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ClearResponse {
    pub message: String,
    pub deleted_count: u64,
}

impl From<FlaggedMessage> for KeyMessage {
    fn from(m: FlaggedMessage) -> Self {
        Self {
            id: m.id,
            user_id: m.user_id,
            message: m.text,
            created_at: m.created_at.to_rfc3339(),
            updated_at: m.updated_at.to_rfc3339(),
        }
    }
}

impl From<Vec<FlaggedMessage>> for KeyMessagesResponse {
    fn from(messages: Vec<FlaggedMessage>) -> Self {
        Self {
            key_messages: messages.into_iter().map(KeyMessage::from).collect(),
        }
    }
}

impl From<DailyCount> for DailyStat {
    fn from(d: DailyCount) -> Self {
        Self {
            day: d.day,
            count: d.count,
            unique_users: d.unique_users,
        }
    }
}

impl From<MessageTotals> for StatsTotals {
    fn from(t: MessageTotals) -> Self {
        Self {
            total_messages: t.total_messages,
            unique_users: t.unique_users,
        }
    }
}
