//! Admin routes over the stored key messages.
//!
//! Every handler first checks that the datastore answers; if it does not the
//! request fails with 503 before any query is issued.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::routing::get;
use axum::{Json, Router};
use parley_core::KeyMessageStore;
use tracing::info;
use utoipa::OpenApi;

use crate::error::ServerError;
use crate::schemas::chat::ErrorResponse;
use crate::schemas::key_messages::{
    ClearResponse, DailyStat, KeyMessage, KeyMessagesResponse, StatsResponse, StatsTotals,
};
use crate::state::AppState;

#[derive(OpenApi)]
#[openapi(
    paths(
        list_key_messages,
        list_user_key_messages,
        search_key_messages,
        key_message_stats,
        clear_user_key_messages
    ),
    components(schemas(
        KeyMessage,
        KeyMessagesResponse,
        DailyStat,
        StatsTotals,
        StatsResponse,
        ClearResponse,
        ErrorResponse
    ))
)]
pub struct KeyMessagesApi;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/key-messages", get(list_key_messages))
        .route("/key-messages/stats", get(key_message_stats))
        .route(
            "/key-messages/user/{user_id}",
            get(list_user_key_messages).delete(clear_user_key_messages),
        )
        .route("/key-messages/search/{search_term}", get(search_key_messages))
}

async fn ensure_store(state: &AppState) -> Result<(), ServerError> {
    if state.store.check_health().await {
        Ok(())
    } else {
        Err(ServerError::StoreUnavailable)
    }
}

#[utoipa::path(
    get,
    path = "/api/key-messages",
    tag = "key-messages",
    responses(
        (status = 200, description = "All key messages, newest first", body = KeyMessagesResponse),
        (status = 500, description = "Query failed", body = ErrorResponse),
        (status = 503, description = "Database not available", body = ErrorResponse),
    )
)]
pub async fn list_key_messages(
    State(state): State<Arc<AppState>>,
) -> Result<Json<KeyMessagesResponse>, ServerError> {
    ensure_store(&state).await?;
    let messages = state
        .store
        .list_all()
        .await
        .map_err(ServerError::store("Failed to fetch key messages"))?;
    Ok(Json(messages.into()))
}

#[utoipa::path(
    get,
    path = "/api/key-messages/user/{user_id}",
    tag = "key-messages",
    params(("user_id" = String, Path, description = "User whose messages to list")),
    responses(
        (status = 200, description = "The user's key messages, newest first", body = KeyMessagesResponse),
        (status = 500, description = "Query failed", body = ErrorResponse),
        (status = 503, description = "Database not available", body = ErrorResponse),
    )
)]
pub async fn list_user_key_messages(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
) -> Result<Json<KeyMessagesResponse>, ServerError> {
    ensure_store(&state).await?;
    let messages = state
        .store
        .list_by_user(&user_id)
        .await
        .map_err(ServerError::store("Failed to fetch user key messages"))?;
    Ok(Json(messages.into()))
}

#[utoipa::path(
    get,
    path = "/api/key-messages/search/{search_term}",
    tag = "key-messages",
    params(("search_term" = String, Path, description = "Case-insensitive substring to look for")),
    responses(
        (status = 200, description = "Matching key messages, newest first", body = KeyMessagesResponse),
        (status = 500, description = "Query failed", body = ErrorResponse),
        (status = 503, description = "Database not available", body = ErrorResponse),
    )
)]
pub async fn search_key_messages(
    State(state): State<Arc<AppState>>,
    Path(search_term): Path<String>,
) -> Result<Json<KeyMessagesResponse>, ServerError> {
    ensure_store(&state).await?;
    let messages = state
        .store
        .search(&search_term)
        .await
        .map_err(ServerError::store("Failed to search key messages"))?;
    Ok(Json(messages.into()))
}

/// Per-day counts for the seven most recent days with data, plus whole-table totals.
#[utoipa::path(
    get,
    path = "/api/key-messages/stats",
    tag = "key-messages",
    responses(
        (status = 200, description = "Key message statistics", body = StatsResponse),
        (status = 500, description = "Query failed", body = ErrorResponse),
        (status = 503, description = "Database not available", body = ErrorResponse),
    )
)]
pub async fn key_message_stats(
    State(state): State<Arc<AppState>>,
) -> Result<Json<StatsResponse>, ServerError> {
    ensure_store(&state).await?;
    let context = "Failed to fetch key message stats";
    let days = state.store.daily_stats().await.map_err(ServerError::store(context))?;
    let totals = state.store.totals().await.map_err(ServerError::store(context))?;
    Ok(Json(StatsResponse {
        stats: days.into_iter().map(DailyStat::from).collect(),
        totals: totals.into(),
    }))
}

#[utoipa::path(
    delete,
    path = "/api/key-messages/user/{user_id}",
    tag = "key-messages",
    params(("user_id" = String, Path, description = "User whose messages to delete")),
    responses(
        (status = 200, description = "Messages deleted", body = ClearResponse),
        (status = 500, description = "Delete failed", body = ErrorResponse),
        (status = 503, description = "Database not available", body = ErrorResponse),
    )
)]
pub async fn clear_user_key_messages(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
) -> Result<Json<ClearResponse>, ServerError> {
    ensure_store(&state).await?;
    let deleted_count = state
        .store
        .purge_user(&user_id)
        .await
        .map_err(ServerError::store("Failed to clear key messages"))?;
    info!(user_id = %user_id, deleted_count, "cleared key messages");
    Ok(Json(ClearResponse {
        message: format!("Cleared {deleted_count} key messages for user {user_id}"),
        deleted_count,
    }))
}

// ── Tests ──────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod test {
    use crate::error::DATABASE_NOT_AVAILABLE;
    use crate::routes::{build, test::call};
    use crate::state::test::{state_with, unreachable_url};
    use crate::state::AppState;
    use axum::http::{Method, StatusCode};
    use parley_core::KeyMessageStore;
    use serde_json::Value;
    use std::sync::Arc;

    async fn seeded() -> Arc<AppState> {
        let state = state_with(&unreachable_url()).await;
        state.store.save("alice", "my key is 42").await.unwrap();
        state.store.save("bob", "bob's KEY ring").await.unwrap();
        state.store.save("alice", "spare key under the mat").await.unwrap();
        state
    }

    fn texts(body: &Value) -> Vec<&str> {
        body["keyMessages"]
            .as_array()
            .expect("keyMessages array")
            .iter()
            .map(|m| m["message"].as_str().unwrap())
            .collect()
    }

    #[tokio::test]
    async fn lists_all_newest_first() {
        let state = seeded().await;
        let (status, body) = call(build(state), Method::GET, "/api/key-messages", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            texts(&body),
            ["spare key under the mat", "bob's KEY ring", "my key is 42"]
        );
        let first = &body["keyMessages"][0];
        assert_eq!(first["userId"], "alice");
        assert!(first["id"].is_i64());
        assert!(first["createdAt"].is_string());
        assert!(first["updatedAt"].is_string());
    }

    #[tokio::test]
    async fn lists_one_user() {
        let state = seeded().await;
        let (status, body) =
            call(build(state), Method::GET, "/api/key-messages/user/alice", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(texts(&body), ["spare key under the mat", "my key is 42"]);
    }

    #[tokio::test]
    async fn searches_case_insensitively() {
        let state = seeded().await;
        let (status, body) =
            call(build(state), Method::GET, "/api/key-messages/search/key%20RING", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(texts(&body), ["bob's KEY ring"]);
    }

    #[tokio::test]
    async fn stats_report_days_and_totals() {
        let state = seeded().await;
        let (status, body) =
            call(build(state), Method::GET, "/api/key-messages/stats", None).await;
        assert_eq!(status, StatusCode::OK);
        let stats = body["stats"].as_array().unwrap();
        assert_eq!(stats.len(), 1);
        assert_eq!(stats[0]["count"], 3);
        assert_eq!(stats[0]["uniqueUsers"], 2);
        assert_eq!(body["totals"]["totalMessages"], 3);
        assert_eq!(body["totals"]["uniqueUsers"], 2);
    }

    #[tokio::test]
    async fn delete_purges_user() {
        let state = seeded().await;
        let app = build(Arc::clone(&state));

        let (status, body) =
            call(app.clone(), Method::DELETE, "/api/key-messages/user/alice", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["deletedCount"], 2);
        assert!(body["message"].as_str().unwrap().contains("alice"));

        let (_, body) = call(app, Method::GET, "/api/key-messages/user/alice", None).await;
        assert!(texts(&body).is_empty());
        assert_eq!(state.store.list_by_user("bob").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn unavailable_store_is_503() {
        let state = seeded().await;
        state.store.close().await;
        for (method, uri) in [
            (Method::GET, "/api/key-messages"),
            (Method::GET, "/api/key-messages/user/alice"),
            (Method::GET, "/api/key-messages/search/key"),
            (Method::GET, "/api/key-messages/stats"),
            (Method::DELETE, "/api/key-messages/user/alice"),
        ] {
            let (status, body) = call(build(Arc::clone(&state)), method, uri, None).await;
            assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE, "{uri}");
            assert_eq!(body["error"], DATABASE_NOT_AVAILABLE);
        }
    }
}
