//! Shared application state injected into every Axum handler.

use std::sync::Arc;

use parley_core::{InferenceClient, SqliteStore};

use crate::config::Config;

/// State shared across all HTTP handlers and WebSocket sessions.
#[derive(Clone, Debug)]
pub struct AppState {
    /// Server configuration (env-derived).
    pub config: Arc<Config>,
    /// Flagged-message store; owns the connection pool.
    pub store: Arc<SqliteStore>,
    /// Client for the generation endpoint.
    pub inference: Arc<InferenceClient>,
}

#[cfg(test)]
pub(crate) mod test {
    use super::*;
    use parley_core::PoolSettings;
    use std::time::Duration;

    /// State backed by an in-memory database and the given generation URL.
    pub(crate) async fn state_with(ollama_url: &str) -> Arc<AppState> {
        let config = Config {
            ollama_url: ollama_url.to_owned(),
            inference_timeout: Duration::from_secs(5),
            ..Config::default()
        };
        let settings = PoolSettings {
            max_connections: 1,
            acquire_timeout: Duration::from_secs(2),
            idle_timeout: None,
        };
        let store = SqliteStore::connect("sqlite::memory:", &settings)
            .await
            .expect("in-memory store");
        let inference = InferenceClient::new(
            &config.ollama_url,
            &config.model_name,
            config.inference_timeout,
        )
        .expect("inference client");
        Arc::new(AppState {
            config: Arc::new(config),
            store: Arc::new(store),
            inference: Arc::new(inference),
        })
    }

    /// A generation URL nothing is listening on.
    pub(crate) fn unreachable_url() -> String {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind");
        let addr = listener.local_addr().expect("addr");
        drop(listener);
        format!("http://{addr}/api/generate")
    }
}
