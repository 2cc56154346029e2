//! Server configuration, loaded from environment variables at startup.

use std::time::Duration;

use parley_core::PoolSettings;

/// Runtime configuration for parley-server.
///
/// Every field has a default suitable for local development, so the server
/// runs without any environment variables set.
#[derive(Debug, Clone)]
pub struct Config {
    /// Host part of the listen address (`PARLEY_BIND_HOST`, default `"0.0.0.0"`).
    pub bind_host: String,

    /// Listen port (`PORT`, default `3000`).
    pub port: u16,

    /// sqlx SQLite URL (`DATABASE_URL`, default `"sqlite://parley.db?mode=rwc"`).
    pub database_url: String,

    /// Full generation URL of the Ollama endpoint (`OLLAMA_URL`).
    pub ollama_url: String,

    /// Model identifier sent with every generation request (`MODEL_NAME`).
    pub model_name: String,

    /// Comma-separated origins allowed by CORS (`FRONTEND_URL`).
    pub frontend_url: String,

    /// `tracing` filter string, e.g. `"info"` or `"debug,tower_http=warn"`.
    pub log_level: String,

    /// When `true`, emit log records as newline-delimited JSON.
    pub log_json: bool,

    /// Serve the OpenAPI document and Swagger UI.
    pub enable_swagger: bool,

    pub db_max_connections: u32,
    pub db_acquire_timeout: Duration,
    pub db_idle_timeout: Duration,

    /// Per-request timeout toward the inference endpoint.
    pub inference_timeout: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_host: "0.0.0.0".to_owned(),
            port: 3000,
            database_url: "sqlite://parley.db?mode=rwc".to_owned(),
            ollama_url: "http://localhost:11434/api/generate".to_owned(),
            model_name: "qwen:7b".to_owned(),
            frontend_url: "http://localhost:3001".to_owned(),
            log_level: "info".to_owned(),
            log_json: false,
            enable_swagger: true,
            db_max_connections: 20,
            db_acquire_timeout: Duration::from_millis(2_000),
            db_idle_timeout: Duration::from_millis(30_000),
            inference_timeout: Duration::from_secs(120),
        }
    }
}

impl Config {
    /// Build [`Config`] from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        let d = Self::default();
        Self {
            bind_host: env_or("PARLEY_BIND_HOST", &d.bind_host),
            port: parse_env("PORT", d.port),
            database_url: env_or("DATABASE_URL", &d.database_url),
            ollama_url: env_or("OLLAMA_URL", &d.ollama_url),
            model_name: env_or("MODEL_NAME", &d.model_name),
            frontend_url: env_or("FRONTEND_URL", &d.frontend_url),
            log_level: env_or("PARLEY_LOG", &d.log_level),
            log_json: bool_env("PARLEY_LOG_JSON", d.log_json),
            enable_swagger: bool_env("PARLEY_ENABLE_SWAGGER", d.enable_swagger),
            db_max_connections: parse_env("PARLEY_DB_MAX_CONNECTIONS", d.db_max_connections),
            db_acquire_timeout: Duration::from_millis(parse_env(
                "PARLEY_DB_ACQUIRE_TIMEOUT_MS",
                d.db_acquire_timeout.as_millis() as u64,
            )),
            db_idle_timeout: Duration::from_millis(parse_env(
                "PARLEY_DB_IDLE_TIMEOUT_MS",
                d.db_idle_timeout.as_millis() as u64,
            )),
            inference_timeout: Duration::from_secs(parse_env(
                "PARLEY_INFERENCE_TIMEOUT_SECS",
                d.inference_timeout.as_secs(),
            )),
        }
    }

    /// `host:port` to bind.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.bind_host, self.port)
    }

    pub fn pool_settings(&self) -> PoolSettings {
        PoolSettings {
            max_connections: self.db_max_connections,
            acquire_timeout: self.db_acquire_timeout,
            idle_timeout: Some(self.db_idle_timeout),
        }
    }
}

// ── private helpers ──────────────────────────────────────────────────────────

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_owned())
}

fn parse_env<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn bool_env(key: &str, default: bool) -> bool {
    std::env::var(key)
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(default)
}
