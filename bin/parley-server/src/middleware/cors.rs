use axum::http::{header, HeaderValue, Method};
use tower_http::cors::{Any, CorsLayer};

use crate::config::Config;

/// CORS for the browser client at `FRONTEND_URL`.
///
/// Credentials are allowed, which rules out wildcard origins; if no listed
/// origin parses, the layer falls back to any origin without credentials.
pub fn cors_layer(config: &Config) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .frontend_url
        .split(',')
        .filter_map(|s| s.trim().parse().ok())
        .collect();

    let methods = [Method::GET, Method::POST, Method::DELETE];
    if origins.is_empty() {
        tracing::warn!(frontend_url = %config.frontend_url, "no valid CORS origin configured; allowing any origin");
        CorsLayer::new()
            .allow_origin(Any)
            .allow_headers(Any)
            .allow_methods(methods)
    } else {
        CorsLayer::new()
            .allow_origin(origins)
            .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
            .allow_methods(methods)
            .allow_credentials(true)
    }
}
