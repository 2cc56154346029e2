use utoipa::OpenApi;

use crate::routes::{chat, health, key_messages};

#[derive(OpenApi)]
#[openapi(info(
    title = "parley",
    description = "Chat relay API with real-time messaging and key-message history",
    version = "0.1.0",
))]
pub struct ApiDoc;

pub fn get_docs() -> utoipa::openapi::OpenApi {
    let mut root = ApiDoc::openapi();
    root.merge(health::HealthApi::openapi());
    root.merge(chat::ChatApi::openapi());
    root.merge(key_messages::KeyMessagesApi::openapi());
    root
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn document_lists_every_route() {
        let doc = get_docs();
        for path in [
            "/health",
            "/api/chat",
            "/api/key-messages",
            "/api/key-messages/user/{user_id}",
            "/api/key-messages/search/{search_term}",
            "/api/key-messages/stats",
        ] {
            assert!(doc.paths.paths.contains_key(path), "missing {path}");
        }
    }
}
