//! The API endpoint URIs.

/// The route that relays a chat message to the assistant and streams the
/// reply back as raw text fragments.
pub const AI_CHAT: &str = "/api/ai/chat";
/// The route to request a cup of coffee (doubles as a health check).
pub const COFFEE: &str = "/api/coffee";

#[cfg(test)]
mod endpoints_tests {
    use axum::http::Uri;

    use crate::endpoints;

    fn assert_endpoint_is_valid_uri(uri: &str) {
        assert!(uri.parse::<Uri>().is_ok());
    }

    #[test]
    fn endpoints_are_valid_uris() {
        assert_endpoint_is_valid_uri(endpoints::AI_CHAT);
        assert_endpoint_is_valid_uri(endpoints::COFFEE);
    }
}
