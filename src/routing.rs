//! Application router configuration and the chat relay route handler.

use axum::{
    Json, Router,
    body::Body,
    extract::State,
    http::{StatusCode, header},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
};

use crate::{
    AppState,
    chat::{ChatRequest, CompletionStream},
    endpoints,
};

/// Return a router with all the app's routes.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route(endpoints::AI_CHAT, post(post_chat))
        .route(endpoints::COFFEE, get(get_coffee))
        .with_state(state)
}

/// A route handler that relays a chat message upstream and streams the reply
/// back as a chunked plain-text body.
///
/// Fragments are forwarded in arrival order with no framing; clients must
/// not assume chunk boundaries align with words or sentences. If the
/// upstream call cannot be established, the response is a 502 with a short
/// notice and no fragments. A mid-stream upstream failure terminates the
/// response body early.
async fn post_chat(State(state): State<AppState>, Json(request): Json<ChatRequest>) -> Response {
    let stream = match state.relay.begin_stream(&request, &[]).await {
        Ok(stream) => stream,
        Err(error) => {
            tracing::error!("could not establish the upstream chat stream: {error}");
            return (
                StatusCode::BAD_GATEWAY,
                "The assistant is unavailable right now. Please try again.",
            )
                .into_response();
        }
    };

    let body = Body::from_stream(futures::stream::try_unfold(
        stream,
        |mut stream: CompletionStream| async move {
            match stream.next_fragment().await {
                Ok(Some(fragment)) => Ok(Some((fragment, stream))),
                Ok(None) => Ok(None),
                Err(error) => {
                    tracing::error!("upstream chat stream failed: {error}");
                    Err(error)
                }
            }
        },
    ));

    (
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        body,
    )
        .into_response()
}

/// Attempt to get a cup of coffee from the server.
async fn get_coffee() -> Response {
    (StatusCode::IM_A_TEAPOT, Html("I'm a teapot")).into_response()
}

#[cfg(test)]
mod routing_tests {
    use axum::http::StatusCode;
    use axum_test::TestServer;
    use serde_json::json;
    use wiremock::{
        Mock, MockServer, ResponseTemplate,
        matchers::{method, path},
    };

    use crate::{
        AppState,
        chat::{ChatRelay, RelayConfig},
        endpoints,
    };

    use super::build_router;

    async fn test_server_with_upstream(upstream_uri: &str) -> TestServer {
        let relay = ChatRelay::new(RelayConfig {
            endpoint: format!("{upstream_uri}/v1/chat/completions"),
            api_key: "test-key".to_owned(),
            model: "test-model".to_owned(),
        });

        TestServer::new(build_router(AppState::new(relay)))
    }

    #[tokio::test]
    async fn chat_route_streams_the_concatenated_reply() {
        let upstream = MockServer::start().await;
        let body = "data: {\"choices\":[{\"delta\":{\"content\":\"Hel\"}}]}\n\n\
                    data: {\"choices\":[{\"delta\":{\"content\":\"lo, \"}}]}\n\n\
                    data: {\"choices\":[{\"delta\":{\"content\":\"world\"}}]}\n\n\
                    data: [DONE]\n\n";
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/event-stream"))
            .mount(&upstream)
            .await;

        let server = test_server_with_upstream(&upstream.uri()).await;

        let response = server
            .post(endpoints::AI_CHAT)
            .json(&json!({ "message": "hello", "transactions": [] }))
            .await;

        response.assert_status_ok();
        assert_eq!(response.text(), "Hello, world");
    }

    #[tokio::test]
    async fn chat_route_reports_upstream_failure_without_fragments() {
        let upstream = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&upstream)
            .await;

        let server = test_server_with_upstream(&upstream.uri()).await;

        let response = server
            .post(endpoints::AI_CHAT)
            .json(&json!({ "message": "hello", "transactions": [] }))
            .await;

        response.assert_status(StatusCode::BAD_GATEWAY);
        assert!(!response.text().contains("data:"));
    }

    #[tokio::test]
    async fn coffee_route_returns_teapot() {
        let server = test_server_with_upstream("http://127.0.0.1:1").await;

        let response = server.get(endpoints::COFFEE).await;

        response.assert_status(StatusCode::IM_A_TEAPOT);
    }
}
