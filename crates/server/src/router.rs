//! HTTP router construction.
//!
//! Assembles all Axum routes, middleware, and OpenAPI docs into a single `Router`.

use std::sync::Arc;

use axum::http::HeaderValue;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use utoipa::OpenApi;
use utoipa_scalar::{Scalar, Servable};

use crate::api;
use crate::state::AppState;

/// Build the complete application router with all routes and middleware.
pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = cors_layer(&state.config.server.cors_origin);

    Router::new()
        .route("/health", get(api::health))
        .route("/api/chat", post(api::chat))
        .route("/api/history", get(api::history_list))
        .route("/api/history/{id}", get(api::history_get))
        .layer(cors)
        .with_state(state)
        .merge(Scalar::with_url("/docs", api::doc::ApiDoc::openapi()))
}

/// `*` allows any origin; otherwise a comma-separated origin list.
fn cors_layer(origins: &str) -> CorsLayer {
    if origins.trim() == "*" {
        return CorsLayer::permissive();
    }
    let parsed: Result<Vec<HeaderValue>, _> = origins
        .split(',')
        .map(str::trim)
        .filter(|o| !o.is_empty())
        .map(HeaderValue::from_str)
        .collect();
    match parsed {
        Ok(list) if !list.is_empty() => CorsLayer::new()
            .allow_origin(AllowOrigin::list(list))
            .allow_methods(Any)
            .allow_headers(Any),
        _ => {
            tracing::warn!(origins, "Invalid CORS_ORIGIN, allowing any origin");
            CorsLayer::permissive()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::testing::{state_with_mock, state_without_engine};
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use relay_tool_runtime::provider::mock::MockLlmProvider;
    use serde_json::{json, Value};
    use std::time::Duration;
    use tower::ServiceExt;

    async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, body)
    }

    fn post_chat(body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/api/chat")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn test_chat_runs_tool_and_persists_turns() {
        let provider = Arc::new(MockLlmProvider::new());
        provider.queue_tool_call("c1", "echo", json!({"message": "sunny in Tokyo"}));
        provider.queue_text("It is sunny in Tokyo.");
        let app = build_router(state_with_mock(provider.clone()));

        let (status, body) = send(&app, post_chat(json!({"message": "Weather in Tokyo?"}))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["response"], "It is sunny in Tokyo.");
        assert_eq!(body["tool_calls"], json!([{"name": "echo", "args": {"message": "sunny in Tokyo"}}]));

        let session_id = body["session_id"].as_str().unwrap().to_string();
        let (status, turns) = send(&app, get(&format!("/api/history/{}", session_id))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(turns.as_array().unwrap().len(), 2);
        assert_eq!(turns[0]["role"], "user");
        assert_eq!(turns[0]["content"], "Weather in Tokyo?");
        assert_eq!(turns[1]["role"], "assistant");
        assert_eq!(turns[1]["content"], "It is sunny in Tokyo.");
    }

    #[tokio::test]
    async fn test_follow_up_sees_history() {
        let provider = Arc::new(MockLlmProvider::new());
        provider.queue_text("Hello!");
        provider.queue_text("You said hi.");
        let app = build_router(state_with_mock(provider.clone()));

        let (_, first) = send(&app, post_chat(json!({"message": "hi"}))).await;
        let session_id = first["session_id"].clone();
        let (_, second) = send(
            &app,
            post_chat(json!({"message": "what did I say?", "session_id": session_id})),
        )
        .await;
        assert_eq!(second["session_id"], session_id);

        // user, assistant, then the new user message
        assert_eq!(provider.requests()[1].len(), 3);

        let (_, sessions) = send(&app, get("/api/history")).await;
        assert_eq!(sessions.as_array().unwrap().len(), 1);
        assert_eq!(sessions[0]["message_count"], 4);
        assert_eq!(sessions[0]["last_message"], "You said hi.");
    }

    #[tokio::test]
    async fn test_loop_error_is_reported_as_text() {
        let provider = Arc::new(MockLlmProvider::new());
        provider.queue_failure("model endpoint unreachable");
        let app = build_router(state_with_mock(provider));

        let (status, body) = send(&app, post_chat(json!({"message": "hi"}))).await;
        assert_eq!(status, StatusCode::OK);
        let text = body["response"].as_str().unwrap();
        assert!(text.starts_with("Error: "));
        assert!(text.contains("model endpoint unreachable"));
        assert_eq!(body["tool_calls"], json!([]));

        let uri = format!("/api/history/{}", body["session_id"].as_str().unwrap());
        let (_, turns) = send(&app, get(&uri)).await;
        assert_eq!(turns[1]["content"], body["response"]);
    }

    #[tokio::test]
    async fn test_abandoned_chat_leaves_store_untouched() {
        let provider =
            Arc::new(MockLlmProvider::new().with_latency(Duration::from_millis(300)));
        provider.queue_text("too late");
        let app = build_router(state_with_mock(provider.clone()));

        let pending = app.clone().oneshot(post_chat(json!({"message": "hi"})));
        assert!(tokio::time::timeout(Duration::from_millis(50), pending)
            .await
            .is_err());

        // The detached loop still finishes; its turns are discarded.
        tokio::time::sleep(Duration::from_millis(400)).await;
        assert_eq!(provider.request_count(), 1);
        let (_, sessions) = send(&app, get("/api/history")).await;
        assert_eq!(sessions, json!([]));
    }

    #[tokio::test]
    async fn test_chat_without_engine_is_unavailable() {
        let app = build_router(Arc::new(state_without_engine()));
        let (status, body) = send(&app, post_chat(json!({"message": "hi"}))).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert!(body["error"].as_str().unwrap().contains("GOOGLE_API_KEY"));

        let (_, sessions) = send(&app, get("/api/history")).await;
        assert_eq!(sessions, json!([]));
    }

    #[tokio::test]
    async fn test_empty_message_is_rejected() {
        let provider = Arc::new(MockLlmProvider::new());
        let app = build_router(state_with_mock(provider.clone()));
        let (status, _) = send(&app, post_chat(json!({"message": "   "}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(provider.request_count(), 0);
    }

    #[tokio::test]
    async fn test_unknown_session_history_is_empty() {
        let app = build_router(Arc::new(state_without_engine()));
        let (status, body) = send(&app, get("/api/history/nope")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!([]));
    }

    #[tokio::test]
    async fn test_health_reports_engine_and_tools() {
        let app = build_router(state_with_mock(Arc::new(MockLlmProvider::new())));
        let (status, body) = send(&app, get("/health")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert_eq!(body["mcp_state"], "disconnected");
        assert_eq!(body["engine_ready"], true);
        assert_eq!(body["tool_count"], 1);
        assert!(body["config"].is_object());
    }

    async fn allowed_origin(origins: &str, origin: &str) -> Option<String> {
        let app = Router::new()
            .route("/health", axum::routing::get(|| async { "ok" }))
            .layer(cors_layer(origins));
        let request = Request::builder()
            .uri("/health")
            .header("origin", origin)
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        response
            .headers()
            .get("access-control-allow-origin")
            .map(|v| v.to_str().unwrap().to_string())
    }

    #[tokio::test]
    async fn test_cors_origin_list_allows_only_listed_origins() {
        let origins = "http://localhost:3000, http://localhost:5173";
        assert_eq!(
            allowed_origin(origins, "http://localhost:5173").await.as_deref(),
            Some("http://localhost:5173")
        );
        assert_eq!(allowed_origin(origins, "http://evil.test").await, None);
    }

    #[tokio::test]
    async fn test_cors_wildcard_and_invalid_list_allow_any_origin() {
        assert_eq!(
            allowed_origin("*", "http://evil.test").await.as_deref(),
            Some("*")
        );
        assert_eq!(
            allowed_origin("bad\norigin", "http://evil.test").await.as_deref(),
            Some("*")
        );
    }
}
