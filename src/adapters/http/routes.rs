//! HTTP routes for the webhook endpoint.

use std::time::Duration;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use super::handlers::{handle_event, health, WebhookState};

/// Creates the webhook router with tracing and a request timeout.
pub fn webhook_routes(state: WebhookState, request_timeout: Duration) -> Router {
    Router::new()
        .route("/events", post(handle_event))
        .route("/health", get(health))
        .with_state(state)
        .layer(TimeoutLayer::new(request_timeout))
        .layer(TraceLayer::new_for_http())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::{
        body::{to_bytes, Body},
        http::{Request, StatusCode},
    };
    use secrecy::SecretString;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use super::*;
    use crate::adapters::backend::MockBackend;
    use crate::adapters::http::handlers::SECRET_HEADER;
    use crate::adapters::session::InMemorySessionStore;
    use crate::application::{Collaborators, LessonOrchestrator};
    use crate::config::SessionConfig;
    use crate::domain::lesson::test_support::lesson;

    fn app(secret: Option<&str>) -> Router {
        let orchestrator = LessonOrchestrator::new(
            Arc::new(InMemorySessionStore::default()),
            Collaborators::from_backend(Arc::new(MockBackend::with_lesson(lesson(3, 3)))),
            SessionConfig::default(),
        );
        let mut state = WebhookState::new(Arc::new(orchestrator));
        if let Some(secret) = secret {
            state = state.with_secret(SecretString::new(secret.to_string()));
        }
        webhook_routes(state, Duration::from_secs(5))
    }

    fn event(body: Value, secret: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder()
            .method("POST")
            .uri("/events")
            .header("content-type", "application/json");
        if let Some(secret) = secret {
            builder = builder.header(SECRET_HEADER, secret);
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    async fn json_body(response: axum::response::Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn health_reports_ok() {
        let response = app(None)
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await, json!({"status": "ok"}));
    }

    #[tokio::test]
    async fn start_command_returns_welcome_prompt() {
        let body = json!({"user_id": "42", "event": {"type": "command", "command": "start"}});
        let response = app(None).oneshot(event(body, None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let json = json_body(response).await;
        assert_eq!(json["user_id"], "42");
        assert!(json["prompt"]["text"].as_str().unwrap().contains("Welcome"));
        assert_eq!(json["prompt"]["buttons"][0][0]["action"], "onboarding:next");
    }

    #[tokio::test]
    async fn missing_secret_is_unauthorized() {
        let body = json!({"user_id": "42", "event": {"type": "command", "command": "start"}});
        let response = app(Some("s3cret")).oneshot(event(body, None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn wrong_secret_is_unauthorized() {
        let body = json!({"user_id": "42", "event": {"type": "text", "text": "hi"}});
        let response = app(Some("s3cret"))
            .oneshot(event(body, Some("guess")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn matching_secret_is_accepted() {
        let body = json!({"user_id": "42", "event": {"type": "command", "command": "help"}});
        let response = app(Some("s3cret"))
            .oneshot(event(body, Some("s3cret")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn blank_user_is_bad_request() {
        let body = json!({"user_id": "  ", "event": {"type": "command", "command": "start"}});
        let response = app(None).oneshot(event(body, None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn malformed_event_is_rejected() {
        let body = json!({"user_id": "42", "event": {"type": "sticker"}});
        let response = app(None).oneshot(event(body, None)).await.unwrap();
        assert!(response.status().is_client_error());
    }
}
