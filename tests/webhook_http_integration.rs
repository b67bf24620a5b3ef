//! Webhook endpoint driven over HTTP with in-memory adapters.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use secrecy::SecretString;
use serde_json::{json, Value};
use tower::ServiceExt;

use fluently_bot::adapters::backend::MockBackend;
use fluently_bot::adapters::http::{webhook_routes, WebhookState, SECRET_HEADER};
use fluently_bot::adapters::session::InMemorySessionStore;
use fluently_bot::application::{Collaborators, LessonOrchestrator};
use fluently_bot::config::SessionConfig;
use fluently_bot::domain::foundation::UserId;
use fluently_bot::domain::fsm::UserState;
use fluently_bot::domain::lesson::{Lesson, LessonResponse};
use fluently_bot::ports::SessionStore;

const SECRET: &str = "hook-secret";

fn empty_lesson() -> LessonResponse {
    LessonResponse {
        lesson: Lesson {
            id: None,
            user_id: None,
            started_at: None,
            words_per_lesson: 3,
            total_words: 0,
            cefr_level: None,
        },
        cards: Vec::new(),
    }
}

fn app(store: Arc<InMemorySessionStore>) -> Router {
    let orchestrator = LessonOrchestrator::new(
        store,
        Collaborators::from_backend(Arc::new(MockBackend::with_lesson(empty_lesson()))),
        SessionConfig::default(),
    );
    let state = WebhookState::new(Arc::new(orchestrator))
        .with_secret(SecretString::new(SECRET.to_string()));
    webhook_routes(state, Duration::from_secs(5))
}

async fn post(app: &Router, body: Value) -> (StatusCode, Value) {
    let request = Request::builder()
        .method("POST")
        .uri("/events")
        .header("content-type", "application/json")
        .header(SECRET_HEADER, SECRET)
        .body(Body::from(body.to_string()))
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
}

fn actions(body: &Value) -> Vec<String> {
    body["prompt"]["buttons"]
        .as_array()
        .into_iter()
        .flatten()
        .filter_map(Value::as_array)
        .flatten()
        .filter_map(|b| b["action"].as_str().map(str::to_string))
        .collect()
}

#[tokio::test]
async fn onboarding_walkthrough_over_http() {
    let store = Arc::new(InMemorySessionStore::default());
    let app = app(store.clone());
    let user = UserId::new("555").unwrap();

    let (status, body) = post(
        &app,
        json!({"user_id": "555", "event": {"type": "text", "text": "/start"}}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(actions(&body).contains(&"onboarding:next".to_string()));
    assert_eq!(store.get_state(&user).await.unwrap(), UserState::Welcome);

    for _ in 0..3 {
        post(
            &app,
            json!({"user_id": "555", "event": {"type": "button", "action": "onboarding:next"}}),
        )
        .await;
    }
    assert_eq!(store.get_state(&user).await.unwrap(), UserState::QuestionGoal);

    let (_, body) = post(
        &app,
        json!({"user_id": "555", "event": {"type": "text", "text": "stop"}}),
    )
    .await;
    assert!(body["prompt"]["text"].as_str().unwrap().contains("Cancelled"));
    assert_eq!(store.get_state(&user).await.unwrap(), UserState::Start);
}

#[tokio::test]
async fn unknown_button_data_reprompts() {
    let store = Arc::new(InMemorySessionStore::default());
    let app = app(store.clone());

    let (status, body) = post(
        &app,
        json!({"user_id": "9", "event": {"type": "button", "action": "rocket:launch"}}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(actions(&body).contains(&"cmd:learn".to_string()));
}

#[tokio::test]
async fn users_are_isolated() {
    let store = Arc::new(InMemorySessionStore::default());
    let app = app(store.clone());

    post(
        &app,
        json!({"user_id": "a", "event": {"type": "command", "command": "settings"}}),
    )
    .await;

    let a = UserId::new("a").unwrap();
    let b = UserId::new("b").unwrap();
    assert_eq!(store.get_state(&a).await.unwrap(), UserState::Settings);
    assert_eq!(store.get_state(&b).await.unwrap(), UserState::Start);
}

#[tokio::test]
async fn request_without_secret_is_rejected() {
    let app = app(Arc::new(InMemorySessionStore::default()));
    let request = Request::builder()
        .method("POST")
        .uri("/events")
        .header("content-type", "application/json")
        .body(Body::from(
            json!({"user_id": "1", "event": {"type": "command", "command": "start"}}).to_string(),
        ))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}
