//! HTTP handlers for the webhook endpoint.

use std::sync::Arc;

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use secrecy::{ExposeSecret, SecretString};
use subtle::ConstantTimeEq;
use tracing::{info, warn};

use crate::application::LessonOrchestrator;
use crate::domain::foundation::UserId;

use super::dto::{ErrorResponse, EventRequest, EventResponse, HealthResponse};

/// Header carrying the shared webhook secret.
pub const SECRET_HEADER: &str = "x-webhook-secret";

// ════════════════════════════════════════════════════════════════════════════
// Handler state
// ════════════════════════════════════════════════════════════════════════════

#[derive(Clone)]
pub struct WebhookState {
    orchestrator: Arc<LessonOrchestrator>,
    secret: Option<Arc<SecretString>>,
}

impl WebhookState {
    pub fn new(orchestrator: Arc<LessonOrchestrator>) -> Self {
        Self {
            orchestrator,
            secret: None,
        }
    }

    /// Requires every request to carry `secret` in `X-Webhook-Secret`.
    pub fn with_secret(mut self, secret: SecretString) -> Self {
        self.secret = Some(Arc::new(secret));
        self
    }

    fn authorized(&self, headers: &HeaderMap) -> bool {
        let Some(expected) = &self.secret else {
            return true;
        };
        headers
            .get(SECRET_HEADER)
            .map(|given| {
                given
                    .as_bytes()
                    .ct_eq(expected.expose_secret().as_bytes())
                    .into()
            })
            .unwrap_or(false)
    }
}

// ════════════════════════════════════════════════════════════════════════════
// HTTP handlers
// ════════════════════════════════════════════════════════════════════════════

/// POST /events - Handle one learner event
pub async fn handle_event(
    State(state): State<WebhookState>,
    headers: HeaderMap,
    Json(req): Json<EventRequest>,
) -> Response {
    if !state.authorized(&headers) {
        warn!("webhook request rejected: bad secret");
        return (StatusCode::UNAUTHORIZED, Json(ErrorResponse::unauthorized())).into_response();
    }

    let user = match UserId::new(req.user_id) {
        Ok(user) => user,
        Err(err) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(ErrorResponse::bad_request(err.to_string())),
            )
                .into_response()
        }
    };

    let event = req.event.into();
    let prompt = state.orchestrator.handle_event(&user, event).await;
    info!(user_id = %user, "event handled");

    let response = EventResponse {
        user_id: user.to_string(),
        prompt,
    };
    (StatusCode::OK, Json(response)).into_response()
}

/// GET /health - Liveness check
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}
