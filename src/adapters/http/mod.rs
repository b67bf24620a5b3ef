//! HTTP adapter - the webhook a chat transport posts learner events to.

mod dto;
mod handlers;
mod routes;

pub use dto::{EventPayload, EventRequest, EventResponse};
pub use handlers::{WebhookState, SECRET_HEADER};
pub use routes::webhook_routes;
