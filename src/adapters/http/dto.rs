//! Wire types for the webhook endpoint.
//!
//! The transport posts one event per request and renders the returned
//! prompt however its chat platform wants.

use serde::{Deserialize, Serialize};

use crate::application::{InboundEvent, OutboundPrompt};

/// Request body of `POST /events`.
#[derive(Debug, Clone, Deserialize)]
pub struct EventRequest {
    pub user_id: String,
    pub event: EventPayload,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventPayload {
    /// Slash command name, with or without the leading `/`.
    Command { command: String },
    /// Callback data of a pressed button, e.g. `lesson:new`.
    Button { action: String },
    Text { text: String },
}

impl From<EventPayload> for InboundEvent {
    fn from(payload: EventPayload) -> Self {
        match payload {
            EventPayload::Command { command } => match command.parse() {
                Ok(cmd) => InboundEvent::Command(cmd),
                Err(_) => InboundEvent::Unrecognized(command),
            },
            EventPayload::Button { action } => InboundEvent::from_callback(&action),
            EventPayload::Text { text } => InboundEvent::from_message(&text),
        }
    }
}

/// Response body of `POST /events`.
#[derive(Debug, Clone, Serialize)]
pub struct EventResponse {
    pub user_id: String,
    pub prompt: OutboundPrompt,
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

/// Standard error body.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    pub code: String,
    pub message: String,
}

impl ErrorResponse {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            code: "BAD_REQUEST".to_string(),
            message: message.into(),
        }
    }

    pub fn unauthorized() -> Self {
        Self {
            code: "UNAUTHORIZED".to_string(),
            message: "Missing or invalid webhook secret".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::{ButtonAction, Command};

    fn parse(json: &str) -> InboundEvent {
        let request: EventRequest = serde_json::from_str(json).unwrap();
        request.event.into()
    }

    #[test]
    fn command_payload_accepts_bare_name() {
        let event = parse(r#"{"user_id":"7","event":{"type":"command","command":"learn"}}"#);
        assert_eq!(event, InboundEvent::Command(Command::Learn));
    }

    #[test]
    fn unknown_command_is_unrecognized() {
        let event = parse(r#"{"user_id":"7","event":{"type":"command","command":"dance"}}"#);
        assert_eq!(event, InboundEvent::Unrecognized("dance".to_string()));
    }

    #[test]
    fn button_payload_parses_callback_data() {
        let event = parse(r#"{"user_id":"7","event":{"type":"button","action":"lesson:new"}}"#);
        assert_eq!(event, InboundEvent::Button(ButtonAction::LessonNew));
    }

    #[test]
    fn text_payload_keeps_slash_commands() {
        let event = parse(r#"{"user_id":"7","event":{"type":"text","text":"/help"}}"#);
        assert_eq!(event, InboundEvent::Command(Command::Help));
        let event = parse(r#"{"user_id":"7","event":{"type":"text","text":"apple"}}"#);
        assert_eq!(event, InboundEvent::Text("apple".to_string()));
    }

    #[test]
    fn unknown_event_type_fails_to_parse() {
        let result: Result<EventRequest, _> =
            serde_json::from_str(r#"{"user_id":"7","event":{"type":"sticker"}}"#);
        assert!(result.is_err());
    }
}
