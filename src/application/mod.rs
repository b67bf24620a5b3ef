//! Application layer - the conversation orchestrator.
//!
//! Turns one inbound learner event into state transitions, collaborator
//! calls and a single outbound prompt.

pub mod orchestrator;

pub use orchestrator::{
    ButtonAction, Collaborators, Command, InboundEvent, LessonOrchestrator, OrchestratorError,
    OutboundPrompt, PromptButton, SettingsField,
};
