//! Domain layer containing business logic and domain types.
//!
//! # Module Organization
//!
//! - `foundation` - Shared primitives (ids, timestamps, validation errors)
//! - `fsm` - Conversation states and the allowed transitions between them
//! - `lesson` - Lesson payload, progress tracking and spaced-repetition rules
//! - `onboarding` - Questionnaire, vocabulary test and learner preferences

pub mod foundation;
pub mod fsm;
pub mod lesson;
pub mod onboarding;
