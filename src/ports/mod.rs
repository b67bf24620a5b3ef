//! Ports - Interfaces for external dependencies.
//!
//! Following hexagonal architecture, ports define the contracts between
//! the engine and the outside world. Adapters implement these ports.
//!
//! ## Storage
//!
//! - `SessionStore` - per-user FSM state, lesson progress, temp data, tokens
//!
//! ## Collaborators
//!
//! - `LessonGenerator` - builds a lesson for an authenticated learner
//! - `ProgressReporter` - receives per-word outcomes at lesson completion
//! - `AccountLinker` - links a chat identity to a backend account
//! - `PreferencesClient` - saves words-per-day, level and notification settings

mod account_linker;
mod collaborator;
mod lesson_generator;
mod session_store;

pub use account_linker::{AccountLinker, LinkStatus, LinkToken, PreferencesClient};
pub use collaborator::CollaboratorError;
pub use lesson_generator::{LessonGenerator, ProgressReporter};
pub use session_store::{LessonMutator, SessionStore, SessionStoreError};
