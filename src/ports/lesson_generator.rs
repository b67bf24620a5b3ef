//! Lesson generation and progress reporting ports.

use async_trait::async_trait;
use secrecy::SecretString;

use crate::domain::lesson::{LessonResponse, WordProgress};

use super::CollaboratorError;

/// Port for generating a lesson for an authenticated learner.
///
/// Cards come back in teaching order; the engine never reorders them.
#[async_trait]
pub trait LessonGenerator: Send + Sync {
    async fn generate_lesson(&self, token: &SecretString) -> Result<LessonResponse, CollaboratorError>;
}

/// Port for pushing per-word outcomes at lesson completion.
///
/// Fire-and-forget from the engine's side: failures are logged, not retried.
#[async_trait]
pub trait ProgressReporter: Send + Sync {
    async fn send_lesson_progress(
        &self,
        token: &SecretString,
        progress: &[WordProgress],
    ) -> Result<(), CollaboratorError>;
}
