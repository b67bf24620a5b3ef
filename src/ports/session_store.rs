//! Session Store Port - per-user conversation state.
//!
//! Everything the engine remembers about a learner lives behind this port:
//! the FSM state, the in-flight lesson, transient questionnaire and test
//! answers, and auth correlation data. Every entry expires on its own.
//!
//! # Lesson progress mutation
//!
//! `update_lesson_progress` is the only sanctioned way to change a stored
//! `LessonProgress`. Implementations must make the read-modify-write atomic
//! per user (a per-user lock or compare-and-swap), and must write nothing
//! when the mutator fails.

use async_trait::async_trait;
use secrecy::SecretString;
use std::time::Duration;

use crate::domain::foundation::UserId;
use crate::domain::fsm::UserState;
use crate::domain::lesson::{LessonError, LessonProgress};

use super::LinkToken;

/// Transform applied to a loaded `LessonProgress`.
///
/// Returning an error aborts the update and leaves the stored value as is.
pub type LessonMutator<'a> =
    &'a mut (dyn FnMut(&mut LessonProgress) -> Result<(), LessonError> + Send);

/// Errors from session storage operations.
#[derive(Debug, thiserror::Error)]
pub enum SessionStoreError {
    /// Backend unreachable or command failed.
    #[error("session store unavailable: {0}")]
    Unavailable(String),

    /// Stored value could not be encoded or decoded.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// The per-user lock could not be acquired in time.
    #[error("timed out waiting for session lock of user {0}")]
    LockTimeout(UserId),

    /// `update_lesson_progress` found nothing to update.
    #[error("no active lesson")]
    NoActiveLesson,

    /// The mutator refused the update.
    #[error("update rejected: {0}")]
    Rejected(LessonError),
}

impl SessionStoreError {
    /// The domain outcome behind a rejected or missing-lesson update.
    pub fn lesson_error(&self) -> Option<LessonError> {
        match self {
            SessionStoreError::Rejected(err) => Some(err.clone()),
            SessionStoreError::NoActiveLesson => Some(LessonError::NoActiveLesson),
            _ => None,
        }
    }

    /// True for infrastructure failures (as opposed to domain outcomes).
    pub fn is_infrastructure(&self) -> bool {
        matches!(
            self,
            SessionStoreError::Unavailable(_)
                | SessionStoreError::Serialization(_)
                | SessionStoreError::LockTimeout(_)
        )
    }
}

impl From<serde_json::Error> for SessionStoreError {
    fn from(err: serde_json::Error) -> Self {
        SessionStoreError::Serialization(err.to_string())
    }
}

/// Port for per-user session persistence.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Current FSM state; `Start` for a learner with nothing stored.
    async fn get_state(&self, user: &UserId) -> Result<UserState, SessionStoreError>;

    async fn set_state(&self, user: &UserId, state: UserState) -> Result<(), SessionStoreError>;

    /// In-flight lesson, or `None` when no lesson is active.
    async fn get_lesson_progress(
        &self,
        user: &UserId,
    ) -> Result<Option<LessonProgress>, SessionStoreError>;

    /// Stores a whole `LessonProgress`, replacing any existing one.
    ///
    /// Only for a freshly generated lesson; later changes go through
    /// `update_lesson_progress`.
    async fn store_lesson_progress(
        &self,
        user: &UserId,
        progress: &LessonProgress,
        ttl: Duration,
    ) -> Result<(), SessionStoreError>;

    async fn clear_lesson_progress(&self, user: &UserId) -> Result<(), SessionStoreError>;

    /// Atomically loads, mutates and stores the learner's lesson progress.
    ///
    /// Returns the stored result. Fails with `NoActiveLesson` when nothing
    /// is stored and with `Rejected` when the mutator fails.
    async fn update_lesson_progress(
        &self,
        user: &UserId,
        mutator: LessonMutator<'_>,
    ) -> Result<LessonProgress, SessionStoreError>;

    async fn get_temp_data(
        &self,
        user: &UserId,
        key: &str,
    ) -> Result<Option<serde_json::Value>, SessionStoreError>;

    async fn store_temp_data(
        &self,
        user: &UserId,
        key: &str,
        value: &serde_json::Value,
        ttl: Duration,
    ) -> Result<(), SessionStoreError>;

    async fn clear_temp_data(&self, user: &UserId, key: &str) -> Result<(), SessionStoreError>;

    /// Backend token for the learner's linked account, if any.
    async fn get_jwt_token(&self, user: &UserId) -> Result<Option<SecretString>, SessionStoreError>;

    async fn store_jwt_token(
        &self,
        user: &UserId,
        token: &SecretString,
        ttl: Duration,
    ) -> Result<(), SessionStoreError>;

    /// Remembers a pending account-link token.
    async fn store_user_linking_data(
        &self,
        user: &UserId,
        link: &LinkToken,
        ttl: Duration,
    ) -> Result<(), SessionStoreError>;

    async fn get_user_linking_data(
        &self,
        user: &UserId,
    ) -> Result<Option<LinkToken>, SessionStoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejected_update_exposes_lesson_error() {
        let err = SessionStoreError::Rejected(LessonError::DailyLimitReached);
        assert_eq!(err.lesson_error(), Some(LessonError::DailyLimitReached));
        assert!(!err.is_infrastructure());
    }

    #[test]
    fn missing_lesson_maps_to_no_active_lesson() {
        assert_eq!(
            SessionStoreError::NoActiveLesson.lesson_error(),
            Some(LessonError::NoActiveLesson)
        );
    }

    #[test]
    fn unavailable_is_infrastructure() {
        let err = SessionStoreError::Unavailable("connection refused".into());
        assert!(err.is_infrastructure());
        assert_eq!(err.lesson_error(), None);
    }
}
