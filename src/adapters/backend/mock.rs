//! Scripted backend for tests and local development.
//!
//! Serves one canned lesson, records every call, and can be told to fail
//! any port with a given `CollaboratorError`.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use tokio::sync::Mutex;

use crate::domain::foundation::UserId;
use crate::domain::lesson::{LessonResponse, WordProgress};
use crate::domain::onboarding::UserPreferences;
use crate::ports::{
    AccountLinker, CollaboratorError, LessonGenerator, LinkStatus, LinkToken, PreferencesClient,
    ProgressReporter,
};

/// One recorded preference push.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreferenceUpdate {
    pub preferences: UserPreferences,
    pub goal: Option<String>,
}

#[derive(Debug, Default)]
struct MockState {
    lesson: Option<LessonResponse>,
    lesson_failure: Option<CollaboratorError>,
    progress_failure: Option<CollaboratorError>,
    link_failure: Option<CollaboratorError>,
    linked_token: Option<String>,
    lessons_generated: usize,
    tokens_seen: Vec<String>,
    reported: Vec<Vec<WordProgress>>,
    preference_updates: Vec<PreferenceUpdate>,
    topics: Vec<String>,
    links_created: Vec<UserId>,
}

#[derive(Debug, Default)]
pub struct MockBackend {
    state: Mutex<MockState>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_lesson(lesson: LessonResponse) -> Self {
        Self {
            state: Mutex::new(MockState {
                lesson: Some(lesson),
                ..Default::default()
            }),
        }
    }

    pub async fn set_lesson(&self, lesson: LessonResponse) {
        self.state.lock().await.lesson = Some(lesson);
    }

    pub async fn fail_lessons_with(&self, error: Option<CollaboratorError>) {
        self.state.lock().await.lesson_failure = error;
    }

    pub async fn fail_progress_with(&self, error: Option<CollaboratorError>) {
        self.state.lock().await.progress_failure = error;
    }

    /// Goal topics served by `list_topics`.
    pub async fn set_topics<I, S>(&self, topics: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.state.lock().await.topics = topics.into_iter().map(Into::into).collect();
    }

    pub async fn fail_links_with(&self, error: Option<CollaboratorError>) {
        self.state.lock().await.link_failure = error;
    }

    /// Completes any pending link; `check_link` then returns this token.
    pub async fn complete_link(&self, jwt: impl Into<String>) {
        self.state.lock().await.linked_token = Some(jwt.into());
    }

    pub async fn lessons_generated(&self) -> usize {
        self.state.lock().await.lessons_generated
    }

    /// Bearer tokens presented to learner endpoints, in call order.
    pub async fn tokens_seen(&self) -> Vec<String> {
        self.state.lock().await.tokens_seen.clone()
    }

    pub async fn reported_progress(&self) -> Vec<Vec<WordProgress>> {
        self.state.lock().await.reported.clone()
    }

    pub async fn preference_updates(&self) -> Vec<PreferenceUpdate> {
        self.state.lock().await.preference_updates.clone()
    }

    pub async fn links_created(&self) -> Vec<UserId> {
        self.state.lock().await.links_created.clone()
    }
}

#[async_trait]
impl LessonGenerator for MockBackend {
    async fn generate_lesson(&self, token: &SecretString) -> Result<LessonResponse, CollaboratorError> {
        let mut state = self.state.lock().await;
        state.tokens_seen.push(token.expose_secret().clone());
        if let Some(err) = state.lesson_failure.clone() {
            return Err(err);
        }
        let lesson = state
            .lesson
            .clone()
            .ok_or_else(|| CollaboratorError::status(404, "no lesson scripted"))?;
        state.lessons_generated += 1;
        Ok(lesson)
    }
}

#[async_trait]
impl ProgressReporter for MockBackend {
    async fn send_lesson_progress(
        &self,
        token: &SecretString,
        progress: &[WordProgress],
    ) -> Result<(), CollaboratorError> {
        let mut state = self.state.lock().await;
        state.tokens_seen.push(token.expose_secret().clone());
        if let Some(err) = state.progress_failure.clone() {
            return Err(err);
        }
        state.reported.push(progress.to_vec());
        Ok(())
    }
}

#[async_trait]
impl AccountLinker for MockBackend {
    async fn create_link(&self, user: &UserId) -> Result<LinkToken, CollaboratorError> {
        let mut state = self.state.lock().await;
        if let Some(err) = state.link_failure.clone() {
            return Err(err);
        }
        state.links_created.push(user.clone());
        let token = format!("link-{}", user);
        Ok(LinkToken {
            link_url: format!("https://fluently.test/link/{}", token),
            token,
            expires_at: None,
        })
    }

    async fn check_link(&self, _user: &UserId) -> Result<LinkStatus, CollaboratorError> {
        let state = self.state.lock().await;
        if let Some(err) = state.link_failure.clone() {
            return Err(err);
        }
        Ok(LinkStatus {
            is_linked: state.linked_token.is_some(),
            jwt_token: state.linked_token.clone().map(SecretString::new),
        })
    }
}

#[async_trait]
impl PreferencesClient for MockBackend {
    async fn update_preferences(
        &self,
        token: &SecretString,
        preferences: &UserPreferences,
        goal: Option<&str>,
    ) -> Result<(), CollaboratorError> {
        let mut state = self.state.lock().await;
        state.tokens_seen.push(token.expose_secret().clone());
        state.preference_updates.push(PreferenceUpdate {
            preferences: preferences.clone(),
            goal: goal.map(str::to_string),
        });
        Ok(())
    }

    async fn list_topics(&self, token: &SecretString) -> Result<Vec<String>, CollaboratorError> {
        let mut state = self.state.lock().await;
        state.tokens_seen.push(token.expose_secret().clone());
        Ok(state.topics.clone())
    }
}
