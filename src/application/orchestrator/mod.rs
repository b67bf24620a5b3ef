//! Lesson orchestrator - the conversational driver.
//!
//! One inbound event in, one outbound prompt out. For every event the
//! orchestrator loads the learner's state, validates the transition path the
//! event asks for, applies lesson mutations through the session store's
//! read-modify-write primitive and writes the final state once.
//!
//! ## Flows
//!
//! - `lesson_flow` - `/learn`, resume/restart, word sets, "already known"
//! - `exercise_flow` - answers, hints, skips, retry pass, completion
//! - `onboarding_flow` - `/start`, explanations, questionnaire
//! - `vocab_test_flow` - five-group level test
//! - `settings_flow` - words per day, level, reminders, learning goal
//! - `linking_flow` - account linking for learners without a token
//!
//! `handle_event` never fails: expected outcomes map to fallback prompts and
//! infrastructure failures map to an apology with a retry button, leaving the
//! stored state untouched.

mod events;
mod exercise_flow;
mod lesson_flow;
mod linking_flow;
mod onboarding_flow;
mod prompt;
mod screens;
mod settings_flow;
mod vocab_test_flow;

pub use events::{is_stop_phrase, ButtonAction, Command, InboundEvent, SettingsField};
pub use prompt::{OutboundPrompt, PromptButton};

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use secrecy::SecretString;
use tracing::{debug, error, warn};

use crate::config::SessionConfig;
use crate::domain::foundation::{StateMachine, UserId, ValidationError};
use crate::domain::fsm::UserState;
use crate::domain::lesson::{CefrLevel, LessonError, LessonProgress};
use crate::domain::onboarding::{Question, TopicSelection, UserPreferences, VocabTestData};
use crate::ports::{
    AccountLinker, CollaboratorError, LessonGenerator, PreferencesClient, ProgressReporter,
    SessionStore, SessionStoreError,
};

/// Bound applied to collaborator calls when none is configured.
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(30);

/// Temp data keys shared between flows.
pub(crate) mod temp_keys {
    pub const PREFERENCES: &str = "preferences";
    pub const VOCAB_TEST: &str = "vocab_test";
    pub const CEFR_LEVEL: &str = "cefr_level";
    pub const TOPICS: &str = "topic_selection";
}

/// Errors raised while handling one event. Never leaves the orchestrator.
#[derive(Debug, thiserror::Error)]
pub enum OrchestratorError {
    #[error(transparent)]
    Store(#[from] SessionStoreError),

    #[error(transparent)]
    Collaborator(#[from] CollaboratorError),

    /// Completion could not be reported; the lesson stays stored.
    #[error("progress sync failed: {0}")]
    ProgressSync(CollaboratorError),

    #[error("invalid transition from {from} to {to}")]
    InvalidTransition { from: UserState, to: UserState },

    #[error(transparent)]
    Lesson(#[from] LessonError),

    #[error(transparent)]
    Validation(#[from] ValidationError),
}

type FlowResult = Result<OutboundPrompt, OrchestratorError>;

/// External collaborators the orchestrator calls.
#[derive(Clone)]
pub struct Collaborators {
    pub lessons: Arc<dyn LessonGenerator>,
    pub progress: Arc<dyn ProgressReporter>,
    pub linker: Arc<dyn AccountLinker>,
    pub preferences: Arc<dyn PreferencesClient>,
}

impl Collaborators {
    /// Uses one backend for every collaborator port.
    pub fn from_backend<B>(backend: Arc<B>) -> Self
    where
        B: LessonGenerator + ProgressReporter + AccountLinker + PreferencesClient + 'static,
    {
        Self {
            lessons: backend.clone(),
            progress: backend.clone(),
            linker: backend.clone(),
            preferences: backend,
        }
    }
}

pub struct LessonOrchestrator {
    store: Arc<dyn SessionStore>,
    collaborators: Collaborators,
    ttls: SessionConfig,
    call_timeout: Duration,
}

impl LessonOrchestrator {
    pub fn new(store: Arc<dyn SessionStore>, collaborators: Collaborators, ttls: SessionConfig) -> Self {
        Self {
            store,
            collaborators,
            ttls,
            call_timeout: DEFAULT_CALL_TIMEOUT,
        }
    }

    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = timeout;
        self
    }

    /// Handles one event for `user`, loading their current state first.
    pub async fn handle_event(&self, user: &UserId, event: InboundEvent) -> OutboundPrompt {
        match self.store.get_state(user).await {
            Ok(state) => self.handle_event_in_state(user, state, event).await,
            Err(err) => {
                warn!(user_id = %user, error = %err, "could not load user state");
                screens::apology(event.retry_action())
            }
        }
    }

    /// Handles one event as if `user` were in `state`.
    pub async fn handle_event_in_state(
        &self,
        user: &UserId,
        state: UserState,
        event: InboundEvent,
    ) -> OutboundPrompt {
        debug!(user_id = %user, from = %state, event = event.kind(), "handling event");
        match self.dispatch(user, state, &event).await {
            Ok(prompt) => prompt,
            Err(err) => self.recover(user, state, &event, err).await,
        }
    }

    async fn dispatch(&self, user: &UserId, state: UserState, event: &InboundEvent) -> FlowResult {
        match event {
            InboundEvent::Command(cmd) => self.run_command(user, state, *cmd).await,
            InboundEvent::Button(action) => self.press(user, state, action).await,
            InboundEvent::Text(text) => self.on_text(user, state, text).await,
            InboundEvent::Unrecognized(raw) => {
                debug!(user_id = %user, input = %raw, "unrecognized input");
                self.reprompt(user, state, "🤔 I didn't understand that.").await
            }
        }
    }

    async fn run_command(&self, user: &UserId, state: UserState, cmd: Command) -> FlowResult {
        match cmd {
            Command::Start => self.start(user, state).await,
            Command::Learn => self.learn(user, state).await,
            Command::Cancel => self.cancel(user, state).await,
            Command::Help => {
                self.move_along(user, state, &[UserState::Help]).await?;
                Ok(screens::help())
            }
            Command::Settings => self.open_settings(user, state).await,
            Command::Test => self.open_vocab_test(user, state).await,
            Command::Stats => self.show_stats(user).await,
        }
    }

    async fn press(&self, user: &UserId, state: UserState, action: &ButtonAction) -> FlowResult {
        use ButtonAction as B;
        match action {
            B::Run(cmd) => self.run_command(user, state, *cmd).await,
            B::MainMenu => {
                self.move_along(user, state, &to_start(state)).await?;
                Ok(screens::main_menu())
            }
            B::OnboardingNext => self.onboarding_next(user, state).await,
            B::QuestionAnswer { question, value } => {
                self.answer_question(user, state, *question, value).await
            }

            B::TestStart => self.start_vocab_test(user, state).await,
            B::TestSkip => self.skip_vocab_test(user, state).await,
            B::TestAnswer(i) => self.answer_vocab_test(user, state, Some(*i)).await,
            B::TestDontKnow => self.answer_vocab_test(user, state, None).await,
            B::TestStop => self.finish_vocab_test(user, state).await,
            B::TestContinue => self.continue_vocab_test(user, state).await,

            B::LessonNew => self.learn(user, state).await,
            B::LessonRestart => self.restart_lesson(user, state).await,
            B::LessonContinue => {
                self.start_word_set(user, state, &[UserState::LessonInProgress]).await
            }
            B::LessonStartWordSet | B::LessonNextSet => self.start_word_set(user, state, &[]).await,
            B::LessonShowWord(i) => self.show_word(user, state, *i).await,
            B::LessonAlreadyKnow { slot, word_id } => {
                self.already_know(user, state, *slot, word_id).await
            }
            B::LessonReady => self.ready_for_exercises(user, state).await,
            B::LessonStats => self.show_stats(user).await,
            B::LessonFinish => self.finish_lesson(user, state).await,

            B::ExerciseStart => self.start_exercises(user, state).await,
            B::ExercisePickOption { option, turn } => {
                self.pick_option(user, state, *option, *turn).await
            }
            B::ExerciseSkip { turn } => self.skip_exercise(user, state, *turn).await,
            B::ExerciseHint => self.show_hint(user, state).await,

            B::SettingsEdit(field) => self.edit_setting(user, state, *field).await,
            B::SettingsSetWords(n) => self.set_words_per_day(user, state, *n).await,
            B::SettingsSetLevel(level) => self.set_level(user, state, *level).await,
            B::SettingsSetNotifications(on) => self.set_notifications(user, state, *on).await,
            B::SettingsSetTime(time) => self.set_notification_time(user, state, time).await,
            B::SettingsTopicPage(page) => self.show_topic_page(user, state, *page).await,
            B::SettingsSetTopic(i) => self.set_topic(user, state, *i).await,
            B::SettingsBack => self.settings_back(user, state).await,

            B::LinkCheck => self.check_link(user, state).await,
            B::LinkNew => self.new_link(user, state).await,
        }
    }

    async fn on_text(&self, user: &UserId, state: UserState, text: &str) -> FlowResult {
        if is_stop_phrase(text) {
            return self.cancel(user, state).await;
        }
        match state {
            UserState::WaitingForTextInput => return self.answer_text(user, state, text).await,
            UserState::SettingsNotificationTime => {
                return self.type_notification_time(user, state, text).await
            }
            _ => {}
        }
        self.reprompt(user, state, "👇 Please use the buttons below.").await
    }

    /// `/cancel` and stop phrases: back to start, lesson progress kept.
    async fn cancel(&self, user: &UserId, state: UserState) -> FlowResult {
        if state == UserState::Start {
            return Ok(screens::main_menu());
        }
        self.move_along(user, state, &[UserState::Cancel, UserState::Start])
            .await?;
        Ok(screens::cancelled())
    }

    async fn recover(
        &self,
        user: &UserId,
        state: UserState,
        event: &InboundEvent,
        err: OrchestratorError,
    ) -> OutboundPrompt {
        let outcome = match &err {
            OrchestratorError::Lesson(e) => Some(e.clone()),
            OrchestratorError::Store(e) => e.lesson_error(),
            _ => None,
        };
        if let Some(outcome) = outcome {
            debug!(user_id = %user, from = %state, outcome = %outcome, "lesson outcome");
            return match outcome {
                LessonError::NoActiveLesson => screens::no_active_lesson(),
                _ => self.reprompt_or_apologize(user, state, screens::not_available_note()).await,
            };
        }

        match err {
            OrchestratorError::InvalidTransition { from, to } => {
                debug!(user_id = %user, %from, %to, "transition rejected");
                self.reprompt_or_apologize(user, state, screens::not_available_note())
                    .await
            }
            OrchestratorError::Validation(e) => {
                debug!(user_id = %user, from = %state, error = %e, "invalid input");
                self.reprompt_or_apologize(user, state, screens::not_available_note())
                    .await
            }
            OrchestratorError::ProgressSync(e) => {
                warn!(user_id = %user, error = %e, "lesson progress sync failed");
                screens::apology(Some(ButtonAction::LessonFinish))
            }
            OrchestratorError::Store(e) if e.is_infrastructure() => {
                error!(user_id = %user, from = %state, error = %e, "session store failed");
                screens::apology(event.retry_action())
            }
            other => {
                warn!(user_id = %user, from = %state, error = %other, "event failed");
                screens::apology(event.retry_action())
            }
        }
    }

    async fn reprompt(&self, user: &UserId, state: UserState, note: &str) -> FlowResult {
        Ok(self.render_state(user, state).await?.with_note(note))
    }

    async fn reprompt_or_apologize(&self, user: &UserId, state: UserState, note: &str) -> OutboundPrompt {
        match self.reprompt(user, state, note).await {
            Ok(prompt) => prompt,
            Err(err) => {
                warn!(user_id = %user, from = %state, error = %err, "could not render state");
                screens::apology(None)
            }
        }
    }

    /// Prompt for the screen `state` stands for, built from stored data.
    async fn render_state(&self, user: &UserId, state: UserState) -> FlowResult {
        use UserState as S;
        let prompt = match state {
            S::Start | S::Cancel | S::Retry | S::ErrorRecovery | S::LessonComplete => {
                screens::main_menu()
            }
            S::Help => screens::help(),
            S::Error => screens::error_state(),

            S::Welcome => screens::welcome(),
            S::MethodExplanation => screens::method_explanation(),
            S::SpacedRepetition => screens::spaced_repetition(),
            S::Questionnaire => screens::questionnaire_intro(),
            S::QuestionGoal | S::QuestionConfidence | S::QuestionHabits | S::QuestionExperience => {
                Question::for_state(state)
                    .map(screens::question)
                    .unwrap_or_else(screens::questionnaire_intro)
            }

            S::VocabularyTest => screens::vocab_test_intro(),
            S::TestGroup1
            | S::TestGroup2
            | S::TestGroup3
            | S::TestGroup4
            | S::TestGroup5
            | S::LevelProcessing => match self.vocab_test_data(user).await? {
                Some(data) => screens::test_question(&data),
                None => screens::vocab_test_intro(),
            },
            S::LevelResult => {
                let level = self
                    .temp_value::<CefrLevel>(user, temp_keys::CEFR_LEVEL)
                    .await?
                    .unwrap_or(CefrLevel::A1);
                screens::level_result(level, None)
            }

            S::LessonStart
            | S::LessonInProgress
            | S::ShowingWordSet
            | S::ShowingWord1
            | S::ShowingWord2
            | S::ShowingWord3
            | S::ReadyForExercises
            | S::DoingExercises
            | S::ExerciseInProgress
            | S::WaitingForTextInput
            | S::SetComplete => match self.store.get_lesson_progress(user).await? {
                Some(progress) => render_lesson_state(&progress, state),
                None => screens::no_active_lesson(),
            },

            S::Settings => screens::settings(&self.preferences(user).await?),
            S::SettingsWordsPerDay => {
                screens::words_per_day_options(self.preferences(user).await?.words_per_day)
            }
            S::SettingsCefrLevel => screens::level_options(self.preferences(user).await?.cefr_level),
            S::SettingsNotifications => screens::notification_options(&self.preferences(user).await?),
            S::SettingsNotificationTime => screens::notification_time_input(),
            S::SettingsTopicSelection => {
                match self.temp_value::<TopicSelection>(user, temp_keys::TOPICS).await? {
                    Some(selection) => screens::topic_page(&selection),
                    None => screens::settings(&self.preferences(user).await?),
                }
            }

            S::AccountLinking | S::WaitingForLink => {
                let link = self.store.get_user_linking_data(user).await?;
                screens::link_prompt(link.as_ref())
            }
            S::AccountLinked => screens::account_linked(),
        };
        Ok(prompt)
    }

    /// Validates `path` from `from` and stores its last state.
    ///
    /// Nothing is written when any hop is invalid or the path ends where it
    /// started.
    async fn move_along(
        &self,
        user: &UserId,
        from: UserState,
        path: &[UserState],
    ) -> Result<UserState, OrchestratorError> {
        let target = check_path(from, path)?;
        if target != from {
            self.store.set_state(user, target).await?;
            debug!(user_id = %user, %from, to = %target, "state changed");
        }
        Ok(target)
    }

    /// Runs a collaborator call under the configured time bound.
    async fn bounded<T, F>(&self, call: F) -> Result<T, CollaboratorError>
    where
        F: Future<Output = Result<T, CollaboratorError>>,
    {
        match tokio::time::timeout(self.call_timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(CollaboratorError::timeout(self.call_timeout.as_secs())),
        }
    }

    async fn jwt(&self, user: &UserId) -> Result<Option<SecretString>, SessionStoreError> {
        self.store.get_jwt_token(user).await
    }

    async fn progress(&self, user: &UserId) -> Result<LessonProgress, OrchestratorError> {
        self.store
            .get_lesson_progress(user)
            .await?
            .ok_or(OrchestratorError::Lesson(LessonError::NoActiveLesson))
    }

    async fn temp_value<T: serde::de::DeserializeOwned>(
        &self,
        user: &UserId,
        key: &str,
    ) -> Result<Option<T>, SessionStoreError> {
        match self.store.get_temp_data(user, key).await? {
            Some(value) => Ok(Some(serde_json::from_value(value)?)),
            None => Ok(None),
        }
    }

    async fn store_temp_value<T: serde::Serialize>(
        &self,
        user: &UserId,
        key: &str,
        value: &T,
        ttl: Duration,
    ) -> Result<(), SessionStoreError> {
        let value = serde_json::to_value(value)?;
        self.store.store_temp_data(user, key, &value, ttl).await
    }

    async fn vocab_test_data(&self, user: &UserId) -> Result<Option<VocabTestData>, SessionStoreError> {
        self.temp_value(user, temp_keys::VOCAB_TEST).await
    }

    async fn preferences(&self, user: &UserId) -> Result<UserPreferences, SessionStoreError> {
        Ok(self
            .temp_value(user, temp_keys::PREFERENCES)
            .await?
            .unwrap_or_default())
    }
}

impl std::fmt::Debug for LessonOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LessonOrchestrator")
            .field("ttls", &self.ttls)
            .field("call_timeout", &self.call_timeout)
            .finish_non_exhaustive()
    }
}

fn render_lesson_state(progress: &LessonProgress, state: UserState) -> OutboundPrompt {
    use UserState as S;
    match state {
        S::LessonStart | S::LessonInProgress => {
            if progress.current_set_index == 0 {
                screens::lesson_ready(progress)
            } else {
                screens::resume_offer(progress)
            }
        }
        S::ShowingWordSet => screens::word_set(progress),
        S::ReadyForExercises => screens::ready_for_exercises(progress),
        S::DoingExercises | S::ExerciseInProgress | S::WaitingForTextInput => {
            screens::exercise(progress, false).unwrap_or_else(|| screens::set_complete(progress))
        }
        S::SetComplete => screens::set_complete(progress),
        other => match other.word_slot() {
            Some(slot) => screens::word_card(progress, slot),
            None => screens::resume_offer(progress),
        },
    }
}

/// Validates every hop of `path` starting at `from`; returns the last state.
///
/// The error names the first rejected hop.
fn check_path(from: UserState, path: &[UserState]) -> Result<UserState, OrchestratorError> {
    from.transition_through(path).map_err(|_| {
        let (from, to) = std::iter::once(from)
            .chain(path.iter().copied())
            .zip(path.iter().copied())
            .find(|(current, next)| !current.can_transition_to(next))
            .unwrap_or((from, from));
        OrchestratorError::InvalidTransition { from, to }
    })
}

/// Shortest path from `from` back to `start`.
fn to_start(from: UserState) -> Vec<UserState> {
    if from == UserState::Start {
        Vec::new()
    } else if from.can_transition_to(&UserState::Start) {
        vec![UserState::Start]
    } else {
        vec![UserState::Cancel, UserState::Start]
    }
}

/// Path reaching `rest` directly when allowed, otherwise through `start`.
///
/// A leading hop equal to `from` is dropped.
fn via_start(from: UserState, rest: &[UserState]) -> Vec<UserState> {
    let rest = match rest.split_first() {
        Some((first, tail)) if *first == from => tail,
        _ => rest,
    };
    let Some(first) = rest.first() else {
        return Vec::new();
    };
    if from.can_transition_to(first) {
        return rest.to_vec();
    }
    let mut path = to_start(from);
    path.extend_from_slice(rest);
    path
}

/// Path from an exercise-side state to lesson completion and back to start.
fn completion_path(from: UserState) -> Vec<UserState> {
    if from.can_transition_to(&UserState::LessonComplete) {
        vec![UserState::LessonComplete, UserState::Start]
    } else {
        vec![
            UserState::SetComplete,
            UserState::LessonComplete,
            UserState::Start,
        ]
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::Harness;
    use super::*;
    use crate::domain::lesson::test_support::lesson;

    #[test]
    fn path_validation_reports_failing_hop() {
        let err = check_path(
            UserState::Start,
            &[UserState::LessonStart, UserState::ShowingWord2],
        )
        .unwrap_err();
        assert!(matches!(
            err,
            OrchestratorError::InvalidTransition {
                from: UserState::LessonStart,
                to: UserState::ShowingWord2
            }
        ));
    }

    #[test]
    fn via_start_prefers_direct_hop() {
        assert_eq!(
            via_start(UserState::LevelResult, &[UserState::LessonStart]),
            vec![UserState::LessonStart]
        );
        assert_eq!(
            via_start(UserState::SetComplete, &[UserState::Settings]),
            vec![UserState::Cancel, UserState::Start, UserState::Settings]
        );
        assert_eq!(
            via_start(UserState::Help, &[UserState::Settings]),
            vec![UserState::Start, UserState::Settings]
        );
        assert!(via_start(UserState::Settings, &[UserState::Settings]).is_empty());
    }

    #[test]
    fn completion_path_is_always_valid() {
        for from in [
            UserState::ExerciseInProgress,
            UserState::WaitingForTextInput,
            UserState::ShowingWord2,
            UserState::SetComplete,
        ] {
            assert!(check_path(from, &completion_path(from)).is_ok(), "{}", from);
        }
    }

    #[tokio::test]
    async fn unrecognized_input_reprompts_current_state() {
        let h = Harness::new(lesson(3, 3));
        let prompt = h
            .orchestrator
            .handle_event(&h.user, InboundEvent::from_callback("bogus:data"))
            .await;
        assert!(prompt.text.starts_with("🤔"));
        assert!(prompt.has_action(&ButtonAction::Run(Command::Learn)));
        assert_eq!(h.state().await, UserState::Start);
    }

    #[tokio::test]
    async fn unavailable_store_apologizes_with_retry() {
        let h = Harness::new(lesson(3, 3));
        h.store.set_unavailable(true);
        let prompt = h.command(Command::Learn).await;
        assert!(prompt.text.contains("Sorry"));
        assert!(prompt.has_action(&ButtonAction::Run(Command::Learn)));
    }

    #[tokio::test]
    async fn help_and_back_to_menu() {
        let h = Harness::new(lesson(3, 3));
        let prompt = h.command(Command::Help).await;
        assert!(prompt.text.contains("/learn"));
        assert_eq!(h.state().await, UserState::Help);

        h.press(ButtonAction::MainMenu).await;
        assert_eq!(h.state().await, UserState::Start);
    }

    #[tokio::test]
    async fn stop_phrase_cancels() {
        let h = Harness::new(lesson(3, 3));
        h.set_state(UserState::Settings).await;
        let prompt = h.text("стоп").await;
        assert!(prompt.text.contains("Cancelled"));
        assert_eq!(h.state().await, UserState::Start);
    }

    #[tokio::test]
    async fn free_text_outside_exercises_is_ignored() {
        let h = Harness::new(lesson(3, 3));
        h.set_state(UserState::Settings).await;
        let prompt = h.text("hello").await;
        assert!(prompt.text.starts_with("👇"));
        assert_eq!(h.state().await, UserState::Settings);
    }

    #[tokio::test]
    async fn slow_collaborator_is_cut_off() {
        let h = Harness::new(lesson(3, 3));
        let orchestrator = LessonOrchestrator::new(
            h.store.clone(),
            Collaborators::from_backend(h.backend.clone()),
            SessionConfig::default(),
        )
        .with_call_timeout(Duration::from_millis(10));
        let result = orchestrator
            .bounded(async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok::<_, CollaboratorError>(())
            })
            .await;
        assert!(matches!(result, Err(CollaboratorError::Timeout { .. })));
    }
}
