//! `/start`, the onboarding explanations and the questionnaire.

use crate::domain::foundation::{UserId, ValidationError};
use crate::domain::fsm::UserState;
use crate::domain::onboarding::Question;

use super::{
    screens, temp_keys, to_start, via_start, FlowResult, LessonOrchestrator, OrchestratorError,
};

impl LessonOrchestrator {
    /// New learners get the walkthrough; returning ones the main menu.
    pub(super) async fn start(&self, user: &UserId, state: UserState) -> FlowResult {
        let returning = self.jwt(user).await?.is_some()
            || self
                .store
                .get_temp_data(user, temp_keys::PREFERENCES)
                .await?
                .is_some();

        if returning {
            self.move_along(user, state, &to_start(state)).await?;
            return Ok(screens::main_menu());
        }

        self.move_along(user, state, &via_start(state, &[UserState::Welcome]))
            .await?;
        Ok(screens::welcome())
    }

    pub(super) async fn onboarding_next(&self, user: &UserId, state: UserState) -> FlowResult {
        let (path, prompt) = match state {
            UserState::Welcome => (
                vec![UserState::MethodExplanation],
                screens::method_explanation(),
            ),
            UserState::MethodExplanation => (
                vec![UserState::SpacedRepetition],
                screens::spaced_repetition(),
            ),
            UserState::SpacedRepetition => (
                vec![UserState::Questionnaire, UserState::QuestionGoal],
                screens::question(Question::Goal),
            ),
            UserState::Questionnaire => {
                (vec![UserState::QuestionGoal], screens::question(Question::Goal))
            }
            other => {
                return Err(OrchestratorError::InvalidTransition {
                    from: other,
                    to: UserState::MethodExplanation,
                })
            }
        };
        self.move_along(user, state, &path).await?;
        Ok(prompt)
    }

    /// Stores one questionnaire answer and asks the next question.
    pub(super) async fn answer_question(
        &self,
        user: &UserId,
        state: UserState,
        question: Question,
        value: &str,
    ) -> FlowResult {
        let next_state = question
            .next()
            .map(|q| q.state())
            .unwrap_or(UserState::VocabularyTest);
        if state != question.state() {
            return Err(OrchestratorError::InvalidTransition {
                from: state,
                to: next_state,
            });
        }
        question.validate(value)?;

        self.store_temp_value(user, &question.temp_key(), &value, self.ttls.temp_ttl())
            .await?;

        if question == Question::Habits {
            let words: u8 = value.parse().map_err(|_| {
                ValidationError::invalid_format("words_per_day", format!("not a number: {}", value))
            })?;
            let mut preferences = self.preferences(user).await?;
            preferences.set_words_per_day(words)?;
            self.save_preferences(user, &preferences).await?;
        }

        self.move_along(user, state, &[next_state]).await?;
        Ok(match question.next() {
            Some(next) => screens::question(next),
            None => screens::vocab_test_intro(),
        })
    }
}
