//! Vocabulary level test: five groups, early stop, level result.

use tracing::info;

use crate::domain::foundation::UserId;
use crate::domain::fsm::UserState;
use crate::domain::lesson::{CefrLevel, LessonError};
use crate::domain::onboarding::{Question, TestAnswer, TestStep, VocabTestData};

use super::{
    check_path, screens, temp_keys, to_start, via_start, FlowResult, LessonOrchestrator,
    OrchestratorError,
};

const OPTIONS_PER_QUESTION: usize = 4;

/// Level implied by the self-assessment when the test is skipped.
fn level_from_confidence(confidence: Option<&str>) -> CefrLevel {
    match confidence {
        Some("elementary") => CefrLevel::A2,
        Some("intermediate") => CefrLevel::B1,
        Some("advanced") => CefrLevel::B2,
        _ => CefrLevel::A1,
    }
}

impl LessonOrchestrator {
    /// `/test`.
    pub(super) async fn open_vocab_test(&self, user: &UserId, state: UserState) -> FlowResult {
        self.move_along(user, state, &via_start(state, &[UserState::VocabularyTest]))
            .await?;
        Ok(screens::vocab_test_intro())
    }

    pub(super) async fn start_vocab_test(&self, user: &UserId, state: UserState) -> FlowResult {
        if state != UserState::VocabularyTest {
            return Err(OrchestratorError::InvalidTransition {
                from: state,
                to: UserState::TestGroup1,
            });
        }
        let data = VocabTestData::new();
        self.store_temp_value(user, temp_keys::VOCAB_TEST, &data, self.ttls.temp_ttl())
            .await?;
        self.move_along(user, state, &[UserState::TestGroup1]).await?;
        Ok(screens::test_question(&data))
    }

    /// Answer (`Some(option)`) or "don't know" (`None`) for the current question.
    pub(super) async fn answer_vocab_test(
        &self,
        user: &UserId,
        state: UserState,
        choice: Option<usize>,
    ) -> FlowResult {
        let Some(mut data) = self.running_test(user, state).await? else {
            return self.abandon_test(user, state).await;
        };
        if let Some(index) = choice.filter(|i| *i >= OPTIONS_PER_QUESTION) {
            return Err(LessonError::IndexOutOfBounds {
                index,
                len: OPTIONS_PER_QUESTION,
            }
            .into());
        }

        let step = data.record(choice.map(TestAnswer::Option).unwrap_or(TestAnswer::DontKnow));
        if step == TestStep::Finished {
            return self.complete_vocab_test(user, state, &data).await;
        }

        self.store_temp_value(user, temp_keys::VOCAB_TEST, &data, self.ttls.temp_ttl())
            .await?;
        self.follow_group(user, state, &data).await?;

        Ok(match step {
            TestStep::OfferEarlyStop => screens::early_stop_offer(),
            _ => screens::test_question(&data),
        })
    }

    pub(super) async fn continue_vocab_test(&self, user: &UserId, state: UserState) -> FlowResult {
        let Some(mut data) = self.running_test(user, state).await? else {
            return self.abandon_test(user, state).await;
        };
        data.continue_after_offer();
        self.store_temp_value(user, temp_keys::VOCAB_TEST, &data, self.ttls.temp_ttl())
            .await?;
        Ok(screens::test_question(&data))
    }

    /// "Finish the test" after the early-stop offer.
    pub(super) async fn finish_vocab_test(&self, user: &UserId, state: UserState) -> FlowResult {
        let Some(data) = self.running_test(user, state).await? else {
            return self.abandon_test(user, state).await;
        };
        self.complete_vocab_test(user, state, &data).await
    }

    pub(super) async fn skip_vocab_test(&self, user: &UserId, state: UserState) -> FlowResult {
        if state != UserState::VocabularyTest {
            return Err(OrchestratorError::InvalidTransition {
                from: state,
                to: UserState::LevelProcessing,
            });
        }
        let confidence: Option<String> = self
            .temp_value(user, &Question::Confidence.temp_key())
            .await?;
        let level = level_from_confidence(confidence.as_deref());
        self.apply_level(user, state, level, None).await
    }

    /// Test data for a learner inside a test group.
    async fn running_test(
        &self,
        user: &UserId,
        state: UserState,
    ) -> Result<Option<VocabTestData>, OrchestratorError> {
        if state.group_number().is_none() {
            return Err(OrchestratorError::InvalidTransition {
                from: state,
                to: UserState::LevelProcessing,
            });
        }
        Ok(self.vocab_test_data(user).await?)
    }

    /// Moves to the group the test data points at.
    async fn follow_group(
        &self,
        user: &UserId,
        state: UserState,
        data: &VocabTestData,
    ) -> Result<(), OrchestratorError> {
        let target = UserState::test_group(data.current_group).unwrap_or(state);
        if target != state {
            self.move_along(user, state, &[target]).await?;
        }
        Ok(())
    }

    async fn complete_vocab_test(
        &self,
        user: &UserId,
        state: UserState,
        data: &VocabTestData,
    ) -> FlowResult {
        self.apply_level(user, state, data.determine_level(), Some(data.total_correct()))
            .await
    }

    /// Saves the level, clears onboarding leftovers and shows the result.
    async fn apply_level(
        &self,
        user: &UserId,
        state: UserState,
        level: CefrLevel,
        correct: Option<u32>,
    ) -> FlowResult {
        let path = [UserState::LevelProcessing, UserState::LevelResult];
        check_path(state, &path)?;

        self.store_temp_value(user, temp_keys::CEFR_LEVEL, &level, self.ttls.temp_ttl())
            .await?;
        let mut preferences = self.preferences(user).await?;
        preferences.cefr_level = level;
        self.save_preferences(user, &preferences).await?;

        for question in Question::ALL {
            self.store.clear_temp_data(user, &question.temp_key()).await?;
        }
        self.store.clear_temp_data(user, temp_keys::VOCAB_TEST).await?;

        self.move_along(user, state, &path).await?;
        info!(user_id = %user, %level, "vocabulary level determined");
        Ok(screens::level_result(level, correct))
    }

    /// Test data expired mid-test: back to the menu.
    async fn abandon_test(&self, user: &UserId, state: UserState) -> FlowResult {
        self.move_along(user, state, &to_start(state)).await?;
        Ok(screens::main_menu().with_note("⌛ Your test session expired. Start it again with /test."))
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::Harness;
    use crate::ports::SessionStore;
    use super::super::{ButtonAction, Command};
    use super::*;
    use crate::domain::lesson::test_support::lesson;
    use crate::domain::onboarding::test_question;

    async fn answer_correctly(h: &Harness, group: u8, index: usize) {
        let q = test_question(group, index).unwrap();
        h.press(ButtonAction::TestAnswer(q.correct)).await;
    }

    async fn answer_wrong(h: &Harness, group: u8, index: usize) {
        let q = test_question(group, index).unwrap();
        h.press(ButtonAction::TestAnswer((q.correct + 1) % 4)).await;
    }

    #[test]
    fn skipped_test_uses_self_assessment() {
        assert_eq!(level_from_confidence(Some("advanced")), CefrLevel::B2);
        assert_eq!(level_from_confidence(Some("elementary")), CefrLevel::A2);
        assert_eq!(level_from_confidence(None), CefrLevel::A1);
    }

    #[tokio::test]
    async fn full_test_determines_level() {
        let h = Harness::new(lesson(3, 3));
        h.command(Command::Test).await;
        assert_eq!(h.state().await, UserState::VocabularyTest);
        h.press(ButtonAction::TestStart).await;
        assert_eq!(h.state().await, UserState::TestGroup1);

        for group in 1..=3u8 {
            answer_correctly(&h, group, 0).await;
            answer_wrong(&h, group, 1).await;
        }
        assert_eq!(h.state().await, UserState::TestGroup4);
        answer_wrong(&h, 4, 0).await;
        answer_wrong(&h, 4, 1).await;
        answer_wrong(&h, 5, 0).await;
        answer_wrong(&h, 5, 1).await;

        assert_eq!(h.state().await, UserState::LevelResult);
        let level = h
            .store
            .get_temp_data(&h.user, "cefr_level")
            .await
            .unwrap();
        assert_eq!(level, Some(serde_json::json!("B1")));
        assert!(h
            .store
            .get_temp_data(&h.user, "vocab_test")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn two_dont_knows_offer_early_stop() {
        let h = Harness::new(lesson(3, 3));
        h.command(Command::Test).await;
        h.press(ButtonAction::TestStart).await;

        h.press(ButtonAction::TestDontKnow).await;
        let prompt = h.press(ButtonAction::TestDontKnow).await;
        assert!(prompt.has_action(&ButtonAction::TestStop));
        assert_eq!(h.state().await, UserState::TestGroup2);

        let prompt = h.press(ButtonAction::TestStop).await;
        assert!(prompt.text.contains("A1"));
        assert_eq!(h.state().await, UserState::LevelResult);
    }

    #[tokio::test]
    async fn continue_after_offer_keeps_testing() {
        let h = Harness::new(lesson(3, 3));
        h.command(Command::Test).await;
        h.press(ButtonAction::TestStart).await;
        h.press(ButtonAction::TestDontKnow).await;
        h.press(ButtonAction::TestDontKnow).await;

        let prompt = h.press(ButtonAction::TestContinue).await;
        assert!(prompt.has_action(&ButtonAction::TestDontKnow));
        assert_eq!(h.state().await, UserState::TestGroup2);
    }

    #[tokio::test]
    async fn skip_uses_questionnaire_confidence() {
        let h = Harness::linked(lesson(3, 3)).await;
        h.store
            .store_temp_data(
                &h.user,
                "questionnaire:confidence",
                &serde_json::json!("intermediate"),
                std::time::Duration::from_secs(60),
            )
            .await
            .unwrap();
        h.set_state(UserState::VocabularyTest).await;

        let prompt = h.press(ButtonAction::TestSkip).await;
        assert!(prompt.text.contains("B1"));
        assert_eq!(h.state().await, UserState::LevelResult);

        let pushed = h.backend.preference_updates().await;
        assert_eq!(pushed.len(), 1);
        assert_eq!(pushed[0].preferences.cefr_level, CefrLevel::B1);
    }

    #[tokio::test]
    async fn expired_test_returns_to_menu() {
        let h = Harness::new(lesson(3, 3));
        h.set_state(UserState::TestGroup3).await;
        let prompt = h.press(ButtonAction::TestAnswer(0)).await;
        assert!(prompt.text.starts_with("⌛"));
        assert_eq!(h.state().await, UserState::Start);
    }
}
