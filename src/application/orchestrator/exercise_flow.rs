//! Exercises, the retry pass and lesson completion.

use tracing::info;

use crate::domain::foundation::{StateMachine, Timestamp, UserId};
use crate::domain::fsm::UserState;
use crate::domain::lesson::{
    next_word_set, Answer, AnswerMode, Card, LessonError, LessonPhase, LessonProgress,
    LessonStats, SetOutcome,
};

use super::{
    check_path, completion_path, screens, to_start, via_start, FlowResult, LessonOrchestrator,
    OrchestratorError,
};

/// State that takes answers for `card`'s exercise.
fn exercise_state(card: &Card) -> UserState {
    match card.exercise.answer_mode() {
        AnswerMode::MultipleChoice => UserState::ExerciseInProgress,
        AnswerMode::FreeText => UserState::WaitingForTextInput,
    }
}

/// First valid path from `from` to the exercise state `target`.
fn exercise_path(from: UserState, lead: &[UserState], target: UserState) -> Vec<UserState> {
    if lead.is_empty() {
        if from == target {
            return Vec::new();
        }
        if from.can_transition_to(&target) {
            return vec![target];
        }
    }

    let direct: Vec<UserState> = lead
        .iter()
        .copied()
        .chain([UserState::DoingExercises, target])
        .collect();
    let through_set_end: Vec<UserState> = lead
        .iter()
        .copied()
        .chain([UserState::SetComplete, UserState::DoingExercises, target])
        .collect();

    [direct.clone(), through_set_end]
        .into_iter()
        .map(|path| via_start(from, &path))
        .find(|path| check_path(from, path).is_ok())
        .unwrap_or_else(|| via_start(from, &direct))
}

/// Path that closes the lesson from `from`, falling back to plain `start`.
fn finish_path(from: UserState) -> Vec<UserState> {
    let path = completion_path(from);
    if check_path(from, &path).is_ok() {
        path
    } else {
        to_start(from)
    }
}

impl LessonOrchestrator {
    pub(super) async fn start_exercises(&self, user: &UserId, state: UserState) -> FlowResult {
        let progress = self.progress(user).await?;
        if state != UserState::ReadyForExercises && !progress.exercises_started() {
            return Err(OrchestratorError::InvalidTransition {
                from: state,
                to: UserState::DoingExercises,
            });
        }
        self.enter_exercise(user, state, &[], &progress, "").await
    }

    /// Moves to the current exercise and shows it under `note`.
    pub(super) async fn enter_exercise(
        &self,
        user: &UserId,
        state: UserState,
        lead: &[UserState],
        progress: &LessonProgress,
        note: &str,
    ) -> FlowResult {
        let Some(card) = progress.current_exercise_card() else {
            return Ok(self.complete_lesson(user, state).await?.with_note(note));
        };
        let path = exercise_path(state, lead, exercise_state(card));
        self.move_along(user, state, &path).await?;
        let prompt = screens::exercise(progress, false).unwrap_or_else(|| screens::set_complete(progress));
        Ok(prompt.with_note(note))
    }

    pub(super) async fn pick_option(
        &self,
        user: &UserId,
        state: UserState,
        index: usize,
        turn: usize,
    ) -> FlowResult {
        let progress = self.answerable(state, user).await?;
        if progress.answer_turn() != turn {
            return Err(LessonError::StaleAnswer.into());
        }
        let card = progress
            .current_exercise_card()
            .ok_or(LessonError::NoMoreWords)?;
        let option = card
            .exercise
            .option(index)
            .ok_or(LessonError::IndexOutOfBounds {
                index,
                len: card.exercise.data.pick_options.len(),
            })?
            .to_string();
        self.record(user, state, turn, Answer::Option(option)).await
    }

    pub(super) async fn answer_text(&self, user: &UserId, state: UserState, text: &str) -> FlowResult {
        let progress = self.answerable(state, user).await?;
        self.record(user, state, progress.answer_turn(), Answer::Text(text.trim().to_string()))
            .await
    }

    pub(super) async fn skip_exercise(&self, user: &UserId, state: UserState, turn: usize) -> FlowResult {
        self.answerable(state, user).await?;
        self.record(user, state, turn, Answer::Skip).await
    }

    pub(super) async fn show_hint(&self, user: &UserId, state: UserState) -> FlowResult {
        let progress = self.answerable(state, user).await?;
        screens::exercise(&progress, true).ok_or_else(|| LessonError::NoMoreWords.into())
    }

    /// Loads the lesson, requiring a state that takes answers.
    async fn answerable(&self, state: UserState, user: &UserId) -> Result<LessonProgress, OrchestratorError> {
        if !matches!(
            state,
            UserState::ExerciseInProgress | UserState::WaitingForTextInput
        ) {
            return Err(OrchestratorError::InvalidTransition {
                from: state,
                to: UserState::ExerciseInProgress,
            });
        }
        self.progress(user).await
    }

    /// Records `answer` for the exercise shown at `turn`.
    ///
    /// A second answer for the same turn (double tap) is rejected as
    /// stale and nothing is written.
    async fn record(
        &self,
        user: &UserId,
        state: UserState,
        turn: usize,
        answer: Answer,
    ) -> FlowResult {
        let mut feedback = String::new();
        let progress = self
            .store
            .update_lesson_progress(user, &mut |p: &mut LessonProgress| {
                feedback = p.record_answer_at(turn, &answer)?.feedback;
                Ok(())
            })
            .await?;

        match progress.current_exercise_card() {
            Some(card) => {
                let target = exercise_state(card);
                self.move_along(user, state, &exercise_path(state, &[], target))
                    .await?;
                let prompt = screens::exercise(&progress, false)
                    .unwrap_or_else(|| screens::set_complete(&progress));
                Ok(prompt.with_note(feedback))
            }
            None => self.finish_set(user, state, &[], &progress, &feedback).await,
        }
    }

    /// Decides what follows a finished set: next set, retry pass or completion.
    pub(super) async fn finish_set(
        &self,
        user: &UserId,
        state: UserState,
        lead: &[UserState],
        progress: &LessonProgress,
        note: &str,
    ) -> FlowResult {
        let more_words = next_word_set(progress).is_ok();
        match progress.after_set(more_words) {
            SetOutcome::NextSet => {
                let mut path = lead.to_vec();
                path.push(UserState::SetComplete);
                self.move_along(user, state, &via_start(state, &path))
                    .await?;
                Ok(screens::set_complete(progress).with_note(note))
            }
            SetOutcome::StartRetry => {
                let mut preview = progress.clone();
                preview.begin_retry()?;
                if let Some(card) = preview.current_exercise_card() {
                    check_path(state, &exercise_path(state, lead, exercise_state(card)))?;
                }
                let progress = self
                    .store
                    .update_lesson_progress(user, &mut |p: &mut LessonProgress| p.begin_retry())
                    .await?;
                let note = if note.is_empty() {
                    screens::retry_intro().to_string()
                } else {
                    format!("{}\n\n{}", note, screens::retry_intro())
                };
                self.enter_exercise(user, state, lead, &progress, &note).await
            }
            SetOutcome::Complete => Ok(self.complete_lesson(user, state).await?.with_note(note)),
        }
    }

    /// Marks the lesson completed, reports it and clears it.
    pub(super) async fn complete_lesson(&self, user: &UserId, state: UserState) -> FlowResult {
        let progress = self
            .store
            .update_lesson_progress(user, &mut |p: &mut LessonProgress| {
                p.complete();
                Ok(())
            })
            .await?;
        self.report_and_clear(user, state, progress).await
    }

    /// Retries the report of a lesson that completed but was not synced.
    pub(super) async fn finish_lesson(&self, user: &UserId, state: UserState) -> FlowResult {
        let progress = self.progress(user).await?;
        if progress.current_phase != LessonPhase::Completed {
            return Err(LessonError::WrongPhase {
                actual: progress.current_phase,
            }
            .into());
        }
        self.report_and_clear(user, state, progress).await
    }

    async fn report_and_clear(
        &self,
        user: &UserId,
        state: UserState,
        progress: LessonProgress,
    ) -> FlowResult {
        let path = finish_path(state);

        if let Some(token) = self.jwt(user).await? {
            self.bounded(
                self.collaborators
                    .progress
                    .send_lesson_progress(&token, &progress.words_learned),
            )
            .await
            .map_err(OrchestratorError::ProgressSync)?;
        }

        self.store.clear_lesson_progress(user).await?;
        self.move_along(user, state, &path).await?;

        let stats = LessonStats::from_progress(&progress, Timestamp::now());
        info!(
            user_id = %user,
            lesson_id = %progress.lesson_id,
            drilled = stats.drilled,
            already_known = stats.already_known,
            retried = stats.retried,
            "lesson completed"
        );
        Ok(screens::lesson_complete(&stats))
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::Harness;
    use super::super::{ButtonAction, Command};
    use super::*;
    use crate::domain::lesson::test_support::{card, lesson};
    use crate::domain::lesson::{ExerciseData, ExerciseKind, Exercise};
    use crate::ports::CollaboratorError;

    async fn at_first_exercise(h: &Harness) {
        h.command(Command::Learn).await;
        h.press(ButtonAction::LessonStartWordSet).await;
        h.press(ButtonAction::LessonShowWord(0)).await;
        h.press(ButtonAction::LessonShowWord(1)).await;
        h.press(ButtonAction::LessonShowWord(2)).await;
        h.press(ButtonAction::LessonReady).await;
        h.press(ButtonAction::ExerciseStart).await;
    }

    fn write_card(n: usize) -> Card {
        let mut card = card(n);
        card.exercise = Exercise {
            kind: ExerciseKind::WriteWordFromTranslation,
            data: ExerciseData {
                translation: Some(card.translation.clone()),
                correct_answer: card.word.clone(),
                ..Default::default()
            },
        };
        card
    }

    #[test]
    fn exercise_path_switches_modes_directly() {
        assert_eq!(
            exercise_path(UserState::ExerciseInProgress, &[], UserState::WaitingForTextInput),
            vec![UserState::WaitingForTextInput]
        );
        assert!(exercise_path(UserState::ExerciseInProgress, &[], UserState::ExerciseInProgress)
            .is_empty());
        assert_eq!(
            exercise_path(UserState::ShowingWord2, &[], UserState::ExerciseInProgress),
            vec![
                UserState::SetComplete,
                UserState::DoingExercises,
                UserState::ExerciseInProgress
            ]
        );
    }

    #[test]
    fn finish_path_from_lesson_start_goes_home() {
        assert_eq!(finish_path(UserState::LessonStart), vec![UserState::Start]);
        assert_eq!(
            finish_path(UserState::ExerciseInProgress),
            vec![UserState::LessonComplete, UserState::Start]
        );
    }

    #[tokio::test]
    async fn correct_answers_complete_single_set_lesson() {
        let h = Harness::linked(lesson(3, 3)).await;
        at_first_exercise(&h).await;
        assert_eq!(h.state().await, UserState::ExerciseInProgress);

        h.answer(0).await;
        h.answer(0).await;
        let prompt = h.answer(0).await;

        assert!(prompt.text.contains("Lesson complete"));
        assert!(prompt.has_action(&ButtonAction::LessonNew));
        assert_eq!(h.state().await, UserState::Start);
        assert!(h.progress().await.is_none());

        let reported = h.backend.reported_progress().await;
        assert_eq!(reported.len(), 1);
        assert_eq!(reported[0].len(), 3);
        assert!(reported[0].iter().all(|w| w.confidence_score == 100));
    }

    #[tokio::test]
    async fn wrong_answer_is_replayed_before_completion() {
        let h = Harness::linked(lesson(3, 3)).await;
        at_first_exercise(&h).await;

        h.answer(0).await;
        h.answer(1).await;
        let prompt = h.answer(0).await;
        assert!(prompt.text.contains("missed"));
        assert_eq!(h.state().await, UserState::ExerciseInProgress);

        let progress = h.progress().await.unwrap();
        assert_eq!(progress.current_phase, LessonPhase::Retry);
        assert_eq!(progress.retry_words[0].word, "word1");

        h.answer(1).await;
        assert_eq!(h.state().await, UserState::Start);
        let reported = h.backend.reported_progress().await;
        let retried = reported[0].iter().find(|w| w.word == "word1").unwrap();
        assert_eq!(retried.cnt_reviewed, 2);
    }

    #[tokio::test]
    async fn two_sets_pass_through_set_complete() {
        let h = Harness::linked(lesson(5, 6)).await;
        at_first_exercise(&h).await;
        for _ in 0..3 {
            h.answer(0).await;
        }
        assert_eq!(h.state().await, UserState::SetComplete);

        let prompt = h.press(ButtonAction::LessonNextSet).await;
        assert_eq!(h.state().await, UserState::ShowingWordSet);
        assert!(prompt.text.contains("word3"));
        let progress = h.progress().await.unwrap();
        assert_eq!(progress.words_in_current_set.len(), 2);
        assert_eq!(progress.current_set_index, 2);
    }

    #[tokio::test]
    async fn skip_counts_without_retry() {
        let h = Harness::linked(lesson(3, 3)).await;
        at_first_exercise(&h).await;
        h.press(ButtonAction::ExerciseSkip { turn: 0 }).await;

        let progress = h.progress().await.unwrap();
        assert_eq!(progress.words_learned[0].confidence_score, 25);
        assert!(progress.retry_words.is_empty());
    }

    #[tokio::test]
    async fn hint_keeps_state() {
        let h = Harness::linked(lesson(3, 3)).await;
        at_first_exercise(&h).await;
        let prompt = h.press(ButtonAction::ExerciseHint).await;
        assert!(prompt.text.contains("💡"));
        assert_eq!(h.progress().await.unwrap().exercise_index, 0);
    }

    #[tokio::test]
    async fn typed_answers_go_to_text_exercises() {
        let mut payload = lesson(3, 3);
        payload.cards = (0..3).map(write_card).collect();
        let h = Harness::linked(payload).await;
        at_first_exercise(&h).await;
        assert_eq!(h.state().await, UserState::WaitingForTextInput);

        let prompt = h.text("  WORD0 ").await;
        assert!(prompt.text.starts_with("✅"));
        assert!(prompt.expects_text_input);
        assert_eq!(h.progress().await.unwrap().exercise_index, 1);
    }

    #[tokio::test]
    async fn option_out_of_range_reprompts() {
        let h = Harness::linked(lesson(3, 3)).await;
        at_first_exercise(&h).await;
        let prompt = h.press(ButtonAction::ExercisePickOption { option: 9, turn: 0 }).await;
        assert!(prompt.has_action(&ButtonAction::ExercisePickOption { option: 0, turn: 0 }));
        assert_eq!(h.progress().await.unwrap().exercise_index, 0);
    }

    #[tokio::test]
    async fn progress_sync_failure_offers_finish_retry() {
        let h = Harness::linked(lesson(3, 3)).await;
        at_first_exercise(&h).await;
        h.backend
            .fail_progress_with(Some(CollaboratorError::timeout(30)))
            .await;
        h.answer(0).await;
        h.answer(0).await;
        let prompt = h.answer(0).await;

        assert!(prompt.has_action(&ButtonAction::LessonFinish));
        assert_eq!(h.state().await, UserState::ExerciseInProgress);
        assert_eq!(
            h.progress().await.unwrap().current_phase,
            LessonPhase::Completed
        );

        h.backend.fail_progress_with(None).await;
        let prompt = h.press(ButtonAction::LessonFinish).await;
        assert!(prompt.text.contains("Lesson complete"));
        assert_eq!(h.state().await, UserState::Start);
        assert!(h.progress().await.is_none());
    }

    #[tokio::test]
    async fn answers_outside_exercises_are_rejected() {
        let h = Harness::linked(lesson(3, 3)).await;
        h.command(Command::Learn).await;
        h.press(ButtonAction::LessonStartWordSet).await;

        h.answer(0).await;
        assert_eq!(h.progress().await.unwrap().exercise_index, 0);
        assert_eq!(h.state().await, UserState::ShowingWordSet);
    }

    #[tokio::test]
    async fn repeated_answer_button_records_once() {
        let h = Harness::linked(lesson(3, 3)).await;
        at_first_exercise(&h).await;
        let tapped = ButtonAction::ExercisePickOption { option: 0, turn: 0 };

        h.press(tapped.clone()).await;
        let prompt = h.press(tapped).await;

        assert!(prompt.text.starts_with("🤔"));
        let progress = h.progress().await.unwrap();
        assert_eq!(progress.words_learned.len(), 1);
        assert_eq!(progress.learned_count, 1);
        assert_eq!(progress.exercise_index, 1);
        assert_eq!(h.state().await, UserState::ExerciseInProgress);
    }

    #[tokio::test]
    async fn skip_for_an_earlier_turn_is_ignored() {
        let h = Harness::linked(lesson(3, 3)).await;
        at_first_exercise(&h).await;
        h.answer(0).await;

        h.press(ButtonAction::ExerciseSkip { turn: 0 }).await;
        let progress = h.progress().await.unwrap();
        assert_eq!(progress.exercise_index, 1);
        assert!(progress.words_learned.iter().all(|w| w.confidence_score == 100));
    }
}
