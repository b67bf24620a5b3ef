//! `/learn`, lesson generation, resume/restart, word sets and word cards.

use secrecy::SecretString;
use tracing::{info, warn};

use crate::domain::foundation::{Timestamp, UserId, WordId};
use crate::domain::fsm::UserState;
use crate::domain::lesson::{
    next_word_set, AlreadyKnownOutcome, LessonError, LessonPhase, LessonProgress, LessonStats,
};
use crate::ports::{CollaboratorError, SessionStoreError};

use super::{
    check_path, render_lesson_state, screens, via_start, FlowResult, LessonOrchestrator,
    OrchestratorError,
};

impl LessonOrchestrator {
    /// `/learn` and "new lesson": resume, offer continue/restart, or generate.
    pub(super) async fn learn(&self, user: &UserId, state: UserState) -> FlowResult {
        let existing = self.store.get_lesson_progress(user).await?;

        if let Some(progress) = &existing {
            if progress.current_phase == LessonPhase::Completed {
                return self.finish_lesson(user, state).await;
            }
            if state.is_lesson_state() && state != UserState::LessonComplete {
                return Ok(render_lesson_state(progress, state));
            }
        }

        let Some(token) = self.jwt(user).await? else {
            return self.start_linking(user, state).await;
        };

        match existing {
            Some(progress) => {
                self.move_along(user, state, &via_start(state, &[UserState::LessonStart]))
                    .await?;
                Ok(screens::resume_offer(&progress))
            }
            None => self.generate_new_lesson(user, state, &token).await,
        }
    }

    /// Replaces any stored lesson with a freshly generated one.
    pub(super) async fn restart_lesson(&self, user: &UserId, state: UserState) -> FlowResult {
        let Some(token) = self.jwt(user).await? else {
            return self.start_linking(user, state).await;
        };
        self.generate_new_lesson(user, state, &token).await
    }

    async fn generate_new_lesson(
        &self,
        user: &UserId,
        state: UserState,
        token: &SecretString,
    ) -> FlowResult {
        let path = via_start(
            state,
            &[UserState::LessonStart, UserState::LessonInProgress],
        );
        check_path(state, &path)?;

        let lesson = match self
            .bounded(self.collaborators.lessons.generate_lesson(token))
            .await
        {
            Ok(lesson) => lesson,
            Err(CollaboratorError::Unauthorized) => {
                warn!(user_id = %user, "backend rejected token, relinking");
                return self.start_linking(user, state).await;
            }
            Err(err) => return Err(err.into()),
        };

        let progress = LessonProgress::new(lesson);
        self.store
            .store_lesson_progress(user, &progress, self.ttls.lesson_ttl())
            .await?;
        self.move_along(user, state, &path).await?;

        info!(
            user_id = %user,
            lesson_id = %progress.lesson_id,
            words_per_lesson = progress.words_per_lesson(),
            cards = progress.lesson_data.cards.len(),
            "lesson generated"
        );
        Ok(screens::lesson_ready(&progress))
    }

    /// Installs the next word set, or resumes whatever is in flight.
    ///
    /// `lead` is prepended to the path (e.g. `lesson_in_progress` when
    /// continuing from `lesson_start`). A new set is only installed when
    /// the word list can be shown from `state`.
    pub(super) async fn start_word_set(
        &self,
        user: &UserId,
        state: UserState,
        lead: &[UserState],
    ) -> FlowResult {
        let mut set_path = lead.to_vec();
        set_path.push(UserState::ShowingWordSet);
        let set_path = via_start(state, &set_path);
        let blocked = check_path(state, &set_path).err();

        let mut refused = false;
        let result = self
            .store
            .update_lesson_progress(user, &mut |p: &mut LessonProgress| {
                if p.current_phase != LessonPhase::Exercises || p.set_in_flight() {
                    return Ok(());
                }
                let set = next_word_set(p)?;
                if blocked.is_some() {
                    refused = true;
                    return Ok(());
                }
                p.begin_set(set)
            })
            .await;
        if let (true, Some(err)) = (refused, blocked) {
            return Err(err);
        }

        let progress = match result {
            Ok(progress) => progress,
            Err(SessionStoreError::Rejected(outcome)) if outcome.ends_main_pass() => {
                let progress = self.progress(user).await?;
                return self.finish_set(user, state, lead, &progress, "").await;
            }
            Err(err) => return Err(err.into()),
        };

        match progress.current_phase {
            LessonPhase::Completed => self.finish_lesson(user, state).await,
            LessonPhase::Retry => {
                if progress.retry_finished() {
                    self.complete_lesson(user, state).await
                } else {
                    self.enter_exercise(user, state, lead, &progress, "").await
                }
            }
            LessonPhase::Exercises if progress.exercises_started() => {
                self.enter_exercise(user, state, lead, &progress, "").await
            }
            LessonPhase::Exercises => {
                self.move_along(user, state, &set_path).await?;
                Ok(screens::word_set(&progress))
            }
        }
    }

    pub(super) async fn show_word(&self, user: &UserId, state: UserState, index: usize) -> FlowResult {
        let progress = self.progress(user).await?;
        let len = progress.words_in_current_set.len();
        let target = UserState::showing_word(index)
            .filter(|_| index < len && !progress.exercises_started())
            .ok_or(LessonError::IndexOutOfBounds { index, len })?;

        let path = if target == state { vec![] } else { vec![target] };
        self.move_along(user, state, &path).await?;
        Ok(screens::word_card(&progress, index))
    }

    /// "I already know this word" on the card in slot `index`.
    ///
    /// `word_id` is the card the button was shown on; a tap arriving after
    /// the slot was refilled is stale.
    pub(super) async fn already_know(
        &self,
        user: &UserId,
        state: UserState,
        index: usize,
        word_id: &WordId,
    ) -> FlowResult {
        if state.word_slot() != Some(index) {
            return Err(OrchestratorError::InvalidTransition {
                from: state,
                to: UserState::showing_word(index).unwrap_or(state),
            });
        }

        let mut outcome = None;
        let progress = self
            .store
            .update_lesson_progress(user, &mut |p: &mut LessonProgress| {
                outcome = Some(p.mark_already_known(index, word_id)?);
                Ok(())
            })
            .await?;

        info!(user_id = %user, slot = index, word_id = %word_id, "word marked as already known");

        match outcome {
            Some(AlreadyKnownOutcome::Replaced(card)) => {
                Ok(screens::word_card(&progress, index).with_note(screens::replaced_note(&card)))
            }
            _ => {
                let note = "👍 Great, you know that one already.";
                let remaining = progress.words_in_current_set.len();
                if remaining == 0 {
                    self.finish_set(user, state, &[], &progress, note).await
                } else if index < remaining {
                    Ok(screens::word_card(&progress, index).with_note(note))
                } else {
                    self.move_along(user, state, &[UserState::ReadyForExercises])
                        .await?;
                    Ok(screens::ready_for_exercises(&progress).with_note(note))
                }
            }
        }
    }

    pub(super) async fn ready_for_exercises(&self, user: &UserId, state: UserState) -> FlowResult {
        let progress = self.progress(user).await?;
        if progress.words_in_current_set.is_empty() || progress.exercises_started() {
            return Err(LessonError::WrongPhase {
                actual: progress.current_phase,
            }
            .into());
        }
        self.move_along(user, state, &[UserState::ReadyForExercises])
            .await?;
        Ok(screens::ready_for_exercises(&progress))
    }

    /// `/stats`: statistics of the lesson in flight, no transition.
    pub(super) async fn show_stats(&self, user: &UserId) -> FlowResult {
        let progress = self.progress(user).await?;
        Ok(screens::stats(&LessonStats::from_progress(
            &progress,
            Timestamp::now(),
        )))
    }
}
