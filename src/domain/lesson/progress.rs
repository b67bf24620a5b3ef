//! In-flight lesson state and its mutators.
//!
//! A `LessonProgress` lives in the session store while a lesson is active.
//! Callers never write it directly: they load it, run one of the mutators
//! below inside the store's read-modify-write primitive, and the store
//! persists the result only when the mutator succeeds.

use serde::{Deserialize, Serialize};

use super::evaluator::{evaluate, Answer, AnswerOutcome, Evaluation, CONFIDENCE_CORRECT};
use super::word_set::replacement_word;
use super::{Card, LessonError, LessonResponse};
use crate::domain::foundation::{LessonId, Timestamp, WordId};

/// Maximum number of cards taught together.
pub const SET_SIZE: usize = 3;

/// Outcome recorded for one word.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WordProgress {
    pub word_id: WordId,
    pub word: String,
    pub translation: String,
    pub learned_at: Timestamp,
    pub confidence_score: u8,
    pub cnt_reviewed: u32,
    #[serde(default)]
    pub already_known: bool,
}

impl WordProgress {
    fn from_card(card: &Card, confidence_score: u8, already_known: bool) -> Self {
        Self {
            word_id: card.word_id.clone(),
            word: card.word.clone(),
            translation: card.translation.clone(),
            learned_at: Timestamp::now(),
            confidence_score,
            cnt_reviewed: 1,
            already_known,
        }
    }
}

/// Which queue the exercise cursor walks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LessonPhase {
    /// Main pass over word sets.
    #[default]
    Exercises,
    /// Replay of words answered incorrectly during the main pass.
    Retry,
    Completed,
}

/// Result of marking a word "already known".
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AlreadyKnownOutcome {
    /// The slot now holds this card.
    Replaced(Card),
    /// No replacement was left; the set shrank by one.
    Removed,
}

/// What follows a finished word set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetOutcome {
    /// More words remain under the quota.
    NextSet,
    /// Main pass is over and incorrect words must be replayed.
    StartRetry,
    /// Nothing left to do.
    Complete,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LessonProgress {
    pub lesson_id: LessonId,
    pub lesson_data: LessonResponse,
    #[serde(default)]
    pub current_phase: LessonPhase,
    #[serde(default)]
    pub words_in_current_set: Vec<Card>,
    #[serde(default)]
    pub current_set_index: u32,
    #[serde(default)]
    pub exercise_index: usize,
    #[serde(default)]
    pub words_learned: Vec<WordProgress>,
    #[serde(default)]
    pub retry_words: Vec<Card>,
    #[serde(default)]
    pub retry_index: usize,
    pub start_time: Timestamp,
    pub last_activity: Timestamp,
    #[serde(default)]
    pub learned_count: u32,
    #[serde(default)]
    pub already_known_count: u32,
}

impl LessonProgress {
    /// Starts tracking a freshly generated lesson.
    pub fn new(lesson_data: LessonResponse) -> Self {
        let now = Timestamp::now();
        Self {
            lesson_id: LessonId::new(),
            lesson_data,
            current_phase: LessonPhase::Exercises,
            words_in_current_set: Vec::new(),
            current_set_index: 0,
            exercise_index: 0,
            words_learned: Vec::new(),
            retry_words: Vec::new(),
            retry_index: 0,
            start_time: now,
            last_activity: now,
            learned_count: 0,
            already_known_count: 0,
        }
    }

    pub fn words_per_lesson(&self) -> usize {
        self.lesson_data.words_per_lesson()
    }

    /// Words actually drilled: the count that gates completion.
    pub fn drilled_count(&self) -> usize {
        self.learned_count.saturating_sub(self.already_known_count) as usize
    }

    pub fn quota_reached(&self) -> bool {
        self.drilled_count() >= self.words_per_lesson()
    }

    pub fn is_learned(&self, word_id: &WordId) -> bool {
        self.words_learned.iter().any(|w| &w.word_id == word_id)
    }

    pub fn is_in_current_set(&self, word_id: &WordId) -> bool {
        self.words_in_current_set.iter().any(|c| &c.word_id == word_id)
    }

    /// True while the current set still has unanswered exercises.
    pub fn set_in_flight(&self) -> bool {
        self.current_phase == LessonPhase::Exercises
            && self.exercise_index < self.words_in_current_set.len()
    }

    /// True once at least one exercise of the current set was answered.
    pub fn exercises_started(&self) -> bool {
        match self.current_phase {
            LessonPhase::Exercises => self.exercise_index > 0,
            LessonPhase::Retry => true,
            LessonPhase::Completed => false,
        }
    }

    /// Answers recorded so far in this lesson, main pass and retry pass.
    ///
    /// Grows by one with every recorded answer and never repeats, so it
    /// names the exercise on screen across sets.
    pub fn answer_turn(&self) -> usize {
        let retried = match self.current_phase {
            LessonPhase::Exercises => 0,
            LessonPhase::Retry | LessonPhase::Completed => self.retry_index,
        };
        self.drilled_count() + retried
    }

    /// Records an answer only if it was given at turn `expected`.
    pub fn record_answer_at(
        &mut self,
        expected: usize,
        answer: &Answer,
    ) -> Result<Evaluation, LessonError> {
        if self.answer_turn() != expected {
            return Err(LessonError::StaleAnswer);
        }
        self.record_answer(answer)
    }

    /// Card whose exercise is due next, in either phase.
    pub fn current_exercise_card(&self) -> Option<&Card> {
        match self.current_phase {
            LessonPhase::Exercises => self.words_in_current_set.get(self.exercise_index),
            LessonPhase::Retry => self.retry_words.get(self.retry_index),
            LessonPhase::Completed => None,
        }
    }

    fn touch(&mut self) {
        self.last_activity = Timestamp::now();
    }

    /// Installs the next word set and rewinds the exercise cursor.
    pub fn begin_set(&mut self, cards: Vec<Card>) -> Result<(), LessonError> {
        if self.current_phase != LessonPhase::Exercises {
            return Err(LessonError::WrongPhase { actual: self.current_phase });
        }
        if cards.is_empty() {
            return Err(LessonError::NoMoreWords);
        }
        self.words_in_current_set = cards;
        self.exercise_index = 0;
        self.current_set_index += 1;
        self.touch();
        Ok(())
    }

    /// Evaluates an answer for the current exercise and records it.
    ///
    /// Main pass: appends one `WordProgress`, counts the word as learned,
    /// queues incorrect answers for retry, advances `exercise_index`.
    /// Retry pass: updates the word's existing entry in place and advances
    /// `retry_index`.
    pub fn record_answer(&mut self, answer: &Answer) -> Result<Evaluation, LessonError> {
        match self.current_phase {
            LessonPhase::Exercises => self.record_main_answer(answer),
            LessonPhase::Retry => self.record_retry_answer(answer),
            LessonPhase::Completed => Err(LessonError::WrongPhase {
                actual: LessonPhase::Completed,
            }),
        }
    }

    fn record_main_answer(&mut self, answer: &Answer) -> Result<Evaluation, LessonError> {
        let card = self
            .words_in_current_set
            .get(self.exercise_index)
            .cloned()
            .ok_or(LessonError::IndexOutOfBounds {
                index: self.exercise_index,
                len: self.words_in_current_set.len(),
            })?;

        let evaluation = evaluate(&card.exercise, answer)?;

        self.words_learned
            .push(WordProgress::from_card(&card, evaluation.confidence(), false));
        self.learned_count += 1;
        if evaluation.outcome == AnswerOutcome::Incorrect {
            self.retry_words.push(card);
        }
        self.exercise_index += 1;
        self.touch();
        Ok(evaluation)
    }

    fn record_retry_answer(&mut self, answer: &Answer) -> Result<Evaluation, LessonError> {
        let card = self
            .retry_words
            .get(self.retry_index)
            .cloned()
            .ok_or(LessonError::IndexOutOfBounds {
                index: self.retry_index,
                len: self.retry_words.len(),
            })?;

        let evaluation = evaluate(&card.exercise, answer)?;

        match self.words_learned.iter_mut().find(|w| w.word_id == card.word_id) {
            Some(entry) => {
                entry.confidence_score = evaluation.confidence();
                entry.cnt_reviewed += 1;
                entry.learned_at = Timestamp::now();
            }
            None => self
                .words_learned
                .push(WordProgress::from_card(&card, evaluation.confidence(), false)),
        }
        self.retry_index += 1;
        self.touch();
        Ok(evaluation)
    }

    /// Marks `word_id`, shown in slot `index`, as already known and fills
    /// the slot.
    ///
    /// Fails with `StaleAnswer` when the slot holds another word by now.
    /// The word counts as learned but never toward the drilled quota.
    pub fn mark_already_known(
        &mut self,
        index: usize,
        word_id: &WordId,
    ) -> Result<AlreadyKnownOutcome, LessonError> {
        if self.current_phase != LessonPhase::Exercises || self.exercise_index > 0 {
            return Err(LessonError::WrongPhase { actual: self.current_phase });
        }
        let card = self
            .words_in_current_set
            .get(index)
            .cloned()
            .ok_or(LessonError::IndexOutOfBounds {
                index,
                len: self.words_in_current_set.len(),
            })?;
        if &card.word_id != word_id {
            return Err(LessonError::StaleAnswer);
        }

        self.words_learned
            .push(WordProgress::from_card(&card, CONFIDENCE_CORRECT, true));
        self.learned_count += 1;
        self.already_known_count += 1;
        self.touch();

        match replacement_word(self, index) {
            Ok(replacement) => {
                self.words_in_current_set[index] = replacement.clone();
                Ok(AlreadyKnownOutcome::Replaced(replacement))
            }
            Err(LessonError::NoReplacementWords) => {
                self.words_in_current_set.remove(index);
                Ok(AlreadyKnownOutcome::Removed)
            }
            Err(other) => Err(other),
        }
    }

    /// Decides what follows the end of the main pass or a finished set.
    ///
    /// `more_words` is whether another set could be selected.
    pub fn after_set(&self, more_words: bool) -> SetOutcome {
        match self.current_phase {
            LessonPhase::Retry => {
                if self.retry_index < self.retry_words.len() {
                    SetOutcome::StartRetry
                } else {
                    SetOutcome::Complete
                }
            }
            LessonPhase::Completed => SetOutcome::Complete,
            LessonPhase::Exercises => {
                if more_words && !self.quota_reached() {
                    SetOutcome::NextSet
                } else if self.retry_words.is_empty() {
                    SetOutcome::Complete
                } else {
                    SetOutcome::StartRetry
                }
            }
        }
    }

    /// Switches the cursor to the retry queue.
    pub fn begin_retry(&mut self) -> Result<(), LessonError> {
        if self.retry_words.is_empty() {
            return Err(LessonError::NoMoreWords);
        }
        if self.current_phase == LessonPhase::Exercises {
            self.current_phase = LessonPhase::Retry;
            self.retry_index = 0;
        }
        self.touch();
        Ok(())
    }

    /// True when the retry cursor has drained the queue.
    pub fn retry_finished(&self) -> bool {
        self.current_phase == LessonPhase::Retry && self.retry_index >= self.retry_words.len()
    }

    pub fn complete(&mut self) {
        self.current_phase = LessonPhase::Completed;
        self.touch();
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;
    use crate::domain::lesson::next_word_set;

    fn started(words_per_lesson: u32, cards: usize) -> LessonProgress {
        let mut progress = LessonProgress::new(lesson(words_per_lesson, cards));
        let set = next_word_set(&progress).unwrap();
        progress.begin_set(set).unwrap();
        progress
    }

    #[test]
    fn begin_set_rewinds_cursor_and_counts_sets() {
        let progress = started(3, 3);
        assert_eq!(progress.words_in_current_set.len(), 3);
        assert_eq!(progress.exercise_index, 0);
        assert_eq!(progress.current_set_index, 1);
    }

    #[test]
    fn each_answer_appends_one_entry_and_advances() {
        let mut progress = started(3, 3);
        let answer = correct(&progress);
        let eval = progress.record_answer(&answer).unwrap();

        assert!(eval.is_correct());
        assert_eq!(progress.words_learned.len(), 1);
        assert_eq!(progress.exercise_index, 1);
        assert_eq!(progress.learned_count, 1);
        assert!(progress.retry_words.is_empty());
    }

    #[test]
    fn incorrect_answer_is_queued_for_retry() {
        let mut progress = started(3, 3);
        progress.record_answer(&correct(&progress)).unwrap();
        progress.record_answer(&wrong()).unwrap();

        assert_eq!(progress.retry_words.len(), 1);
        assert_eq!(progress.retry_words[0].word_id, WordId::from("w1"));
        assert_eq!(progress.words_learned[1].confidence_score, 0);
    }

    #[test]
    fn skip_records_partial_confidence_without_retry() {
        let mut progress = started(3, 3);
        progress.record_answer(&Answer::Skip).unwrap();

        assert_eq!(progress.words_learned[0].confidence_score, 25);
        assert!(progress.retry_words.is_empty());
        assert_eq!(progress.drilled_count(), 1);
    }

    #[test]
    fn mode_mismatch_records_nothing() {
        let mut progress = started(3, 3);
        let before = progress.clone();
        let err = progress.record_answer(&Answer::Text("word0".into())).unwrap_err();

        assert_eq!(err, LessonError::AnswerModeMismatch);
        assert_eq!(progress.words_learned, before.words_learned);
        assert_eq!(progress.exercise_index, before.exercise_index);
    }

    #[test]
    fn answering_past_the_set_fails() {
        let mut progress = started(3, 3);
        for _ in 0..3 {
            progress.record_answer(&correct(&progress)).unwrap();
        }
        assert!(matches!(
            progress.record_answer(&wrong()),
            Err(LessonError::IndexOutOfBounds { index: 3, len: 3 })
        ));
    }

    #[test]
    fn retry_updates_existing_entry_in_place() {
        let mut progress = started(3, 3);
        progress.record_answer(&correct(&progress)).unwrap();
        progress.record_answer(&wrong()).unwrap();
        progress.record_answer(&correct(&progress)).unwrap();
        assert_eq!(progress.after_set(false), SetOutcome::StartRetry);

        progress.begin_retry().unwrap();
        progress.record_answer(&correct(&progress)).unwrap();

        assert_eq!(progress.words_learned.len(), 3);
        let entry = &progress.words_learned[1];
        assert_eq!(entry.confidence_score, 100);
        assert_eq!(entry.cnt_reviewed, 2);
        assert!(progress.retry_finished());
        assert_eq!(progress.after_set(false), SetOutcome::Complete);
    }

    #[test]
    fn already_known_does_not_advance_quota() {
        let mut progress = started(3, 6);
        let outcome = progress.mark_already_known(0, &WordId::from("w0")).unwrap();

        assert_eq!(progress.learned_count, 1);
        assert_eq!(progress.already_known_count, 1);
        assert_eq!(progress.drilled_count(), 0);
        assert!(progress.words_learned[0].already_known);
        assert_eq!(progress.words_learned[0].confidence_score, 100);

        match outcome {
            AlreadyKnownOutcome::Replaced(card) => {
                let pos = progress.lesson_data.position_of(&card.word_id).unwrap();
                assert!(pos >= 3);
                assert_eq!(progress.words_in_current_set[0], card);
            }
            AlreadyKnownOutcome::Removed => panic!("expected a replacement"),
        }
    }

    #[test]
    fn already_known_without_replacement_shrinks_set() {
        let mut progress = started(3, 3);
        let outcome = progress.mark_already_known(1, &WordId::from("w1")).unwrap();

        assert_eq!(outcome, AlreadyKnownOutcome::Removed);
        assert_eq!(progress.words_in_current_set.len(), 2);
        assert!(!progress.is_in_current_set(&WordId::from("w1")));
    }

    #[test]
    fn already_known_after_exercises_started_is_rejected() {
        let mut progress = started(3, 6);
        progress.record_answer(&correct(&progress)).unwrap();
        assert!(matches!(
            progress.mark_already_known(1, &WordId::from("w1")),
            Err(LessonError::WrongPhase { .. })
        ));
    }

    #[test]
    fn already_known_for_a_replaced_word_is_stale() {
        let mut progress = started(3, 6);
        let shown = WordId::from("w0");
        progress.mark_already_known(0, &shown).unwrap();
        let before = progress.clone();

        assert_eq!(
            progress.mark_already_known(0, &shown),
            Err(LessonError::StaleAnswer)
        );
        assert_eq!(progress, before);
        assert_eq!(progress.already_known_count, 1);
        assert!(!progress.is_learned(&WordId::from("w3")));
    }

    #[test]
    fn after_set_continues_until_quota() {
        let mut progress = started(6, 9);
        for _ in 0..3 {
            progress.record_answer(&correct(&progress)).unwrap();
        }
        assert_eq!(progress.after_set(true), SetOutcome::NextSet);
        assert_eq!(progress.after_set(false), SetOutcome::Complete);
    }

    #[test]
    fn serde_roundtrip_preserves_progress() {
        let mut progress = started(3, 4);
        progress.record_answer(&wrong()).unwrap();
        let json = serde_json::to_string(&progress).unwrap();
        let back: LessonProgress = serde_json::from_str(&json).unwrap();
        assert_eq!(back, progress);
    }

    #[test]
    fn double_submitted_answer_is_stale() {
        let mut progress = started(3, 3);
        let turn = progress.answer_turn();
        let answer = correct(&progress);
        progress.record_answer_at(turn, &answer).unwrap();

        assert_eq!(
            progress.record_answer_at(turn, &answer),
            Err(LessonError::StaleAnswer)
        );
        assert_eq!(progress.words_learned.len(), 1);
        assert_eq!(progress.exercise_index, 1);
    }

    #[test]
    fn answer_turn_never_repeats_across_sets_and_retry() {
        let mut progress = started(6, 9);
        let mut turns = vec![progress.answer_turn()];
        progress.mark_already_known(1, &WordId::from("w1")).unwrap();
        assert_eq!(progress.answer_turn(), turns[0]);

        progress.record_answer(&wrong()).unwrap();
        turns.push(progress.answer_turn());
        for _ in 0..2 {
            progress.record_answer(&correct(&progress)).unwrap();
            turns.push(progress.answer_turn());
        }
        let set = next_word_set(&progress).unwrap();
        progress.begin_set(set).unwrap();
        for _ in 0..3 {
            progress.record_answer(&correct(&progress)).unwrap();
            turns.push(progress.answer_turn());
        }
        progress.begin_retry().unwrap();
        progress.record_answer(&correct(&progress)).unwrap();
        turns.push(progress.answer_turn());

        let mut distinct = turns.clone();
        distinct.dedup();
        assert_eq!(distinct, turns);
        assert_eq!(turns, (0..turns.len()).collect::<Vec<_>>());
    }
}
