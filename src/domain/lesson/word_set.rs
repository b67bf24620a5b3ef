//! Word-set selection and "already known" replacement.
//!
//! Both functions are pure: they read a `LessonProgress` and return cards,
//! leaving installation to the progress mutators.
//!
//! The set cursor is "skip every consumed WordID" rather than index
//! arithmetic, so sets that shrank (replacements, tail of the lesson) never
//! cause a card to be skipped or taught twice. Replacements are drawn from
//! the cards past `words_per_lesson`.

use super::progress::SET_SIZE;
use super::{Card, LessonError, LessonProgress};

/// Selects the next batch of up to three unused cards.
///
/// Fails with `DailyLimitReached` once drilled words meet the quota and with
/// `NoMoreWords` when every card has been consumed.
pub fn next_word_set(progress: &LessonProgress) -> Result<Vec<Card>, LessonError> {
    let words_left = progress
        .words_per_lesson()
        .saturating_sub(progress.drilled_count());
    if words_left == 0 {
        return Err(LessonError::DailyLimitReached);
    }
    let set_size = words_left.min(SET_SIZE);

    let cards: Vec<Card> = progress
        .lesson_data
        .cards
        .iter()
        .filter(|card| {
            !progress.is_in_current_set(&card.word_id) && !progress.is_learned(&card.word_id)
        })
        .take(set_size)
        .cloned()
        .collect();

    if cards.is_empty() {
        return Err(LessonError::NoMoreWords);
    }
    Ok(cards)
}

/// Finds a card to take the place of the word in slot `word_index`.
///
/// Searches only past the lesson's planned allocation, so a replacement can
/// never collide with a word a later set would teach.
pub fn replacement_word(progress: &LessonProgress, word_index: usize) -> Result<Card, LessonError> {
    if word_index >= progress.words_in_current_set.len() {
        return Err(LessonError::IndexOutOfBounds {
            index: word_index,
            len: progress.words_in_current_set.len(),
        });
    }

    progress
        .lesson_data
        .cards
        .iter()
        .skip(progress.words_per_lesson())
        .find(|card| {
            !progress.is_in_current_set(&card.word_id) && !progress.is_learned(&card.word_id)
        })
        .cloned()
        .ok_or(LessonError::NoReplacementWords)
}
