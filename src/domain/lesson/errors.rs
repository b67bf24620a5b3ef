//! Expected, recoverable lesson outcomes.

use thiserror::Error;

use super::LessonPhase;

/// Lesson outcomes that each have a defined fallback path.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LessonError {
    /// Drilled words already meet the lesson quota; complete the lesson.
    #[error("daily word limit reached")]
    DailyLimitReached,

    /// Every card in the lesson has been used; complete the lesson.
    #[error("no more words available")]
    NoMoreWords,

    /// No card beyond the planned allocation is left; shrink the set.
    #[error("no more replacement words available")]
    NoReplacementWords,

    /// No lesson progress is stored; generate a new lesson.
    #[error("no active lesson")]
    NoActiveLesson,

    #[error("index {index} out of bounds for {len} items")]
    IndexOutOfBounds { index: usize, len: usize },

    #[error("operation not allowed in {actual:?} phase")]
    WrongPhase { actual: LessonPhase },

    #[error("answer does not match the exercise's answer mode")]
    AnswerModeMismatch,

    /// The exercise this answer was meant for has already been recorded.
    #[error("answer is for an exercise that was already recorded")]
    StaleAnswer,
}

impl LessonError {
    /// True when the lesson's main pass has nothing more to teach.
    pub fn ends_main_pass(&self) -> bool {
        matches!(self, LessonError::DailyLimitReached | LessonError::NoMoreWords)
    }
}
