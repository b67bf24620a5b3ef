//! Lesson model: generated cards, in-flight progress, set selection,
//! answer evaluation, hints and statistics.

mod card;
mod errors;
mod evaluator;
mod hint;
mod progress;
mod stats;
mod word_set;

pub use card::{
    AnswerMode, Card, CefrLevel, Exercise, ExerciseData, ExerciseKind, Lesson, LessonResponse,
    Sentence,
};
pub use errors::LessonError;
pub use evaluator::{
    evaluate, Answer, AnswerOutcome, Evaluation, CONFIDENCE_CORRECT, CONFIDENCE_INCORRECT,
    CONFIDENCE_SKIPPED,
};
pub use hint::hint_for;
pub use progress::{
    AlreadyKnownOutcome, LessonPhase, LessonProgress, SetOutcome, WordProgress, SET_SIZE,
};
pub use stats::LessonStats;
pub use word_set::{next_word_set, replacement_word};

#[cfg(test)]
pub(crate) use progress::test_support;
