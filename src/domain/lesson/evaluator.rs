//! Exercise answer evaluation.
//!
//! Multiple-choice answers match the expected option exactly. Free-text
//! answers match after trimming and lowercasing both sides.

use serde::{Deserialize, Serialize};

use super::{AnswerMode, Exercise, LessonError};

/// Confidence recorded for a correct answer or an "already known" word.
pub const CONFIDENCE_CORRECT: u8 = 100;
/// Confidence recorded for a skipped exercise.
pub const CONFIDENCE_SKIPPED: u8 = 25;
/// Confidence recorded for an incorrect answer.
pub const CONFIDENCE_INCORRECT: u8 = 0;

/// Learner's response to an exercise.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Answer {
    /// Selected option text.
    Option(String),
    /// Typed text.
    Text(String),
    Skip,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnswerOutcome {
    Correct,
    Incorrect,
    Skipped,
}

impl AnswerOutcome {
    pub fn confidence(&self) -> u8 {
        match self {
            AnswerOutcome::Correct => CONFIDENCE_CORRECT,
            AnswerOutcome::Incorrect => CONFIDENCE_INCORRECT,
            AnswerOutcome::Skipped => CONFIDENCE_SKIPPED,
        }
    }
}

/// Result of evaluating one answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Evaluation {
    pub outcome: AnswerOutcome,
    pub feedback: String,
}

impl Evaluation {
    pub fn confidence(&self) -> u8 {
        self.outcome.confidence()
    }

    pub fn is_correct(&self) -> bool {
        self.outcome == AnswerOutcome::Correct
    }
}

fn normalize(text: &str) -> String {
    text.trim().to_lowercase()
}

/// Evaluates `answer` against `exercise`.
///
/// Fails with `AnswerModeMismatch` when an option is given for a free-text
/// exercise or text for a multiple-choice one; nothing is recorded then.
pub fn evaluate(exercise: &Exercise, answer: &Answer) -> Result<Evaluation, LessonError> {
    let expected = exercise.correct_answer();
    let outcome = match (exercise.answer_mode(), answer) {
        (_, Answer::Skip) => AnswerOutcome::Skipped,
        (AnswerMode::MultipleChoice, Answer::Option(selected)) => {
            if selected == expected {
                AnswerOutcome::Correct
            } else {
                AnswerOutcome::Incorrect
            }
        }
        (AnswerMode::FreeText, Answer::Text(typed)) => {
            if normalize(typed) == normalize(expected) {
                AnswerOutcome::Correct
            } else {
                AnswerOutcome::Incorrect
            }
        }
        _ => return Err(LessonError::AnswerModeMismatch),
    };

    let feedback = match outcome {
        AnswerOutcome::Correct => "✅ Correct!".to_string(),
        AnswerOutcome::Incorrect => format!("❌ Not quite. Correct answer: {}", expected),
        AnswerOutcome::Skipped => format!("⏭ Skipped. Correct answer: {}", expected),
    };

    Ok(Evaluation { outcome, feedback })
}
