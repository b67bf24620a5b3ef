//! Per-exercise hints.

use super::{AnswerMode, Card, ExerciseKind};

/// Builds a hint for the card's exercise without giving the answer away
/// for free-text exercises.
pub fn hint_for(card: &Card) -> String {
    let exercise = &card.exercise;
    let answer = exercise.correct_answer();

    if exercise.kind == ExerciseKind::PickOptionSentence {
        let mut hint = format!("💡 \"{}\" means \"{}\".", card.word, card.translation);
        if let Some(sentence) = card.sentences.first() {
            if !sentence.translation.is_empty() {
                hint.push_str(&format!("\nExample: {} ({})", sentence.text, sentence.translation));
            }
        }
        return hint;
    }

    match exercise.answer_mode() {
        AnswerMode::FreeText => {
            let first = answer.chars().next().map(|c| c.to_string()).unwrap_or_default();
            format!(
                "💡 The answer starts with \"{}\" and has {} characters.",
                first,
                answer.chars().count()
            )
        }
        AnswerMode::MultipleChoice => {
            format!("💡 Think of \"{}\" ({}).", card.word, card.translation)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::lesson::progress::test_support::card;
    use crate::domain::lesson::{ExerciseData, Sentence};

    #[test]
    fn pick_option_hint_gives_translation_and_example() {
        let mut c = card(1);
        c.sentences.push(Sentence {
            text: "The word1 is here.".into(),
            translation: "Слово1 здесь.".into(),
        });
        let hint = hint_for(&c);
        assert!(hint.contains("слово1"));
        assert!(hint.contains("Слово1 здесь."));
    }

    #[test]
    fn free_text_hint_gives_first_letter_and_length() {
        let mut c = card(1);
        c.exercise.kind = ExerciseKind::WriteWordFromTranslation;
        c.exercise.data = ExerciseData {
            translation: Some("путешествие".into()),
            correct_answer: "journey".into(),
            ..Default::default()
        };
        let hint = hint_for(&c);
        assert!(hint.contains("\"j\""));
        assert!(hint.contains("7 characters"));
        assert!(!hint.contains("journey"));
    }
}
