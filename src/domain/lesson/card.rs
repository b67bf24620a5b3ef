//! Generated lesson payload: cards, sentences, exercises.
//!
//! Shapes mirror the backend's lesson JSON. Cards arrive pre-ordered and
//! the engine never reorders them.

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::domain::foundation::{ValidationError, WordId};

/// CEFR proficiency tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum CefrLevel {
    A1,
    A2,
    B1,
    B2,
    C1,
    C2,
}

impl CefrLevel {
    pub const ALL: [CefrLevel; 6] = [
        CefrLevel::A1,
        CefrLevel::A2,
        CefrLevel::B1,
        CefrLevel::B2,
        CefrLevel::C1,
        CefrLevel::C2,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CefrLevel::A1 => "A1",
            CefrLevel::A2 => "A2",
            CefrLevel::B1 => "B1",
            CefrLevel::B2 => "B2",
            CefrLevel::C1 => "C1",
            CefrLevel::C2 => "C2",
        }
    }
}

impl fmt::Display for CefrLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for CefrLevel {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.trim().to_ascii_uppercase();
        CefrLevel::ALL
            .iter()
            .copied()
            .find(|level| level.as_str() == upper)
            .ok_or_else(|| ValidationError::invalid_format("cefr_level", format!("unknown level '{}'", s)))
    }
}

/// Accepts a missing, empty, or unrecognised level as `None`.
fn lenient_level<'de, D>(deserializer: D) -> Result<Option<CefrLevel>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.and_then(|s| s.parse().ok()))
}

/// Example sentence with its translation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sentence {
    pub text: String,
    #[serde(default)]
    pub translation: String,
}

/// Kind of exercise attached to a card.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExerciseKind {
    /// Fill the gap in a sentence template by picking an option.
    PickOptionSentence,
    /// Type the English word for a given translation.
    WriteWordFromTranslation,
    /// Translate a Russian sentence; multiple choice when options are present.
    TranslateRuToEn,
}

/// How the learner is expected to answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnswerMode {
    MultipleChoice,
    FreeText,
}

/// Kind-specific exercise payload.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ExerciseData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template: Option<String>,
    pub correct_answer: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub pick_options: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub translation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Exercise {
    #[serde(rename = "type")]
    pub kind: ExerciseKind,
    pub data: ExerciseData,
}

impl Exercise {
    pub fn answer_mode(&self) -> AnswerMode {
        match self.kind {
            ExerciseKind::PickOptionSentence => AnswerMode::MultipleChoice,
            ExerciseKind::WriteWordFromTranslation => AnswerMode::FreeText,
            ExerciseKind::TranslateRuToEn if self.data.pick_options.is_empty() => {
                AnswerMode::FreeText
            }
            ExerciseKind::TranslateRuToEn => AnswerMode::MultipleChoice,
        }
    }

    pub fn correct_answer(&self) -> &str {
        &self.data.correct_answer
    }

    /// Option text for a zero-based button index.
    pub fn option(&self, index: usize) -> Option<&str> {
        self.data.pick_options.get(index).map(String::as_str)
    }

    /// Prompt shown to the learner, without the answer.
    pub fn question_text(&self) -> String {
        match self.kind {
            ExerciseKind::PickOptionSentence => format!(
                "Choose the word that fits:\n{}",
                self.data.template.as_deref().unwrap_or("___")
            ),
            ExerciseKind::WriteWordFromTranslation => format!(
                "Write the English word for: {}",
                self.data.translation.as_deref().unwrap_or_default()
            ),
            ExerciseKind::TranslateRuToEn => format!(
                "Translate into English:\n{}",
                self.data.text.as_deref().unwrap_or_default()
            ),
        }
    }
}

/// A word bundled with everything needed to teach and drill it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Card {
    pub word_id: WordId,
    pub word: String,
    pub translation: String,
    #[serde(default, deserialize_with = "lenient_level")]
    pub cefr_level: Option<CefrLevel>,
    #[serde(default)]
    pub topic: String,
    #[serde(default)]
    pub subtopic: String,
    #[serde(default)]
    pub sentences: Vec<Sentence>,
    pub exercise: Exercise,
}

/// Lesson metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lesson {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub started_at: Option<String>,
    pub words_per_lesson: u32,
    #[serde(default)]
    pub total_words: u32,
    #[serde(default, deserialize_with = "lenient_level")]
    pub cefr_level: Option<CefrLevel>,
}

/// Full response of the lesson generator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LessonResponse {
    pub lesson: Lesson,
    pub cards: Vec<Card>,
}

impl LessonResponse {
    pub fn words_per_lesson(&self) -> usize {
        self.lesson.words_per_lesson as usize
    }

    /// Position of a card in the generated order.
    pub fn position_of(&self, word_id: &WordId) -> Option<usize> {
        self.cards.iter().position(|c| &c.word_id == word_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LESSON_JSON: &str = r#"{
        "lesson": {"started_at": "2025-01-01T10:00:00Z", "words_per_lesson": 10, "total_words": 2, "cefr_level": "b1"},
        "cards": [
            {
                "word_id": "w1", "word": "journey", "translation": "путешествие",
                "topic": "travel", "subtopic": "trips",
                "sentences": [{"text": "A long journey.", "translation": "Долгое путешествие."}],
                "exercise": {"type": "pick_option_sentence", "data": {
                    "template": "It was a long ___.", "correct_answer": "journey",
                    "pick_options": ["journey", "weather", "cat"]}}
            },
            {
                "word_id": "w2", "word": "weather", "translation": "погода", "cefr_level": "",
                "exercise": {"type": "translate_ru_to_en", "data": {
                    "text": "Какая погода?", "correct_answer": "What is the weather like?"}}
            }
        ]
    }"#;

    #[test]
    fn parses_backend_lesson() {
        let lesson: LessonResponse = serde_json::from_str(LESSON_JSON).unwrap();
        assert_eq!(lesson.words_per_lesson(), 10);
        assert_eq!(lesson.lesson.cefr_level, Some(CefrLevel::B1));
        assert_eq!(lesson.cards.len(), 2);
        assert_eq!(lesson.cards[0].exercise.kind, ExerciseKind::PickOptionSentence);
        assert_eq!(lesson.cards[1].cefr_level, None);
        assert!(lesson.cards[1].sentences.is_empty());
    }

    #[test]
    fn translate_mode_depends_on_options() {
        let lesson: LessonResponse = serde_json::from_str(LESSON_JSON).unwrap();
        assert_eq!(lesson.cards[0].exercise.answer_mode(), AnswerMode::MultipleChoice);
        assert_eq!(lesson.cards[1].exercise.answer_mode(), AnswerMode::FreeText);

        let mut with_options = lesson.cards[1].exercise.clone();
        with_options.data.pick_options = vec!["a".into(), "b".into()];
        assert_eq!(with_options.answer_mode(), AnswerMode::MultipleChoice);
    }

    #[test]
    fn question_text_hides_answer() {
        let lesson: LessonResponse = serde_json::from_str(LESSON_JSON).unwrap();
        let text = lesson.cards[0].exercise.question_text();
        assert!(text.contains("It was a long ___."));
        assert!(!text.contains("journey."));
    }

    #[test]
    fn cefr_level_parses_case_insensitively() {
        assert_eq!("c1".parse::<CefrLevel>().unwrap(), CefrLevel::C1);
        assert!("D1".parse::<CefrLevel>().is_err());
    }

    #[test]
    fn position_of_finds_card() {
        let lesson: LessonResponse = serde_json::from_str(LESSON_JSON).unwrap();
        assert_eq!(lesson.position_of(&WordId::from("w2")), Some(1));
        assert_eq!(lesson.position_of(&WordId::from("nope")), None);
    }
}
